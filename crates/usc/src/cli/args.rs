use crate::logging::LogFormat;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;
use usc_dispatch::OutputMode;

/// Global flags. Everything from the first positional token on is the usc
/// command itself and is handed to the grammar parser verbatim.
#[derive(Debug, Parser)]
#[command(
    name = "usc",
    version,
    about = "One command grammar for Linux administration",
    override_usage = "usc [OPTIONS] <module> <action>:<value> [<param>:<value> ...]\n       usc [OPTIONS] help [modules | examples | <module> | action:<module>.<action>]"
)]
pub struct Cli {
    /// Output format
    #[arg(long, value_enum, env = "USC_OUTPUT", default_value_t = OutputMode::Toml)]
    pub output: OutputMode,

    /// Write the output to a file; a directory gets a generated file name
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Human)]
    pub log_format: LogFormat,

    /// Do not prefix privileged commands with sudo
    #[arg(long, env = "USC_NO_SUDO")]
    pub no_sudo: bool,

    /// Print the commands that would run instead of running them
    #[arg(long)]
    pub dry_run: bool,

    /// Kill captured commands that run longer than this (e.g. 30s, 2m)
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// The usc command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}
