//! Resolved runtime configuration.

use crate::cli::Cli;
use crate::logging::LogFormat;
use std::path::{Path, PathBuf};
use std::time::Duration;
use usc_dispatch::{OutputDestination, OutputMode};

/// Everything that shapes one run, fixed before any command executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub output: OutputMode,
    pub destination: OutputDestination,
    pub sudo: bool,
    pub dry_run: bool,
    pub timeout: Option<Duration>,
    pub verbosity: u8,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: OutputMode::Toml,
            destination: OutputDestination::Stdout,
            sudo: true,
            dry_run: false,
            timeout: None,
            verbosity: 0,
            log_format: LogFormat::Human,
        }
    }
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Self {
        let destination = match &cli.out {
            Some(path) => OutputDestination::File(report_path(path, cli.output)),
            None => OutputDestination::Stdout,
        };
        Self {
            output: cli.output,
            destination,
            sudo: !cli.no_sudo,
            dry_run: cli.dry_run,
            timeout: cli.timeout,
            verbosity: cli.verbose,
            log_format: cli.log_format,
        }
    }
}

/// Resolves `--out`: an existing directory gets a timestamped file name
/// (`usc-20250101120000.toml`), anything else is used as given.
pub fn report_path(path: &Path, mode: OutputMode) -> PathBuf {
    if path.is_dir() {
        let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
        path.join(format!("usc-{}.{}", stamp, mode.extension()))
    } else {
        path.to_path_buf()
    }
}
