//! The `usc` command line.
//!
//! ```text
//! argv ──clap──▶ Cli ──▶ Config ──▶ App::execute ──▶ Outcome ──▶ App::render ──▶ stdout / --out
//! ```
//!
//! Global flags come first and are handled by clap; everything from the
//! first positional token on is the usc grammar and goes to
//! [`usc_dispatch::parse`] untouched.

mod app;
mod args;

pub use app::{App, Outcome, Rendered};
pub use args::Cli;

use crate::config::Config;
use crate::logging::init_logging;
use crate::modules::builtin_registry;
use anyhow::Context;
use clap::Parser;
use std::ffi::OsString;
use std::io::IsTerminal;
use usc_dispatch::OutputDestination;
use usc_exec::{exit_code, install_interrupt_handler, CancelToken, DryRunner, Runner, SystemRunner};

/// Runs usc with `argv` (program name first) and returns the process exit
/// code.
pub fn run<I, T>(argv: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(argv) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                exit_code::USAGE
            } else {
                exit_code::SUCCESS
            };
        }
    };

    let config = Config::from_cli(&cli);
    init_logging(config.log_format, config.verbosity);

    match run_command(&cli.command, &config) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "usc failed");
            eprintln!("error: {:#}", e);
            exit_code::SOFTWARE
        }
    }
}

fn run_command(command: &[String], config: &Config) -> anyhow::Result<i32> {
    let registry = builtin_registry().context("invalid module registry")?;

    let cancel = CancelToken::new();
    if let Err(e) = install_interrupt_handler(&cancel) {
        tracing::warn!(error = %e, "could not install the interrupt handler");
    }

    let system;
    let runner: &dyn Runner = if config.dry_run {
        &DryRunner
    } else {
        system = SystemRunner::new()
            .timeout(config.timeout)
            .cancel_on(cancel);
        &system
    };

    let app = App::new(&registry, runner, config);
    let outcome = app.execute(command);
    let rendered = app
        .render(&outcome, use_styling(&config.destination))
        .context("failed to render output")?;

    if !rendered.stderr.is_empty() {
        eprint!("{}", rendered.stderr);
        if !rendered.stderr.ends_with('\n') {
            eprintln!();
        }
    }
    if !rendered.stdout.is_empty() {
        config
            .destination
            .write_text(&rendered.stdout)
            .context("failed to write output")?;
    }
    Ok(outcome.exit_code())
}

fn use_styling(destination: &OutputDestination) -> bool {
    *destination == OutputDestination::Stdout
        && std::io::stdout().is_terminal()
        && std::env::var_os("NO_COLOR").is_none()
}
