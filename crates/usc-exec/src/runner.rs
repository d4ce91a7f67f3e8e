//! The execution seam.
//!
//! Module handlers never spawn processes themselves. They hand a
//! [`CommandLine`] to a [`Runner`], which makes it possible to run for real,
//! to print instead of run (`--dry-run`), or to answer from a script in tests.

use crate::cancel::CancelToken;
use crate::command::CommandLine;
use crate::shell::{run_attached, run_captured, Captured, ExecError};
use std::path::PathBuf;
use std::time::Duration;

pub trait Runner {
    /// Runs `cmd` to completion, capturing its output.
    fn run(&self, cmd: &CommandLine) -> Result<Captured, ExecError>;

    /// Runs `cmd` on the caller's terminal and returns its exit code.
    fn attach(&self, cmd: &CommandLine) -> Result<i32, ExecError>;

    /// Finds `program` on `PATH`.
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// Runs commands on the local host.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
    cancel: Option<CancelToken>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kills captured commands that run longer than `timeout`.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Kills running commands once `token` is cancelled.
    pub fn cancel_on(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl Runner for SystemRunner {
    fn run(&self, cmd: &CommandLine) -> Result<Captured, ExecError> {
        run_captured(cmd, self.timeout, self.cancel.as_ref())
    }

    fn attach(&self, cmd: &CommandLine) -> Result<i32, ExecError> {
        run_attached(cmd, self.cancel.as_ref())
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

/// Prints commands to stderr instead of running them.
///
/// Every command "succeeds" with empty output. Program lookups still consult
/// `PATH` so that distro detection picks the same tools a real run would.
#[derive(Debug, Clone, Default)]
pub struct DryRunner;

impl DryRunner {
    fn announce(cmd: &CommandLine) -> String {
        let rendered = cmd.to_string();
        eprintln!("+ {}", rendered);
        rendered
    }
}

impl Runner for DryRunner {
    fn run(&self, cmd: &CommandLine) -> Result<Captured, ExecError> {
        Ok(Captured {
            command: Self::announce(cmd),
            code: 0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    fn attach(&self, cmd: &CommandLine) -> Result<i32, ExecError> {
        Self::announce(cmd);
        Ok(0)
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_runner_never_spawns() {
        let cmd = CommandLine::new("usc-definitely-not-a-real-binary").arg("--flag");
        let out = DryRunner.run(&cmd).unwrap();
        assert!(out.success());
        assert_eq!(out.command, "usc-definitely-not-a-real-binary --flag");
        assert_eq!(DryRunner.attach(&cmd).unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_locates_sh() {
        assert!(SystemRunner::new().locate("sh").is_some());
        assert!(SystemRunner::new()
            .locate("usc-definitely-not-a-real-binary")
            .is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_applies_timeout() {
        let runner = SystemRunner::new().timeout(Some(Duration::from_millis(200)));
        let err = runner.run(&CommandLine::new("sleep").arg("5")).unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
    }
}
