//! External command execution for usc.
//!
//! Every effect usc has on a host goes through an external program. This
//! crate owns that boundary:
//!
//! - [`CommandLine`]: an argv builder (no shell strings, no `sh -c`)
//! - [`run_captured`]: spawn, feed stdin, capture stdout/stderr, optional timeout
//! - [`run_attached`]: spawn on the caller's terminal, for follow-style and
//!   interactive commands, killed when a [`CancelToken`] trips
//! - [`Runner`]: the seam handlers execute through, with [`SystemRunner`] for
//!   real hosts, [`DryRunner`] for `--dry-run` and
//!   [`testing::ScriptedRunner`] for tests

pub mod cancel;
pub mod command;
pub mod runner;
pub mod shell;
pub mod testing;

pub use cancel::{install_interrupt_handler, CancelToken};
pub use command::{render_argv, CommandLine, Input};
pub use runner::{DryRunner, Runner, SystemRunner};
pub use shell::{run_attached, run_captured, Captured, ExecError};

/// Process exit codes shared by the whole workspace.
pub mod exit_code {
    /// Everything worked.
    pub const SUCCESS: i32 = 0;
    /// Generic failure with no more specific code.
    pub const FAILURE: i32 = 1;
    /// Grammar or contract violation caught before any process ran (`EX_USAGE`).
    pub const USAGE: i32 = 64;
    /// Internal error such as an invalid module registry.
    pub const SOFTWARE: i32 = 70;
    /// A command exceeded the configured timeout.
    pub const TIMEOUT: i32 = 124;
    /// The program was not found on `PATH`.
    pub const NOT_FOUND: i32 = 127;
    /// Interrupted by the operator (SIGINT).
    pub const INTERRUPTED: i32 = 130;
}
