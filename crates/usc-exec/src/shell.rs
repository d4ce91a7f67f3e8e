use crate::cancel::CancelToken;
use crate::command::{CommandLine, Input};
use crate::exit_code;
use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use wait_timeout::ChildExt;

/// How often a waiting parent checks for cancellation and deadlines.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("`{command}` exited with status {code}")]
    NonZeroExit {
        command: String,
        code: i32,
        stdout: String,
        stderr: String,
    },
    #[error("command not found: {program}")]
    CommandNotFound { program: String },
    #[error("I/O error running `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` timed out after {after:?}")]
    Timeout { command: String, after: Duration },
    #[error("`{command}` was interrupted")]
    Interrupted { command: String },
}

impl ExecError {
    /// The process exit code this failure should surface as.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecError::NonZeroExit { code, .. } => *code,
            ExecError::CommandNotFound { .. } => exit_code::NOT_FOUND,
            ExecError::Io { .. } => exit_code::FAILURE,
            ExecError::Timeout { .. } => exit_code::TIMEOUT,
            ExecError::Interrupted { .. } => exit_code::INTERRUPTED,
        }
    }

    /// Captured stderr when the process got far enough to produce any,
    /// otherwise the error message itself.
    pub fn stderr(&self) -> String {
        match self {
            ExecError::NonZeroExit { stderr, .. } if !stderr.trim().is_empty() => stderr.clone(),
            other => other.to_string(),
        }
    }

    /// Captured stdout, if any.
    pub fn stdout(&self) -> &str {
        match self {
            ExecError::NonZeroExit { stdout, .. } => stdout,
            _ => "",
        }
    }

    /// The rendered command line this error belongs to.
    pub fn command(&self) -> &str {
        match self {
            ExecError::NonZeroExit { command, .. }
            | ExecError::Io { command, .. }
            | ExecError::Timeout { command, .. }
            | ExecError::Interrupted { command } => command,
            ExecError::CommandNotFound { program } => program,
        }
    }
}

/// Output of a command that ran to completion, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    /// The rendered command line.
    pub command: String,
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Captured {
    pub fn success(&self) -> bool {
        self.code == exit_code::SUCCESS
    }

    /// Turns a non-zero exit into [`ExecError::NonZeroExit`].
    pub fn check(self) -> Result<Self, ExecError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ExecError::NonZeroExit {
                command: self.command,
                code: self.code,
                stdout: self.stdout,
                stderr: self.stderr,
            })
        }
    }
}

/// Runs a command to completion with stdout and stderr captured.
///
/// A non-zero exit is not an error here; callers decide with
/// [`Captured::check`]. When `timeout` elapses the child is killed and
/// [`ExecError::Timeout`] is returned. When `cancel` trips the child is
/// killed and [`ExecError::Interrupted`] is returned.
///
/// Both pipes are drained on their own threads so a chatty child cannot
/// fill a pipe buffer and block forever.
pub fn run_captured(
    cmd: &CommandLine,
    timeout: Option<Duration>,
    cancel: Option<&CancelToken>,
) -> Result<Captured, ExecError> {
    let rendered = cmd.to_string();
    tracing::debug!(command = %rendered, "running captured command");

    let mut process = build(cmd);
    process.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = spawn(&mut process, cmd, &rendered)?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    feed_stdin(&mut child, cmd.get_input(), &rendered)?;

    let status = wait(&mut child, timeout, cancel, &rendered)?;

    Ok(Captured {
        code: status_code(status),
        stdout: join_output(stdout),
        stderr: join_output(stderr),
        command: rendered,
    })
}

/// Runs a command attached to the caller's terminal and returns its exit code.
///
/// Used for follow-style commands (`journalctl -f`, an unbounded `ping`) and
/// interactive programs (editors). Output is not captured. When `cancel`
/// trips, the child is killed rather than left orphaned and
/// [`ExecError::Interrupted`] is returned.
pub fn run_attached(cmd: &CommandLine, cancel: Option<&CancelToken>) -> Result<i32, ExecError> {
    let rendered = cmd.to_string();
    tracing::debug!(command = %rendered, "running attached command");

    let mut process = build(cmd);
    process.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    let mut child = spawn(&mut process, cmd, &rendered)?;

    feed_stdin(&mut child, cmd.get_input(), &rendered)?;

    let status = wait(&mut child, None, cancel, &rendered)?;
    Ok(status_code(status))
}

fn build(cmd: &CommandLine) -> Command {
    let mut process = Command::new(cmd.get_program());
    process.args(cmd.get_args());
    process.stdin(match cmd.get_input() {
        Input::Null => Stdio::null(),
        Input::Data(_) => Stdio::piped(),
        Input::Inherit => Stdio::inherit(),
    });
    process
}

fn spawn(process: &mut Command, cmd: &CommandLine, rendered: &str) -> Result<Child, ExecError> {
    process.spawn().map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ExecError::CommandNotFound {
                program: cmd.get_program().to_string(),
            }
        } else {
            ExecError::Io {
                command: rendered.to_string(),
                source,
            }
        }
    })
}

fn feed_stdin(child: &mut Child, input: &Input, rendered: &str) -> Result<(), ExecError> {
    if let (Input::Data(data), Some(mut stdin)) = (input, child.stdin.take()) {
        // A child that exits without reading its input closes the pipe early.
        match stdin.write_all(data.as_bytes()) {
            Err(e) if e.kind() != io::ErrorKind::BrokenPipe => {
                return Err(ExecError::Io {
                    command: rendered.to_string(),
                    source: e,
                });
            }
            _ => {}
        }
    }
    Ok(())
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut reader| {
        thread::spawn(move || {
            let mut bytes = Vec::new();
            let _ = reader.read_to_end(&mut bytes);
            String::from_utf8_lossy(&bytes).into_owned()
        })
    })
}

fn join_output(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

fn wait(
    child: &mut Child,
    timeout: Option<Duration>,
    cancel: Option<&CancelToken>,
    rendered: &str,
) -> Result<ExitStatus, ExecError> {
    let io_err = |source| ExecError::Io {
        command: rendered.to_string(),
        source,
    };

    if timeout.is_none() && cancel.is_none() {
        return child.wait().map_err(io_err);
    }

    let deadline = timeout.map(|t| Instant::now() + t);
    loop {
        if let Some(status) = child.wait_timeout(POLL_INTERVAL).map_err(io_err)? {
            return Ok(status);
        }
        if cancel.is_some_and(CancelToken::is_cancelled) {
            kill(child);
            return Err(ExecError::Interrupted {
                command: rendered.to_string(),
            });
        }
        if let (Some(deadline), Some(after)) = (deadline, timeout) {
            if Instant::now() >= deadline {
                kill(child);
                return Err(ExecError::Timeout {
                    command: rendered.to_string(),
                    after,
                });
            }
        }
    }
}

fn kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::warn!(error = %e, "failed to kill child process");
    }
    let _ = child.wait();
}

#[cfg(unix)]
fn status_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|s| 128 + s))
        .unwrap_or(exit_code::FAILURE)
}

#[cfg(not(unix))]
fn status_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(exit_code::FAILURE)
}
