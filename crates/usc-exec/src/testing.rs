//! A [`Runner`] for tests.
//!
//! [`ScriptedRunner`] records every command it is given and answers from
//! replies queued per program. Programs are matched by
//! [`CommandLine::effective_program`], so a `sudo useradd ...` invocation is
//! answered by the replies queued for `useradd`. A program with no queued
//! reply succeeds with empty output.
//!
//! ```
//! use usc_exec::testing::{Reply, ScriptedRunner};
//! use usc_exec::{CommandLine, Runner};
//!
//! let runner = ScriptedRunner::new().reply("id", Reply::ok("uid=1000(chenxi)\n"));
//! let out = runner.run(&CommandLine::new("id").arg("chenxi")).unwrap();
//! assert_eq!(out.stdout, "uid=1000(chenxi)\n");
//! assert_eq!(runner.lines(), ["id chenxi"]);
//! ```

use crate::command::CommandLine;
use crate::runner::Runner;
use crate::shell::{Captured, ExecError};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;

/// A canned answer for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Exit {
        code: i32,
        stdout: String,
        stderr: String,
    },
    /// The program is not installed.
    Missing,
}

impl Reply {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Reply::Exit {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn fail(code: i32, stderr: impl Into<String>) -> Self {
        Reply::Exit {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ScriptedRunner {
    replies: RefCell<HashMap<String, VecDeque<Reply>>>,
    installed: HashSet<String>,
    log: RefCell<Vec<CommandLine>>,
    attached: RefCell<Vec<CommandLine>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `reply` for the next call to `program`.
    pub fn reply(self, program: &str, reply: Reply) -> Self {
        self.replies
            .borrow_mut()
            .entry(program.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Marks programs as present on `PATH` for [`Runner::locate`].
    pub fn with_programs<I, S>(mut self, programs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.installed.extend(programs.into_iter().map(Into::into));
        self
    }

    /// Every command run so far, captured and attached, in order.
    pub fn commands(&self) -> Vec<CommandLine> {
        self.log.borrow().clone()
    }

    /// Every command run so far, rendered as shell lines.
    pub fn lines(&self) -> Vec<String> {
        self.log.borrow().iter().map(ToString::to_string).collect()
    }

    /// Only the commands that were run attached to the terminal.
    pub fn attached(&self) -> Vec<CommandLine> {
        self.attached.borrow().clone()
    }

    fn next_reply(&self, cmd: &CommandLine) -> Option<Reply> {
        self.log.borrow_mut().push(cmd.clone());
        self.replies
            .borrow_mut()
            .get_mut(cmd.effective_program())
            .and_then(VecDeque::pop_front)
    }
}

impl Runner for ScriptedRunner {
    fn run(&self, cmd: &CommandLine) -> Result<Captured, ExecError> {
        let command = cmd.to_string();
        match self.next_reply(cmd) {
            Some(Reply::Missing) => Err(ExecError::CommandNotFound {
                program: cmd.effective_program().to_string(),
            }),
            Some(Reply::Exit {
                code,
                stdout,
                stderr,
            }) => Ok(Captured {
                command,
                code,
                stdout,
                stderr,
            }),
            None => Ok(Captured {
                command,
                code: 0,
                stdout: String::new(),
                stderr: String::new(),
            }),
        }
    }

    fn attach(&self, cmd: &CommandLine) -> Result<i32, ExecError> {
        self.attached.borrow_mut().push(cmd.clone());
        match self.next_reply(cmd) {
            Some(Reply::Missing) => Err(ExecError::CommandNotFound {
                program: cmd.effective_program().to_string(),
            }),
            Some(Reply::Exit { code, .. }) => Ok(code),
            None => Ok(0),
        }
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        self.installed
            .contains(program)
            .then(|| PathBuf::from("/usr/bin").join(program))
    }
}
