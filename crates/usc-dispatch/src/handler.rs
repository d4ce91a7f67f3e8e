//! Module handler types.
//!
//! A module is a [`ModuleSpec`] plus a handler. Handlers receive a resolved
//! [`Call`] (action value filled in, defaults applied) and an
//! [`ExecContext`] through which every external command runs. They build
//! argv vectors and nothing else: validation against the declared contract
//! has already happened, and output formatting happens after they return.
//!
//! # Core Types
//!
//! - [`Module`]: the trait each domain implements
//! - [`Call`]: the resolved parameter mapping for one action
//! - [`ExecContext`]: runs commands, applies the `sudo` policy, keeps a transcript
//! - [`ActionResult`]: the uniform outcome handed back to the caller

use crate::error::HandlerError;
use crate::spec::ModuleSpec;
use indexmap::IndexMap;
use std::cell::RefCell;
use usc_exec::{exit_code, Captured, CommandLine, ExecError, Runner};

/// The result type for handlers.
pub type HandlerResult = Result<ActionResult, HandlerError>;

/// One domain of functionality (user, file, network, ...).
pub trait Module {
    /// The module's declared contract.
    fn spec(&self) -> ModuleSpec;

    /// Runs one action. `call.action` is always a canonical action name
    /// from [`spec`](Self::spec).
    fn handle(&self, call: &Call, ctx: &ExecContext<'_>) -> HandlerResult;
}

/// A validated action call with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Call {
    pub module: String,
    /// Canonical name, even when invoked through an alias.
    pub action: String,
    value: String,
    primary: Option<String>,
    params: IndexMap<String, String>,
    passthrough: IndexMap<String, String>,
    /// Declared parameters whose value came from their default.
    defaulted: Vec<String>,
}

impl Call {
    pub fn new(module: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            action: action.into(),
            ..Self::default()
        }
    }

    /// Binds the action value to the named primary parameter.
    pub fn primary(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        self.params.shift_insert(0, name.clone(), value.clone());
        self.primary = Some(name);
        self.value = value;
        self
    }

    /// Sets the action value for an action without a declared primary.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.defaulted.retain(|n| *n != name);
        self.params.insert(name, value.into());
        self
    }

    /// Binds a declared parameter the invocation left out to its default.
    pub(crate) fn defaulted(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.params.insert(name.clone(), value.into());
        if !self.defaulted.contains(&name) {
            self.defaulted.push(name);
        }
        self
    }

    /// Adds a parameter the action does not declare.
    pub fn passthrough(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.passthrough.insert(name.into(), value.into());
        self
    }

    /// The action value (`chenxi` in `add:chenxi`), defaulted when declared so.
    pub fn action_value(&self) -> &str {
        &self.value
    }

    /// Declared parameters in declaration order, primary first.
    pub fn params(&self) -> &IndexMap<String, String> {
        &self.params
    }

    /// Supplied parameters the action does not declare.
    pub fn undeclared(&self) -> &IndexMap<String, String> {
        &self.passthrough
    }

    /// A parameter's value, including an explicitly empty one.
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .or_else(|| self.passthrough.get(name))
            .map(String::as_str)
    }

    /// The value typed on the command line, even an empty one (`comment:`).
    /// `None` when the parameter was left to its default.
    pub fn supplied(&self, name: &str) -> Option<&str> {
        if self.defaulted.iter().any(|n| n == name) {
            return None;
        }
        self.raw(name)
    }

    /// A parameter's value; empty values count as absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.raw(name).filter(|v| !v.is_empty())
    }

    /// True when the parameter is `true`, `yes` or `1`.
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).is_some_and(is_truthy)
    }

    /// Like [`get`](Self::get) but absence is a handler error.
    pub fn require(&self, name: &str, reason: &str) -> Result<&str, HandlerError> {
        self.get(name)
            .ok_or_else(|| HandlerError::missing(name, reason))
    }

    /// A comma-separated parameter split into its non-empty items.
    pub fn list(&self, name: &str) -> Vec<&str> {
        self.get(name)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The action value, checked against a fixed set of choices.
    pub fn value_in(&self, choices: &[&str]) -> Result<&str, HandlerError> {
        one_of(
            self.primary.as_deref().unwrap_or("value"),
            &self.value,
            choices,
        )
    }
}

/// Checks `value` against a fixed set of choices.
pub fn one_of<'a>(parameter: &str, value: &'a str, choices: &[&str]) -> Result<&'a str, HandlerError> {
    if choices.contains(&value) {
        Ok(value)
    } else {
        Err(HandlerError::invalid(
            parameter,
            value,
            format!("one of {}", choices.join(", ")),
        ))
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "yes" | "1")
}

/// The uniform outcome of an action.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// The external command line(s) that ran, when any did.
    pub command: Option<String>,
    /// Structured data built by the handler. When absent, reports derive
    /// data from `stdout`.
    pub data: Option<serde_json::Value>,
}

impl ActionResult {
    /// A successful result carrying `stdout`.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            exit_code: exit_code::SUCCESS,
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    /// A result for a command that ran attached to the terminal.
    pub fn exited(code: i32) -> Self {
        Self {
            success: code == exit_code::SUCCESS,
            exit_code: code,
            ..Self::default()
        }
    }

    /// A failed result describing `error`.
    pub fn failed(error: &HandlerError) -> Self {
        let (stdout, stderr) = match error {
            HandlerError::Exec(e) => (e.stdout().to_string(), e.stderr()),
            other => (String::new(), other.to_string()),
        };
        Self {
            success: false,
            exit_code: error.exit_code(),
            stdout,
            stderr,
            ..Self::default()
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl From<Captured> for ActionResult {
    fn from(out: Captured) -> Self {
        Self {
            success: out.success(),
            exit_code: out.code,
            stdout: out.stdout,
            stderr: out.stderr,
            command: Some(out.command),
            data: None,
        }
    }
}

/// Runs external commands on behalf of a handler.
///
/// Every command that runs is recorded so the caller can report exactly
/// what was executed.
pub struct ExecContext<'a> {
    runner: &'a dyn Runner,
    sudo: bool,
    transcript: RefCell<Vec<String>>,
}

impl<'a> ExecContext<'a> {
    pub fn new(runner: &'a dyn Runner, sudo: bool) -> Self {
        Self {
            runner,
            sudo,
            transcript: RefCell::new(Vec::new()),
        }
    }

    /// A command for a program that needs root, prefixed with `sudo` unless
    /// that was turned off.
    pub fn privileged(&self, program: &str) -> CommandLine {
        if self.sudo {
            CommandLine::new("sudo").arg(program)
        } else {
            CommandLine::new(program)
        }
    }

    /// Runs `cmd`; a non-zero exit is an error.
    pub fn run(&self, cmd: &CommandLine) -> Result<Captured, ExecError> {
        self.probe(cmd)?.check()
    }

    /// Runs `cmd` and returns its output whatever the exit status.
    pub fn probe(&self, cmd: &CommandLine) -> Result<Captured, ExecError> {
        self.record(cmd);
        self.runner.run(cmd)
    }

    /// Runs `cmd` attached to the terminal until it exits or is interrupted.
    pub fn follow(&self, cmd: &CommandLine) -> Result<ActionResult, ExecError> {
        self.record(cmd);
        let code = self.runner.attach(cmd)?;
        if code != exit_code::SUCCESS {
            return Err(ExecError::NonZeroExit {
                command: cmd.to_string(),
                code,
                stdout: String::new(),
                stderr: String::new(),
            });
        }
        Ok(ActionResult::exited(code))
    }

    /// Runs each command in order, stopping at the first failure. Returns the
    /// last command's output.
    pub fn run_all(&self, cmds: &[CommandLine]) -> Result<Option<Captured>, ExecError> {
        let mut last = None;
        for cmd in cmds {
            last = Some(self.run(cmd)?);
        }
        Ok(last)
    }

    pub fn has_program(&self, program: &str) -> bool {
        self.runner.locate(program).is_some()
    }

    /// Every command line run so far.
    pub fn transcript(&self) -> Vec<String> {
        self.transcript.borrow().clone()
    }

    fn record(&self, cmd: &CommandLine) {
        self.transcript.borrow_mut().push(cmd.to_string());
    }
}
