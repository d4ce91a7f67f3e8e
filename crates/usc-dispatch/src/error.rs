//! Error taxonomy for the grammar, the registry and the dispatcher.
//!
//! Parse and dispatch errors are caught before any external process runs and
//! always exit with [`exit_code::USAGE`]. Handler errors carry the exit code
//! of whatever went wrong inside the handler.

use thiserror::Error;
use usc_exec::{exit_code, ExecError};

/// Syntactic problems with the raw argument vector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("missing module: expected `usc <module> <action>:<value> [<param>:<value> ...]`")]
    MissingModule,

    #[error("missing action: expected `<action>:<value>` after the module name")]
    MissingAction,

    #[error("malformed module `{0}`: a module name cannot contain `:`")]
    MalformedModule(String),

    #[error("malformed parameter `{0}`: expected `<name>:<value>`")]
    MalformedParameter(String),

    #[error("malformed help topic `{0}`: expected `modules`, `examples`, `<module>`, `module:<module>` or `action:<module>.<action>`")]
    MalformedHelpTopic(String),
}

/// Contract violations found while resolving an invocation against the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unknown module `{0}`")]
    UnknownModule(String),

    #[error("unknown action `{action}` for module `{module}`")]
    UnknownAction { module: String, action: String },

    #[error("`{module} {action}` requires a value: `{action}:<{parameter}>`")]
    MissingRequiredParameter {
        module: String,
        action: String,
        parameter: String,
    },
}

/// Problems with module declarations, detected once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("module `{0}` is registered twice")]
    DuplicateModule(String),

    #[error("module name `{0}` is reserved")]
    ReservedName(String),

    #[error("invalid declaration for `{module} {action}`: {reason}")]
    InvalidSpec {
        module: String,
        action: String,
        reason: String,
    },
}

/// Failures raised inside a module handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("invalid value `{value}` for `{parameter}`: expected {expected}")]
    InvalidValue {
        parameter: String,
        value: String,
        expected: String,
    },

    #[error("missing parameter `{parameter}`: {reason}")]
    MissingParameter { parameter: String, reason: String },
}

impl HandlerError {
    pub fn invalid(
        parameter: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        HandlerError::InvalidValue {
            parameter: parameter.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    pub fn missing(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        HandlerError::MissingParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            HandlerError::Exec(e) => e.exit_code(),
            _ => exit_code::FAILURE,
        }
    }
}
