use indexmap::IndexMap;

/// One parsed `usc <module> <action>:<value> [<param>:<value> ...]` call.
///
/// Nothing here has been checked against the registry yet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Invocation {
    pub module: String,
    pub action: String,
    pub action_value: String,
    /// Named parameters in the order they were first given.
    pub parameters: IndexMap<String, String>,
}

impl Invocation {
    pub fn new(module: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.action_value = value.into();
        self
    }

    /// Sets a named parameter, replacing an earlier value.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

/// What `usc help ...` asked to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelpTopic {
    /// Every registered module.
    Modules,
    /// One module and its actions.
    Module(String),
    /// One action's parameter contract.
    Action { module: String, action: String },
    /// Worked example command lines.
    Examples,
}

/// The outcome of parsing an argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Help(HelpTopic),
    Invoke(Invocation),
}
