//! Declarative module metadata.
//!
//! A [`ModuleSpec`] is the single source of truth for a module's contract:
//! the dispatcher validates invocations against it and the help service
//! documents it, so the two can never disagree.
//!
//! The action's value (the `chenxi` in `add:chenxi`) is modelled as a
//! parameter marked [`primary`](ParameterSpec::primary). Only the primary
//! parameter may be required and it must come first.

use crate::error::RegistryError;
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: String,
    /// Bound to the action value instead of a `name:value` token.
    pub primary: bool,
    pub required: bool,
    pub default: Option<String>,
    pub description: String,
}

impl ParameterSpec {
    /// A required action value. Give it a [`default`](Self::default) to make
    /// it optional.
    pub fn primary(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary: true,
            required: true,
            default: None,
            description: description.into(),
        }
    }

    /// An optional `name:value` parameter. Its default is the empty value,
    /// which handlers read as "not set" unless it was typed explicitly.
    pub fn named(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary: false,
            required: false,
            default: Some(String::new()),
            description: description.into(),
        }
    }

    /// An optional `name:true|false` switch defaulting to `false`.
    pub fn flag(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::named(name, description).default("false")
    }

    /// Lets a primary be omitted without a default; the action value is then
    /// empty.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Sets the value used when the parameter is not supplied. A parameter
    /// with a default is never required.
    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }
}

/// A worked example shown by `usc help examples`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    pub command: String,
    pub description: String,
}

impl Example {
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSpec {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: String,
    /// Filled in by [`ModuleSpec::action`] when left empty.
    pub usage_example: String,
    pub parameters: Vec<ParameterSpec>,
    pub notes: Vec<String>,
    pub examples: Vec<Example>,
}

impl ActionSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: description.into(),
            usage_example: String::new(),
            parameters: Vec::new(),
            notes: Vec::new(),
            examples: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn param(mut self, param: ParameterSpec) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage_example = usage.into();
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn example(mut self, command: impl Into<String>, description: impl Into<String>) -> Self {
        self.examples.push(Example::new(command, description));
        self
    }

    pub fn primary(&self) -> Option<&ParameterSpec> {
        self.parameters.first().filter(|p| p.primary)
    }

    /// The `name:value` parameters, in declaration order.
    pub fn named(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters.iter().filter(|p| !p.primary)
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// True for the action's name or any of its aliases.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }

    fn generated_usage(&self, module: &str) -> String {
        let mut usage = format!("usc {} {}", module, self.name);
        if let Some(primary) = self.primary() {
            usage.push_str(&format!(":<{}>", primary.name));
        }
        for param in self.named() {
            usage.push_str(&format!(" {0}:<{0}>", param.name));
        }
        usage
    }

    fn validate(&self, module: &str) -> Result<(), RegistryError> {
        let invalid = |reason: String| RegistryError::InvalidSpec {
            module: module.to_string(),
            action: self.name.clone(),
            reason,
        };

        if self.name.is_empty() || self.name.contains(':') {
            return Err(invalid("action names must be non-empty and contain no `:`".into()));
        }
        for (i, param) in self.parameters.iter().enumerate() {
            if param.primary && i != 0 {
                return Err(invalid(format!(
                    "primary parameter `{}` must be declared first",
                    param.name
                )));
            }
            if param.required && !param.primary {
                return Err(invalid(format!(
                    "only the primary parameter may be required, not `{}`",
                    param.name
                )));
            }
            if !param.primary && param.default.is_none() {
                return Err(invalid(format!(
                    "optional parameter `{}` must declare a default",
                    param.name
                )));
            }
            if param.required && param.default.is_some() {
                return Err(invalid(format!(
                    "required parameter `{}` cannot have a default",
                    param.name
                )));
            }
            if self.parameters[..i].iter().any(|p| p.name == param.name) {
                return Err(invalid(format!("parameter `{}` declared twice", param.name)));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSpec {
    pub name: String,
    pub description: String,
    /// Keyed by canonical action name, in declaration order.
    pub actions: IndexMap<String, ActionSpec>,
}

impl ModuleSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            actions: IndexMap::new(),
        }
    }

    /// Adds an action. A later action with the same name replaces the earlier
    /// one.
    pub fn action(mut self, mut action: ActionSpec) -> Self {
        if action.usage_example.is_empty() {
            action.usage_example = action.generated_usage(&self.name);
        }
        self.actions.insert(action.name.clone(), action);
        self
    }

    /// Finds an action by name or alias.
    pub fn find_action(&self, name: &str) -> Option<&ActionSpec> {
        self.actions
            .get(name)
            .or_else(|| self.actions.values().find(|a| a.answers_to(name)))
    }

    /// Checks every action's parameter contract and alias uniqueness.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let mut seen: Vec<&str> = Vec::new();
        for action in self.actions.values() {
            action.validate(&self.name)?;
            for name in std::iter::once(&action.name).chain(&action.aliases) {
                if seen.contains(&name.as_str()) {
                    return Err(RegistryError::InvalidSpec {
                        module: self.name.clone(),
                        action: action.name.clone(),
                        reason: format!("`{}` names more than one action", name),
                    });
                }
                seen.push(name.as_str());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_add() -> ActionSpec {
        ActionSpec::new("add", "Create a user")
            .param(ParameterSpec::primary("username", "Account name"))
            .param(ParameterSpec::named("home", "Home directory"))
            .param(ParameterSpec::flag("system", "Create a system account"))
    }

    #[test]
    fn test_primary_and_named() {
        let action = user_add();
        assert_eq!(action.primary().map(|p| p.name.as_str()), Some("username"));
        let named: Vec<_> = action.named().map(|p| p.name.as_str()).collect();
        assert_eq!(named, ["home", "system"]);
    }

    #[test]
    fn test_default_makes_primary_optional() {
        let p = ParameterSpec::primary("type", "Which users").default("login");
        assert!(p.primary);
        assert!(!p.required);
        assert_eq!(p.default.as_deref(), Some("login"));
    }

    #[test]
    fn test_named_defaults_to_empty() {
        let p = ParameterSpec::named("home", "Home directory");
        assert!(!p.required);
        assert_eq!(p.default.as_deref(), Some(""));
        assert!(user_add().validate("user").is_ok());
    }

    #[test]
    fn test_generated_usage() {
        let module = ModuleSpec::new("user", "Users").action(user_add());
        assert_eq!(
            module.actions["add"].usage_example,
            "usc user add:<username> home:<home> system:<system>"
        );
    }

    #[test]
    fn test_explicit_usage_is_kept() {
        let module = ModuleSpec::new("user", "Users")
            .action(user_add().usage("usc user add:<username> home:<path>"));
        assert_eq!(
            module.actions["add"].usage_example,
            "usc user add:<username> home:<path>"
        );
    }

    #[test]
    fn test_find_action_by_alias() {
        let module = ModuleSpec::new("file", "Files")
            .action(ActionSpec::new("copy", "Copy").alias("cp"));
        assert_eq!(module.find_action("cp").map(|a| a.name.as_str()), Some("copy"));
        assert_eq!(module.find_action("copy").map(|a| a.name.as_str()), Some("copy"));
        assert!(module.find_action("mv").is_none());
    }

    #[test]
    fn test_validate_rejects_misplaced_primary() {
        let module = ModuleSpec::new("m", "").action(
            ActionSpec::new("a", "")
                .param(ParameterSpec::named("x", ""))
                .param(ParameterSpec::primary("y", "")),
        );
        assert!(matches!(
            module.validate(),
            Err(RegistryError::InvalidSpec { reason, .. }) if reason.contains("first")
        ));
    }

    #[test]
    fn test_validate_rejects_required_named() {
        let mut required = ParameterSpec::named("x", "");
        required.required = true;
        let module = ModuleSpec::new("m", "").action(ActionSpec::new("a", "").param(required));
        assert!(module.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_alias_collision() {
        let module = ModuleSpec::new("file", "")
            .action(ActionSpec::new("del", "").alias("rm"))
            .action(ActionSpec::new("rm", ""));
        assert!(module.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        let module = ModuleSpec::new("user", "Users").action(user_add());
        assert_eq!(module.validate(), Ok(()));
    }
}
