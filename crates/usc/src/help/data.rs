//! Serializable help documents.
//!
//! Field order is the on-wire order: scalar keys first, then arrays of
//! tables, so the TOML form reads top to bottom as sections.

use serde::Serialize;
use usc_dispatch::{ActionSpec, Example, ModuleSpec, ParameterSpec};

/// Fixed width for the name column in text help (modules, actions, parameters).
pub(crate) const NAME_COLUMN_WIDTH: usize = 14;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleSummary {
    pub name: String,
    pub description: String,
}

impl From<&ModuleSpec> for ModuleSummary {
    fn from(spec: &ModuleSpec) -> Self {
        Self {
            name: spec.name.clone(),
            description: spec.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleList {
    pub modules: Vec<ModuleSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionSummary {
    pub action: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    pub description: String,
    pub usage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleHelp {
    pub module: String,
    pub description: String,
    pub actions: Vec<ActionSummary>,
}

impl From<&ModuleSpec> for ModuleHelp {
    fn from(spec: &ModuleSpec) -> Self {
        let actions = spec
            .actions
            .values()
            .map(|a| ActionSummary {
                action: a.name.clone(),
                aliases: a.aliases.clone(),
                description: a.description.clone(),
                usage: a.usage_example.clone(),
            })
            .collect();
        Self {
            module: spec.name.clone(),
            description: spec.description.clone(),
            actions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterHelp {
    pub name: String,
    pub primary: bool,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub description: String,
}

impl From<&ParameterSpec> for ParameterHelp {
    fn from(p: &ParameterSpec) -> Self {
        Self {
            name: p.name.clone(),
            primary: p.primary,
            required: p.required,
            default: p.default.clone(),
            description: p.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExampleItem {
    pub command: String,
    pub description: String,
}

impl From<&Example> for ExampleItem {
    fn from(e: &Example) -> Self {
        Self {
            command: e.command.clone(),
            description: e.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionHelp {
    pub module: String,
    pub action: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    pub description: String,
    pub usage: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    pub parameters: Vec<ParameterHelp>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<ExampleItem>,
}

impl ActionHelp {
    pub fn new(module: &str, spec: &ActionSpec) -> Self {
        Self {
            module: module.to_string(),
            action: spec.name.clone(),
            aliases: spec.aliases.clone(),
            description: spec.description.clone(),
            usage: spec.usage_example.clone(),
            notes: spec.notes.clone(),
            parameters: spec.parameters.iter().map(ParameterHelp::from).collect(),
            examples: spec.examples.iter().map(ExampleItem::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExampleList {
    pub examples: Vec<ExampleItem>,
}

/// One answered help request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HelpDocument {
    Modules(ModuleList),
    Module(ModuleHelp),
    Action(ActionHelp),
    Examples(ExampleList),
}

impl HelpDocument {
    /// The report `action` this document is filed under.
    pub fn kind(&self) -> &'static str {
        match self {
            HelpDocument::Modules(_) => "modules",
            HelpDocument::Module(_) => "module",
            HelpDocument::Action(_) => "action",
            HelpDocument::Examples(_) => "examples",
        }
    }
}
