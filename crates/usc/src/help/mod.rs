//! The help/introspection service.
//!
//! Pure reads over the [`Registry`]: nothing here runs a command, so
//! completion scripts may call `usc help ...` as often as they like. The
//! documents come from the same [`ModuleSpec`](usc_dispatch::ModuleSpec)s the
//! dispatcher validates against.

mod data;

pub(crate) use data::NAME_COLUMN_WIDTH;
pub use data::{
    ActionHelp, ActionSummary, ExampleItem, ExampleList, HelpDocument, ModuleHelp, ModuleList,
    ModuleSummary, ParameterHelp,
};

use usc_dispatch::{DispatchError, HelpTopic, Registry};

/// Examples for the help system itself, listed ahead of module examples.
const HELP_EXAMPLES: &[(&str, &str)] = &[
    ("usc help", "List every module"),
    ("usc help user", "List the actions of the user module"),
    ("usc help action:user.add", "Show the parameters of user add"),
    ("usc user:help", "Same as usc help user"),
    ("usc help examples", "Show these examples"),
];

pub struct HelpService<'r> {
    registry: &'r Registry,
}

impl<'r> HelpService<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    pub fn describe_all(&self) -> ModuleList {
        ModuleList {
            modules: self.registry.modules().map(ModuleSummary::from).collect(),
        }
    }

    pub fn describe_module(&self, module: &str) -> Result<ModuleHelp, DispatchError> {
        self.registry.lookup(module).map(ModuleHelp::from)
    }

    /// Describes an action. Aliases resolve to the canonical action.
    pub fn describe_action(&self, module: &str, action: &str) -> Result<ActionHelp, DispatchError> {
        let spec = self.registry.lookup_action(module, action)?;
        Ok(ActionHelp::new(module, spec))
    }

    pub fn list_examples(&self) -> ExampleList {
        let builtin = HELP_EXAMPLES.iter().map(|(command, description)| ExampleItem {
            command: command.to_string(),
            description: description.to_string(),
        });
        let declared = self
            .registry
            .modules()
            .flat_map(|m| m.actions.values())
            .flat_map(|a| a.examples.iter())
            .map(ExampleItem::from);
        ExampleList {
            examples: builtin.chain(declared).collect(),
        }
    }

    pub fn answer(&self, topic: &HelpTopic) -> Result<HelpDocument, DispatchError> {
        tracing::debug!(?topic, "answering help request");
        Ok(match topic {
            HelpTopic::Modules => HelpDocument::Modules(self.describe_all()),
            HelpTopic::Module(m) => HelpDocument::Module(self.describe_module(m)?),
            HelpTopic::Action { module, action } => {
                HelpDocument::Action(self.describe_action(module, action)?)
            }
            HelpTopic::Examples => HelpDocument::Examples(self.list_examples()),
        })
    }
}
