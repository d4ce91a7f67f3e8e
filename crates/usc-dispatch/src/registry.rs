//! The module registry.
//!
//! Built once at startup and read-only afterwards. Module names are unique;
//! registering a name twice is a startup error, never a runtime condition.

use crate::error::{DispatchError, RegistryError};
use crate::handler::Module;
use crate::parser::HELP;
use crate::spec::{ActionSpec, ModuleSpec};
use indexmap::IndexMap;

struct Entry {
    spec: ModuleSpec,
    handler: Box<dyn Module>,
}

pub struct Registry {
    modules: IndexMap<String, Entry>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Looks up a module by name.
    pub fn lookup(&self, module: &str) -> Result<&ModuleSpec, DispatchError> {
        self.modules
            .get(module)
            .map(|e| &e.spec)
            .ok_or_else(|| DispatchError::UnknownModule(module.to_string()))
    }

    /// Looks up an action by name or alias.
    pub fn lookup_action(&self, module: &str, action: &str) -> Result<&ActionSpec, DispatchError> {
        self.lookup(module)?
            .find_action(action)
            .ok_or_else(|| DispatchError::UnknownAction {
                module: module.to_string(),
                action: action.to_string(),
            })
    }

    pub fn handler(&self, module: &str) -> Option<&dyn Module> {
        self.modules.get(module).map(|e| e.handler.as_ref())
    }

    /// Module specs in registration order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleSpec> {
        self.modules.values().map(|e| &e.spec)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Collects modules, then validates them all in [`build`](Self::build).
#[derive(Default)]
pub struct RegistryBuilder {
    modules: Vec<Box<dyn Module>>,
}

impl RegistryBuilder {
    pub fn module<M: Module + 'static>(mut self, module: M) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    pub fn boxed(mut self, module: Box<dyn Module>) -> Self {
        self.modules.push(module);
        self
    }

    pub fn build(self) -> Result<Registry, RegistryError> {
        let mut modules = IndexMap::new();
        for handler in self.modules {
            let spec = handler.spec();
            if spec.name == HELP {
                return Err(RegistryError::ReservedName(spec.name));
            }
            if spec.name.is_empty() || spec.name.contains(':') {
                return Err(RegistryError::InvalidSpec {
                    module: spec.name,
                    action: String::new(),
                    reason: "module names must be non-empty and contain no `:`".into(),
                });
            }
            if modules.contains_key(&spec.name) {
                return Err(RegistryError::DuplicateModule(spec.name));
            }
            spec.validate()?;
            tracing::trace!(module = %spec.name, actions = spec.actions.len(), "registered module");
            modules.insert(spec.name.clone(), Entry { spec, handler });
        }
        Ok(Registry { modules })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{ActionResult, Call, ExecContext, HandlerResult};
    use crate::spec::ParameterSpec;

    struct Fixed(&'static str);

    impl Module for Fixed {
        fn spec(&self) -> ModuleSpec {
            ModuleSpec::new(self.0, "test module").action(
                ActionSpec::new("del", "Delete")
                    .alias("rm")
                    .param(ParameterSpec::primary("path", "Target")),
            )
        }

        fn handle(&self, _call: &Call, _ctx: &ExecContext<'_>) -> HandlerResult {
            Ok(ActionResult::ok(""))
        }
    }

    #[test]
    fn test_lookup() {
        let registry = Registry::builder().module(Fixed("file")).build().unwrap();
        assert_eq!(registry.lookup("file").unwrap().name, "file");
        assert_eq!(registry.lookup_action("file", "rm").unwrap().name, "del");
        assert_eq!(
            registry.lookup("bogus"),
            Err(DispatchError::UnknownModule("bogus".into()))
        );
        assert_eq!(
            registry.lookup_action("file", "shred"),
            Err(DispatchError::UnknownAction {
                module: "file".into(),
                action: "shred".into()
            })
        );
    }

    #[test]
    fn test_duplicate_module_fails_fast() {
        let err = Registry::builder()
            .module(Fixed("file"))
            .module(Fixed("file"))
            .build()
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateModule("file".into()));
    }

    #[test]
    fn test_help_is_reserved() {
        let err = Registry::builder().module(Fixed("help")).build().unwrap_err();
        assert_eq!(err, RegistryError::ReservedName("help".into()));
    }

    struct Undefaulted;

    impl Module for Undefaulted {
        fn spec(&self) -> ModuleSpec {
            let mut level = ParameterSpec::named("level", "Compression level");
            level.default = None;
            ModuleSpec::new("archive", "test module").action(
                ActionSpec::new("pack", "Pack")
                    .param(ParameterSpec::primary("path", "Target"))
                    .param(level),
            )
        }

        fn handle(&self, _call: &Call, _ctx: &ExecContext<'_>) -> HandlerResult {
            Ok(ActionResult::ok(""))
        }
    }

    #[test]
    fn test_optional_parameter_without_default_is_rejected() {
        let err = Registry::builder().module(Undefaulted).build().unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InvalidSpec { ref module, ref action, ref reason }
                if module == "archive" && action == "pack" && reason.contains("`level`")
        ));
    }

    #[test]
    fn test_registration_order_is_kept() {
        let registry = Registry::builder()
            .module(Fixed("user"))
            .module(Fixed("file"))
            .build()
            .unwrap();
        let names: Vec<_> = registry.modules().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["user", "file"]);
    }
}
