//! Resolving invocations against the registry and running handlers.

use crate::error::DispatchError;
use crate::handler::{ActionResult, Call, ExecContext};
use crate::invocation::Invocation;
use crate::registry::Registry;
use crate::spec::ActionSpec;
use usc_exec::Runner;

pub struct Dispatcher<'a> {
    registry: &'a Registry,
    runner: &'a dyn Runner,
    sudo: bool,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a Registry, runner: &'a dyn Runner) -> Self {
        Self {
            registry,
            runner,
            sudo: true,
        }
    }

    /// Whether privileged commands get a `sudo` prefix. On by default.
    pub fn sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    /// Validates `invocation` against its action's contract and applies
    /// defaults.
    ///
    /// - The primary parameter is bound to the action value. An empty value
    ///   falls back to the primary's default; with no default it is
    ///   [`DispatchError::MissingRequiredParameter`].
    /// - Declared named parameters that were not supplied take their default,
    ///   or stay absent when they have none.
    /// - Undeclared parameters are passed through untouched.
    pub fn resolve(&self, invocation: &Invocation) -> Result<Call, DispatchError> {
        let action = self
            .registry
            .lookup_action(&invocation.module, &invocation.action)?;
        bind(&invocation.module, action, invocation)
    }

    /// Resolves and runs `invocation`.
    ///
    /// Handler failures never escape: they become a failed [`ActionResult`]
    /// carrying the propagated exit code and captured stderr.
    pub fn dispatch(&self, invocation: &Invocation) -> Result<ActionResult, DispatchError> {
        let call = self.resolve(invocation)?;
        let handler = self
            .registry
            .handler(&call.module)
            .ok_or_else(|| DispatchError::UnknownModule(call.module.clone()))?;

        tracing::info!(module = %call.module, action = %call.action, "dispatching");
        if !call.undeclared().is_empty() {
            tracing::debug!(
                parameters = ?call.undeclared().keys().collect::<Vec<_>>(),
                "passing through undeclared parameters"
            );
        }

        let ctx = ExecContext::new(self.runner, self.sudo);
        let mut result = match handler.handle(&call, &ctx) {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(error = %e, "handler failed");
                ActionResult::failed(&e)
            }
        };

        let transcript = ctx.transcript();
        if !transcript.is_empty() {
            result.command = Some(transcript.join("; "));
        }
        Ok(result)
    }
}

fn bind(module: &str, action: &ActionSpec, invocation: &Invocation) -> Result<Call, DispatchError> {
    let mut call = Call::new(module, action.name.clone());

    match action.primary() {
        Some(primary) => {
            let value = if !invocation.action_value.is_empty() {
                invocation.action_value.clone()
            } else if let Some(default) = &primary.default {
                default.clone()
            } else if primary.required {
                return Err(DispatchError::MissingRequiredParameter {
                    module: module.to_string(),
                    action: action.name.clone(),
                    parameter: primary.name.clone(),
                });
            } else {
                String::new()
            };
            call = call.primary(primary.name.clone(), value);
        }
        None => call = call.value(invocation.action_value.clone()),
    }

    for param in action.named() {
        if let Some(value) = invocation.parameters.get(&param.name) {
            call = call.param(param.name.clone(), value.clone());
        } else if let Some(default) = &param.default {
            call = call.defaulted(param.name.clone(), default.clone());
        }
    }

    for (name, value) in &invocation.parameters {
        if action.named().all(|p| &p.name != name) {
            call = call.passthrough(name.clone(), value.clone());
        }
    }

    Ok(call)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::handler::{HandlerResult, Module};
    use crate::spec::{ModuleSpec, ParameterSpec};
    use usc_exec::testing::{Reply, ScriptedRunner};
    use usc_exec::CommandLine;

    struct Users;

    impl Module for Users {
        fn spec(&self) -> ModuleSpec {
            ModuleSpec::new("user", "Manage users")
                .action(
                    ActionSpec::new("add", "Create a user")
                        .param(ParameterSpec::primary("username", "Account name"))
                        .param(ParameterSpec::named("home", "Home directory"))
                        .param(ParameterSpec::named("shell", "Login shell").default("/bin/bash")),
                )
                .action(
                    ActionSpec::new("list", "List users")
                        .param(ParameterSpec::primary("type", "login|nologin|all").default("login")),
                )
                .action(ActionSpec::new("boom", "Always fails"))
        }

        fn handle(&self, call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
            match call.action.as_str() {
                "add" => {
                    let cmd = ctx
                        .privileged("useradd")
                        .opt("-d", call.get("home"))
                        .opt("-s", call.get("shell"))
                        .arg(call.action_value());
                    Ok(ctx.run(&cmd)?.into())
                }
                "list" => Ok(ctx.run(&CommandLine::new("getent").arg("passwd"))?.into()),
                _ => Err(HandlerError::missing("nothing", "always fails")),
            }
        }
    }

    fn registry() -> Registry {
        Registry::builder().module(Users).build().unwrap()
    }

    #[test]
    fn test_resolve_applies_defaults() {
        let registry = registry();
        let runner = ScriptedRunner::new();
        let dispatcher = Dispatcher::new(&registry, &runner);

        let call = dispatcher
            .resolve(&Invocation::new("user", "add").value("chenxi"))
            .unwrap();
        assert_eq!(call.action_value(), "chenxi");
        assert_eq!(call.get("shell"), Some("/bin/bash"));
        assert_eq!(call.get("home"), None);

        let call = dispatcher.resolve(&Invocation::new("user", "list")).unwrap();
        assert_eq!(call.action_value(), "login");
    }

    #[test]
    fn test_missing_required_value() {
        let registry = registry();
        let runner = ScriptedRunner::new();
        let dispatcher = Dispatcher::new(&registry, &runner);

        let err = dispatcher
            .dispatch(&Invocation::new("user", "add").param("home", "/home/x"))
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::MissingRequiredParameter {
                module: "user".into(),
                action: "add".into(),
                parameter: "username".into(),
            }
        );
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn test_undeclared_parameters_pass_through() {
        let registry = registry();
        let runner = ScriptedRunner::new();
        let dispatcher = Dispatcher::new(&registry, &runner);

        let call = dispatcher
            .resolve(&Invocation::new("user", "add").value("x").param("colour", "blue"))
            .unwrap();
        assert_eq!(call.undeclared().get("colour").map(String::as_str), Some("blue"));
        assert!(!call.params().contains_key("colour"));
    }

    #[test]
    fn test_defaults_are_not_supplied_values() {
        let registry = registry();
        let runner = ScriptedRunner::new();
        let dispatcher = Dispatcher::new(&registry, &runner);

        let call = dispatcher
            .resolve(&Invocation::new("user", "add").value("x").param("home", ""))
            .unwrap();
        assert_eq!(call.supplied("home"), Some(""));
        assert_eq!(call.get("home"), None);
        assert_eq!(call.supplied("shell"), None);
        assert_eq!(call.get("shell"), Some("/bin/bash"));

        let call = dispatcher
            .resolve(&Invocation::new("user", "add").value("x"))
            .unwrap();
        assert_eq!(call.raw("home"), Some(""));
        assert_eq!(call.supplied("home"), None);
    }

    #[test]
    fn test_dispatch_runs_handler_and_records_command() {
        let registry = registry();
        let runner = ScriptedRunner::new();
        let dispatcher = Dispatcher::new(&registry, &runner);

        let result = dispatcher
            .dispatch(&Invocation::new("user", "add").value("chenxi").param("home", "/home/chenxi"))
            .unwrap();
        assert!(result.success);
        assert_eq!(
            result.command.as_deref(),
            Some("sudo useradd -d /home/chenxi -s /bin/bash chenxi")
        );
    }

    #[test]
    fn test_handler_failure_becomes_failed_result() {
        let registry = registry();
        let runner = ScriptedRunner::new().reply("useradd", Reply::fail(9, "useradd: user exists"));
        let dispatcher = Dispatcher::new(&registry, &runner).sudo(false);

        let result = dispatcher
            .dispatch(&Invocation::new("user", "add").value("chenxi"))
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, 9);
        assert_eq!(result.stderr, "useradd: user exists");
        assert_eq!(result.command.as_deref(), Some("useradd -s /bin/bash chenxi"));

        let result = dispatcher.dispatch(&Invocation::new("user", "boom")).unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, 1);
        assert!(result.command.is_none());
    }
}
