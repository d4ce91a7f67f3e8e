//! Property-based tests for the grammar and the dispatcher using proptest.

use proptest::prelude::*;
use usc_dispatch::{
    parse, ActionResult, ActionSpec, Call, DispatchError, Dispatcher, ExecContext,
    HandlerResult, Invocation, Module, ModuleSpec, ParameterSpec, Registry, Request,
};
use usc_exec::testing::ScriptedRunner;
use usc_exec::CommandLine;

// ============================================================================
// Test helpers
// ============================================================================

struct Files;

impl Module for Files {
    fn spec(&self) -> ModuleSpec {
        ModuleSpec::new("file", "Files")
            .action(
                ActionSpec::new("copy", "Copy")
                    .alias("cp")
                    .param(ParameterSpec::primary("source", "Source path"))
                    .param(ParameterSpec::named("dest", "Destination"))
                    .param(ParameterSpec::flag("recursive", "Recurse"))
                    .param(ParameterSpec::named("mode", "Mode").default("0644")),
            )
            .action(
                ActionSpec::new("usage", "Usage")
                    .param(ParameterSpec::primary("path", "Path").default("/")),
            )
    }

    fn handle(&self, call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
        let cmd = CommandLine::new("cp")
            .arg_if(call.flag("recursive"), "-r")
            .arg(call.action_value())
            .args(call.get("dest"));
        Ok(ctx.run(&cmd)?.into())
    }
}

fn registry() -> Registry {
    Registry::builder().module(Files).build().unwrap()
}

fn invocation(args: &[String]) -> Option<Invocation> {
    match parse(args) {
        Ok(Request::Invoke(inv)) => Some(inv),
        _ => None,
    }
}

fn word() -> impl Strategy<Value = String> {
    "[a-z_]{1,8}"
}

fn value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9/:._ -]{0,16}"
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    /// Values keep every colon after the first one.
    #[test]
    fn first_colon_only(action in word(), v in value(), name in word(), pv in value()) {
        let args = vec![
            "file".to_string(),
            format!("{}:{}", action, v),
            format!("{}:{}", name, pv),
        ];
        let inv = invocation(&args).unwrap();
        prop_assert_eq!(inv.action, action);
        prop_assert_eq!(inv.action_value, v);
        prop_assert_eq!(&inv.parameters[&name], &pv);
    }

    /// The last occurrence of a repeated parameter wins.
    #[test]
    fn last_duplicate_wins(name in word(), values in prop::collection::vec(value(), 1..6)) {
        let mut args = vec!["file".to_string(), "cp:/a".to_string()];
        args.extend(values.iter().map(|v| format!("{}:{}", name, v)));
        let inv = invocation(&args).unwrap();
        prop_assert_eq!(inv.parameters.len(), 1);
        prop_assert_eq!(&inv.parameters[&name], values.last().unwrap());
    }

    /// Parsing arbitrary input never panics, and a parsed invocation always
    /// dispatches to either a result or a dispatch error.
    #[test]
    fn parse_then_dispatch_is_total(args in prop::collection::vec(value(), 0..5)) {
        let registry = registry();
        let runner = ScriptedRunner::new();
        let dispatcher = Dispatcher::new(&registry, &runner);
        if let Ok(Request::Invoke(inv)) = parse(&args) {
            let _: Result<ActionResult, DispatchError> = dispatcher.dispatch(&inv);
        }
    }

    /// Supplying a parameter's declared default explicitly resolves to the
    /// same mapping as leaving it out.
    #[test]
    fn defaults_are_idempotent(source in "/[a-z]{1,8}", dest in prop::option::of("/[a-z]{1,8}")) {
        let registry = registry();
        let runner = ScriptedRunner::new();
        let dispatcher = Dispatcher::new(&registry, &runner);

        let mut implicit = Invocation::new("file", "cp").value(source.clone());
        if let Some(d) = &dest {
            implicit = implicit.param("dest", d.clone());
        }
        let explicit = implicit.clone().param("mode", "0644").param("recursive", "false");

        let a = dispatcher.resolve(&implicit).unwrap();
        let b = dispatcher.resolve(&explicit).unwrap();
        prop_assert_eq!(a.params(), b.params());
        prop_assert_eq!(a.action_value(), b.action_value());
    }

    /// A required primary with an empty value is always rejected, whatever
    /// else is supplied, and nothing runs.
    #[test]
    fn required_value_is_enforced(params in prop::collection::vec((word(), value()), 0..5)) {
        let registry = registry();
        let runner = ScriptedRunner::new();
        let dispatcher = Dispatcher::new(&registry, &runner);

        let mut inv = Invocation::new("file", "copy");
        for (name, v) in params {
            inv = inv.param(name, v);
        }
        let err = dispatcher.dispatch(&inv).unwrap_err();
        let is_missing = matches!(err, DispatchError::MissingRequiredParameter { .. });
        prop_assert!(is_missing);
        prop_assert!(runner.commands().is_empty());
    }

    /// Unknown names resolve to the matching dispatch error.
    #[test]
    fn unknown_names(name in "[a-z]{1,8}") {
        prop_assume!(name != "file");
        let registry = registry();
        let runner = ScriptedRunner::new();
        let dispatcher = Dispatcher::new(&registry, &runner);

        prop_assert_eq!(
            dispatcher.dispatch(&Invocation::new(name.clone(), "copy")).unwrap_err(),
            DispatchError::UnknownModule(name.clone())
        );

        prop_assume!(!["copy", "cp", "usage"].contains(&name.as_str()));
        prop_assert_eq!(
            dispatcher.dispatch(&Invocation::new("file", name.clone())).unwrap_err(),
            DispatchError::UnknownAction { module: "file".into(), action: name }
        );
    }
}

// ============================================================================
// Registry / contract consistency
// ============================================================================

#[test]
fn resolved_names_match_declared_contract() {
    let registry = registry();
    let runner = ScriptedRunner::new();
    let dispatcher = Dispatcher::new(&registry, &runner);

    for module in registry.modules() {
        for action in module.actions.values() {
            let inv = Invocation::new(module.name.clone(), action.name.clone()).value("/x");
            let call = dispatcher.resolve(&inv).unwrap();
            for name in call.params().keys() {
                assert!(
                    action.parameter(name).is_some(),
                    "{}.{} resolved undeclared `{}`",
                    module.name,
                    action.name,
                    name
                );
            }
        }
    }
}

#[test]
fn alias_resolves_to_canonical_action() {
    let registry = registry();
    let runner = ScriptedRunner::new();
    let dispatcher = Dispatcher::new(&registry, &runner);

    let call = dispatcher
        .resolve(&Invocation::new("file", "cp").value("/a"))
        .unwrap();
    assert_eq!(call.action, "copy");
}

#[test]
fn optional_primary_uses_default() {
    let registry = registry();
    let runner = ScriptedRunner::new();
    let dispatcher = Dispatcher::new(&registry, &runner);

    let call = dispatcher.resolve(&Invocation::new("file", "usage")).unwrap();
    assert_eq!(call.action_value(), "/");
}
