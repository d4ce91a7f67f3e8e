//! Grammar, registry and dispatch engine for usc.
//!
//! `usc-dispatch` turns an argument vector like
//! `user add:chenxi home:/home/chenxi` into a validated call on a registered
//! module. It knows nothing about any particular module: modules describe
//! themselves with a [`ModuleSpec`] and the same description drives both
//! validation and help.
//!
//! # Pipeline
//!
//! ```text
//! args ──parse──▶ Request ─┬─ Help(topic) ──▶ help service
//!                          └─ Invoke(Invocation) ──Dispatcher──▶ Call ──Module::handle──▶ ActionResult
//! ```
//!
//! ```rust
//! use usc_dispatch::{
//!     parse, ActionResult, ActionSpec, Call, Dispatcher, ExecContext, HandlerResult, Module,
//!     ModuleSpec, ParameterSpec, Registry, Request,
//! };
//! use usc_exec::testing::ScriptedRunner;
//!
//! struct Greeter;
//!
//! impl Module for Greeter {
//!     fn spec(&self) -> ModuleSpec {
//!         ModuleSpec::new("greet", "Say hello").action(
//!             ActionSpec::new("hello", "Greet someone")
//!                 .param(ParameterSpec::primary("name", "Who to greet")),
//!         )
//!     }
//!
//!     fn handle(&self, call: &Call, ctx: &ExecContext<'_>) -> HandlerResult {
//!         let cmd = usc_exec::CommandLine::new("echo").arg(call.action_value());
//!         Ok(ctx.run(&cmd)?.into())
//!     }
//! }
//!
//! let registry = Registry::builder().module(Greeter).build()?;
//! let runner = ScriptedRunner::new();
//! let Request::Invoke(invocation) = parse(["greet", "hello:world"])? else {
//!     unreachable!()
//! };
//! let result: ActionResult = Dispatcher::new(&registry, &runner).dispatch(&invocation)?;
//! assert!(result.success);
//! assert_eq!(runner.lines(), ["echo world"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod dispatch;
mod error;
mod handler;
mod invocation;
mod output;
mod parser;
mod registry;
mod serialize;
mod spec;

pub use dispatch::Dispatcher;

pub use error::{DispatchError, HandlerError, ParseError, RegistryError};

pub use handler::{one_of, ActionResult, Call, ExecContext, HandlerResult, Module};

pub use invocation::{HelpTopic, Invocation, Request};

pub use output::{OutputDestination, OutputMode};

pub use parser::{parse, HELP};

pub use registry::{Registry, RegistryBuilder};

pub use serialize::{serialize_csv, serialize_structured, to_toml, SerializeError};

pub use spec::{ActionSpec, Example, ModuleSpec, ParameterSpec};
