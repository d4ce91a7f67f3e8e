//! usc: one command grammar for Linux administration.
//!
//! ```text
//! usc <module> <action>:<value> [<param>:<value> ...]
//! usc help [modules | examples | <module> | action:<module>.<action>]
//! ```
//!
//! The grammar, registry and dispatcher live in [`usc_dispatch`]; process
//! execution lives in [`usc_exec`]. This crate adds the command line, the
//! help service, reports and the built-in [`modules`].
//!
//! ```rust
//! use usc::cli::{App, Outcome};
//! use usc::config::Config;
//! use usc::modules::builtin_registry;
//! use usc_exec::testing::ScriptedRunner;
//!
//! let registry = builtin_registry()?;
//! let runner = ScriptedRunner::new();
//! let config = Config::default();
//! let app = App::new(&registry, &runner, &config);
//!
//! let outcome = app.execute(["user", "add:chenxi", "home:/home/chenxi"]);
//! assert_eq!(outcome.exit_code(), 0);
//! assert!(runner.lines()[0].starts_with("sudo useradd -m -d /home/chenxi"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod config;
pub mod help;
pub mod logging;
pub mod modules;
pub mod render;
pub mod report;
