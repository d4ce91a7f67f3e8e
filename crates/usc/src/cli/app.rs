//! The application: parse, dispatch or answer help, then render.

use crate::config::Config;
use crate::help::{HelpDocument, HelpService};
use crate::render::{RenderError, TextRenderer};
use crate::report::Report;
use usc_dispatch::{
    parse, serialize_structured, to_toml, ActionResult, Dispatcher, HelpTopic, OutputMode,
    Registry, Request, SerializeError,
};
use usc_exec::{exit_code, Runner};

const USAGE_HINT: &str = "Run `usc help` to list modules, or `usc help <module>` for its actions.";

/// What one invocation came to.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Help(HelpDocument),
    Action {
        module: String,
        action: String,
        result: ActionResult,
    },
    /// A parse or dispatch error; nothing ran.
    Failure {
        module: String,
        action: Option<String>,
        message: String,
        code: i32,
    },
}

impl Outcome {
    fn usage_error(module: impl Into<String>, action: Option<String>, message: String) -> Self {
        Outcome::Failure {
            module: module.into(),
            action,
            message,
            code: exit_code::USAGE,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Help(_) => exit_code::SUCCESS,
            Outcome::Action { result, .. } => result.exit_code,
            Outcome::Failure { code, .. } => *code,
        }
    }

    pub fn report(&self) -> Result<Report, SerializeError> {
        Ok(match self {
            Outcome::Help(doc) => Report::success(
                "help",
                Some(doc.kind().to_string()),
                serde_json::to_value(doc)?,
            ),
            Outcome::Action {
                module,
                action,
                result,
            } => Report::from_result(module, action, result),
            Outcome::Failure {
                module,
                action,
                message,
                code,
            } => Report::failure(module.clone(), action.clone(), message.clone(), *code),
        })
    }
}

/// Rendered output, split by stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub stdout: String,
    pub stderr: String,
}

pub struct App<'a> {
    registry: &'a Registry,
    runner: &'a dyn Runner,
    config: &'a Config,
}

impl<'a> App<'a> {
    pub fn new(registry: &'a Registry, runner: &'a dyn Runner, config: &'a Config) -> Self {
        Self {
            registry,
            runner,
            config,
        }
    }

    pub fn execute<I, S>(&self, args: I) -> Outcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();
        let request = match parse(&args) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(error = %e, "parse failed");
                let module = args.first().map(String::as_str).unwrap_or("usc");
                return Outcome::usage_error(module, None, e.to_string());
            }
        };

        match request {
            Request::Help(topic) => match HelpService::new(self.registry).answer(&topic) {
                Ok(doc) => Outcome::Help(doc),
                Err(e) => Outcome::usage_error("help", Some(topic_kind(&topic).into()), e.to_string()),
            },
            Request::Invoke(invocation) => {
                let dispatcher = Dispatcher::new(self.registry, self.runner).sudo(self.config.sudo);
                match dispatcher.dispatch(&invocation) {
                    Ok(result) => {
                        let action = self
                            .registry
                            .lookup_action(&invocation.module, &invocation.action)
                            .map(|a| a.name.clone())
                            .unwrap_or(invocation.action);
                        Outcome::Action {
                            module: invocation.module,
                            action,
                            result,
                        }
                    }
                    Err(e) => Outcome::usage_error(
                        invocation.module,
                        Some(invocation.action),
                        e.to_string(),
                    ),
                }
            }
        }
    }

    /// Renders `outcome` in the configured output mode.
    ///
    /// Structured modes always put the report on stdout, failures included,
    /// so scripts see one document per run. Text and raw modes send errors to
    /// stderr.
    pub fn render(&self, outcome: &Outcome, styled: bool) -> Result<Rendered, RenderError> {
        let mode = self.config.output;
        if mode.is_structured() {
            return Ok(Rendered {
                stdout: serialize_structured(&outcome.report()?, mode)?,
                stderr: String::new(),
            });
        }

        let text = TextRenderer::new(styled)?;
        let rendered = match (outcome, mode) {
            (Outcome::Help(_), OutputMode::Raw) => Rendered {
                stdout: to_toml(&outcome.report()?)?,
                stderr: String::new(),
            },
            (Outcome::Help(doc), _) => Rendered {
                stdout: text.help(doc)?,
                stderr: String::new(),
            },
            (Outcome::Action { result, .. }, OutputMode::Raw) => Rendered {
                stdout: result.stdout.clone(),
                stderr: result.stderr.clone(),
            },
            (Outcome::Action { result, .. }, _) if result.success => Rendered {
                stdout: if result.stdout.is_empty() {
                    text.report(&outcome.report()?)?
                } else {
                    result.stdout.clone()
                },
                stderr: String::new(),
            },
            (Outcome::Action { result, .. }, _) => {
                let message = outcome
                    .report()?
                    .error
                    .map(|e| e.message)
                    .unwrap_or_default();
                Rendered {
                    stdout: result.stdout.clone(),
                    stderr: text.error(&message, None)?,
                }
            }
            (Outcome::Failure { message, .. }, _) => Rendered {
                stdout: String::new(),
                stderr: text.error(message, Some(USAGE_HINT))?,
            },
        };
        Ok(rendered)
    }
}

fn topic_kind(topic: &HelpTopic) -> &'static str {
    match topic {
        HelpTopic::Modules => "modules",
        HelpTopic::Module(_) => "module",
        HelpTopic::Action { .. } => "action",
        HelpTopic::Examples => "examples",
    }
}
