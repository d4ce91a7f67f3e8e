//! Text rendering for help documents, reports and errors.
//!
//! Templates are minijinja, embedded at build time. Two filters are
//! registered:
//!
//! - `style_as(name)`: applies the theme's [`Style`] for `name`, or leaves
//!   the text alone when styling is off or the name is not in the theme
//! - `pad(width?)`: pads to the name column width, keeping at least two
//!   spaces after long names

use crate::help::{HelpDocument, NAME_COLUMN_WIDTH};
use crate::report::Report;
use console::Style;
use minijinja::{context, Environment, Value};
use std::collections::HashMap;
use thiserror::Error;
use usc_dispatch::SerializeError;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

/// Named styles available to `style_as`.
pub type Theme = HashMap<&'static str, Style>;

pub fn default_theme() -> Theme {
    HashMap::from([
        ("header", Style::new().bold()),
        ("item", Style::new().bold()),
        ("usage", Style::new().cyan()),
        ("example", Style::new().green()),
        ("error", Style::new().red().bold()),
        ("hint", Style::new().dim()),
    ])
}

const TEMPLATES: &[(&str, &str)] = &[
    ("help_modules", include_str!("templates/help_modules.txt")),
    ("help_module", include_str!("templates/help_module.txt")),
    ("help_action", include_str!("templates/help_action.txt")),
    ("help_examples", include_str!("templates/help_examples.txt")),
    ("report", include_str!("templates/report.txt")),
    ("error", include_str!("templates/error.txt")),
];

pub struct TextRenderer {
    env: Environment<'static>,
}

impl TextRenderer {
    pub fn new(styled: bool) -> Result<Self, RenderError> {
        Self::with_theme(default_theme(), styled)
    }

    pub fn with_theme(theme: Theme, styled: bool) -> Result<Self, RenderError> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);

        env.add_filter("style_as", move |value: Value, name: String| -> String {
            let text = value.to_string();
            match theme.get(name.as_str()) {
                Some(style) if styled => style.apply_to(text).force_styling(true).to_string(),
                _ => text,
            }
        });
        env.add_filter("pad", |value: Value, width: Option<usize>| -> String {
            pad(&value.to_string(), width.unwrap_or(NAME_COLUMN_WIDTH))
        });

        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    pub fn help(&self, doc: &HelpDocument) -> Result<String, RenderError> {
        let name = match doc {
            HelpDocument::Modules(_) => "help_modules",
            HelpDocument::Module(_) => "help_module",
            HelpDocument::Action(_) => "help_action",
            HelpDocument::Examples(_) => "help_examples",
        };
        Ok(self.env.get_template(name)?.render(doc)?)
    }

    /// A one-line summary, for actions that printed nothing.
    pub fn report(&self, report: &Report) -> Result<String, RenderError> {
        Ok(self.env.get_template("report")?.render(report)?)
    }

    pub fn error(&self, message: &str, hint: Option<&str>) -> Result<String, RenderError> {
        Ok(self
            .env
            .get_template("error")?
            .render(context! { message, hint })?)
    }
}

fn pad(text: &str, width: usize) -> String {
    if text.chars().count() + 2 > width {
        format!("{}  ", text)
    } else {
        format!("{:<width$}", text, width = width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::help::{ActionHelp, ExampleItem, ExampleList, ModuleList, ModuleSummary, ParameterHelp};
    use serde_json::json;

    fn plain() -> TextRenderer {
        TextRenderer::new(false).unwrap()
    }

    #[test]
    fn test_pad() {
        assert_eq!(pad("user", 8), "user    ");
        assert_eq!(pad("filesystem", 8), "filesystem  ");
    }

    #[test]
    fn test_modules_list() {
        let doc = HelpDocument::Modules(ModuleList {
            modules: vec![ModuleSummary {
                name: "user".into(),
                description: "Manage user accounts".into(),
            }],
        });
        let text = plain().help(&doc).unwrap();
        assert!(text.starts_with("Modules\n"), "{}", text);
        assert!(text.contains("\n  user          Manage user accounts\n"), "{}", text);
    }

    #[test]
    fn test_action_help() {
        let doc = HelpDocument::Action(ActionHelp {
            module: "user".into(),
            action: "add".into(),
            aliases: vec![],
            description: "Create a user".into(),
            usage: "usc user add:<username> home:<home>".into(),
            notes: vec![],
            parameters: vec![
                ParameterHelp {
                    name: "username".into(),
                    primary: true,
                    required: true,
                    default: None,
                    description: "Account name".into(),
                },
                ParameterHelp {
                    name: "home".into(),
                    primary: false,
                    required: false,
                    default: Some(String::new()),
                    description: "Home directory".into(),
                },
                ParameterHelp {
                    name: "system".into(),
                    primary: false,
                    required: false,
                    default: Some("false".into()),
                    description: "System account".into(),
                },
            ],
            examples: vec![],
        });
        let text = plain().help(&doc).unwrap();
        assert!(text.starts_with("user add - Create a user\n"), "{}", text);
        assert!(text.contains("  usc user add:<username> home:<home>\n"), "{}", text);
        assert!(text.contains("username      Account name (required)\n"), "{}", text);
        assert!(text.contains("system        System account [default: false]"), "{}", text);
        assert!(text.contains("home          Home directory\n"), "{}", text);
        assert!(!text.contains("[default: ]"), "{}", text);
        assert!(!text.contains("Notes"), "{}", text);
    }

    #[test]
    fn test_examples() {
        let doc = HelpDocument::Examples(ExampleList {
            examples: vec![ExampleItem {
                command: "usc help".into(),
                description: "List every module".into(),
            }],
        });
        let text = plain().help(&doc).unwrap();
        assert_eq!(text, "Examples\n  usc help\n      List every module\n");
    }

    #[test]
    fn test_styling_is_applied_only_when_enabled() {
        let styled = TextRenderer::new(true).unwrap();
        let text = styled.error("unknown module `bogus`", None).unwrap();
        assert!(text.contains('\u{1b}'), "{:?}", text);

        let text = plain().error("unknown module `bogus`", Some("run `usc help`")).unwrap();
        assert_eq!(text, "error: unknown module `bogus`\nrun `usc help`\n");
    }

    #[test]
    fn test_report_summary() {
        let report = Report::success("service", Some("start".into()), json!({"items": []}));
        let text = plain().report(&report).unwrap();
        assert_eq!(text, "service start: success\n");
    }
}
