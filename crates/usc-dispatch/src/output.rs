//! Output mode control.
//!
//! [`OutputMode`] determines how a report or help document is written: as
//! one of the structured serializations, as styled text, or raw.

use std::io::Write;
use std::path::{Path, PathBuf};

/// The user-facing values of the `--output` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputMode {
    /// Nested key/value documents, stable for line-oriented parsing
    #[default]
    Toml,
    /// The external command's own stdout and stderr, untouched
    Raw,
    /// Human-readable text with terminal styling when attached to a TTY
    Text,
    Json,
    Yaml,
    /// Tabular data flattened to comma-separated rows
    Csv,
}

impl OutputMode {
    /// Returns true for the modes that serialize data (TOML, JSON, YAML, CSV).
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            OutputMode::Toml | OutputMode::Json | OutputMode::Yaml | OutputMode::Csv
        )
    }

    /// File extension used when a report file name is generated.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputMode::Toml => "toml",
            OutputMode::Json => "json",
            OutputMode::Yaml => "yaml",
            OutputMode::Csv => "csv",
            OutputMode::Raw | OutputMode::Text => "txt",
        }
    }
}

/// Destination for rendered output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputDestination {
    #[default]
    Stdout,
    File(PathBuf),
}

impl OutputDestination {
    /// Writes text content to this destination.
    pub fn write_text(&self, content: &str) -> std::io::Result<()> {
        match self {
            OutputDestination::Stdout => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                if content.ends_with('\n') {
                    handle.write_all(content.as_bytes())
                } else {
                    writeln!(handle, "{}", content)
                }
            }
            OutputDestination::File(path) => {
                validate_path(path)?;
                std::fs::write(path, content)
            }
        }
    }
}

/// Validates that a file path's parent directory exists.
fn validate_path(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Parent directory does not exist: {}", parent.display()),
            ));
        }
    }
    Ok(())
}
