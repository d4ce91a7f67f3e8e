//! The uniform report envelope.
//!
//! Every outcome (action result, help document, usage error) is reported
//! as the same top-level shape:
//!
//! ```toml
//! module = "user"
//! action = "list"
//! status = "success"
//! command = "getent passwd"
//! exit_code = 0
//!
//! [data]
//! ...
//! ```
//!
//! Failures carry an `[error]` table with `message` and `code` instead of
//! `data`.

use serde::Serialize;
use serde_json::{json, Map, Value};
use usc_dispatch::ActionResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorInfo {
    pub message: String,
    pub code: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub module: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl Report {
    pub fn success(module: impl Into<String>, action: Option<String>, data: Value) -> Self {
        Self {
            module: module.into(),
            action,
            status: Status::Success,
            command: None,
            exit_code: None,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(
        module: impl Into<String>,
        action: Option<String>,
        message: impl Into<String>,
        code: i32,
    ) -> Self {
        Self {
            module: module.into(),
            action,
            status: Status::Error,
            command: None,
            exit_code: Some(code),
            data: None,
            error: Some(ErrorInfo {
                message: message.into(),
                code,
            }),
        }
    }

    /// Reports an action result. Handler-built data wins; otherwise data is
    /// derived from stdout.
    pub fn from_result(module: &str, action: &str, result: &ActionResult) -> Self {
        let mut report = if result.success {
            let data = result
                .data
                .clone()
                .unwrap_or_else(|| parse_command_output(&result.stdout));
            Report::success(module, Some(action.to_string()), data)
        } else {
            let message = match result.stderr.trim() {
                "" => format!("command failed with exit code {}", result.exit_code),
                stderr => stderr.to_string(),
            };
            Report::failure(module, Some(action.to_string()), message, result.exit_code)
        };
        report.command = result.command.clone();
        report.exit_code = Some(result.exit_code);
        report
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// Turns command output into structured data.
///
/// - a JSON object is passed through
/// - text with tabs or runs of spaces becomes `{headers, rows}`
/// - `key=value` lines become a map
/// - anything else becomes `{items}`, one per line
pub fn parse_command_output(output: &str) -> Value {
    let trimmed = output.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value @ Value::Object(_)) => return value,
            _ => tracing::debug!("output looked like JSON but did not parse"),
        }
    }
    if output.contains('\t') || output.contains("  ") {
        parse_table(trimmed)
    } else if output.contains('\n') && output.contains('=') {
        parse_key_values(trimmed)
    } else {
        json!({ "items": output.lines().collect::<Vec<_>>() })
    }
}

fn parse_table(output: &str) -> Value {
    let mut lines = output.lines().filter(|l| !l.trim().is_empty());
    let Some(first) = lines.next() else {
        return json!({ "headers": [], "rows": [] });
    };

    let split: fn(&str) -> Vec<String> = if first.contains('\t') {
        |line| line.split('\t').map(|c| c.trim().to_string()).collect()
    } else if first.trim().contains("  ") {
        split_on_wide_gaps
    } else {
        |line| line.split_whitespace().map(str::to_string).collect()
    };

    let headers = split(first);
    let rows: Vec<Vec<String>> = lines.map(split).collect();
    json!({ "headers": headers, "rows": rows })
}

/// Splits on runs of two or more spaces, keeping single spaces inside cells.
fn split_on_wide_gaps(line: &str) -> Vec<String> {
    line.trim()
        .split("  ")
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_key_values(output: &str) -> Value {
    let map: Map<String, Value> = output
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), Value::String(v.trim().to_string())))
        .collect();
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_passthrough() {
        let data = parse_command_output("{\"blockdevices\": []}\n");
        assert_eq!(data, json!({"blockdevices": []}));
    }

    #[test]
    fn test_table() {
        let out = "NAME   SIZE  TYPE\nsda    20G   disk\nsda1   1G    part\n";
        let data = parse_command_output(out);
        assert_eq!(data["headers"], json!(["NAME", "SIZE", "TYPE"]));
        assert_eq!(data["rows"][1], json!(["sda1", "1G", "part"]));
    }

    #[test]
    fn test_table_keeps_single_spaces_in_cells() {
        let out = "UNIT  DESCRIPTION\nsshd.service  OpenSSH server daemon\n";
        let data = parse_command_output(out);
        assert_eq!(data["rows"][0], json!(["sshd.service", "OpenSSH server daemon"]));
    }

    #[test]
    fn test_tab_separated() {
        let data = parse_command_output("a\tb\n1\t2\n");
        assert_eq!(data, json!({"headers": ["a", "b"], "rows": [["1", "2"]]}));
    }

    #[test]
    fn test_key_values() {
        let data = parse_command_output("NAME=Fedora\nVERSION_ID=40\n");
        assert_eq!(data, json!({"NAME": "Fedora", "VERSION_ID": "40"}));
    }

    #[test]
    fn test_plain_lines() {
        let data = parse_command_output("root\nchenxi\n");
        assert_eq!(data, json!({"items": ["root", "chenxi"]}));
        assert_eq!(parse_command_output(""), json!({"items": []}));
    }

    #[test]
    fn test_report_from_failed_result() {
        let result = ActionResult {
            success: false,
            exit_code: 6,
            stderr: "userdel: user 'ghost' does not exist\n".into(),
            command: Some("sudo userdel ghost".into()),
            ..ActionResult::default()
        };
        let report = Report::from_result("user", "del", &result);
        assert!(!report.is_success());
        assert_eq!(report.exit_code, Some(6));
        let error = report.error.unwrap();
        assert_eq!(error.code, 6);
        assert_eq!(error.message, "userdel: user 'ghost' does not exist");
        assert!(report.data.is_none());
    }

    #[test]
    fn test_report_prefers_handler_data() {
        let result = ActionResult::ok("ignored  text\n").with_data(json!({"count": 2}));
        let report = Report::from_result("user", "list", &result);
        assert_eq!(report.data, Some(json!({"count": 2})));
    }

    #[test]
    fn test_report_field_order() {
        let report = Report::success("help", Some("modules".into()), json!({"modules": []}));
        let text = serde_json::to_string(&report).unwrap();
        assert_eq!(
            text,
            r#"{"module":"help","action":"modules","status":"success","data":{"modules":[]}}"#
        );
    }
}
