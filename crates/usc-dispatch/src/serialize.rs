//! Structured data serialization.
//!
//! Handles TOML, JSON, YAML and CSV serialization of reports and help
//! documents.

use crate::OutputMode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during serialization.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("TOML serialization failed: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV serialization failed: {0}")]
    Csv(String),

    #[error("Not a structured output mode")]
    NotStructured,
}

/// Serializes data to the specified structured format.
///
/// Returns an error if the output mode is not a structured mode.
pub fn serialize_structured<T: Serialize>(
    data: &T,
    mode: OutputMode,
) -> Result<String, SerializeError> {
    match mode {
        OutputMode::Toml => to_toml(data),
        OutputMode::Json => Ok(serde_json::to_string_pretty(data)?),
        OutputMode::Yaml => Ok(serde_yaml::to_string(data)?),
        OutputMode::Csv => serialize_csv(data),
        _ => Err(SerializeError::NotStructured),
    }
}

/// Serializes data to TOML.
///
/// TOML has no null, so null values are dropped; a document that is not a
/// table is wrapped as `value = ...`.
pub fn to_toml<T: Serialize>(data: &T) -> Result<String, SerializeError> {
    let value = match prune_nulls(serde_json::to_value(data)?) {
        Some(table @ Value::Object(_)) => table,
        Some(other) => serde_json::json!({ "value": other }),
        None => Value::Object(Default::default()),
    };
    Ok(toml::to_string(&value)?)
}

fn prune_nulls(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => Some(Value::Object(
            map.into_iter()
                .filter_map(|(k, v)| prune_nulls(v).map(|v| (k, v)))
                .collect(),
        )),
        Value::Array(items) => Some(Value::Array(
            items.into_iter().filter_map(prune_nulls).collect(),
        )),
        other => Some(other),
    }
}

/// Serializes data to CSV format.
///
/// Tables shaped as `{headers, rows}` (anywhere under a `data` key or at
/// the top) are written as-is; arrays of objects use the first object's
/// keys as headers; other objects become `key,value` pairs.
pub fn serialize_csv<T: Serialize>(data: &T) -> Result<String, SerializeError> {
    let json_value = serde_json::to_value(data)?;
    let target = match &json_value {
        Value::Object(obj) if obj.contains_key("data") => &obj["data"],
        other => other,
    };
    flatten_json_to_csv(target)
}

fn flatten_json_to_csv(value: &Value) -> Result<String, SerializeError> {
    let csv_err = |e: csv::Error| SerializeError::Csv(e.to_string());
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(vec![]);

    match value {
        Value::Object(obj) if obj.contains_key("headers") && obj.contains_key("rows") => {
            if let Value::Array(headers) = &obj["headers"] {
                wtr.write_record(headers.iter().map(value_to_string))
                    .map_err(csv_err)?;
            }
            if let Value::Array(rows) = &obj["rows"] {
                for row in rows {
                    match row {
                        Value::Array(cells) => wtr
                            .write_record(cells.iter().map(value_to_string))
                            .map_err(csv_err)?,
                        other => wtr.write_record([value_to_string(other)]).map_err(csv_err)?,
                    }
                }
            }
        }
        Value::Array(arr) if !arr.is_empty() => {
            if let Some(Value::Object(first)) = arr.first() {
                let headers: Vec<&str> = first.keys().map(|s| s.as_str()).collect();
                wtr.write_record(&headers).map_err(csv_err)?;

                for item in arr {
                    if let Value::Object(obj) = item {
                        let row: Vec<String> = headers
                            .iter()
                            .map(|h| obj.get(*h).map(value_to_string).unwrap_or_default())
                            .collect();
                        wtr.write_record(&row).map_err(csv_err)?;
                    }
                }
            } else {
                wtr.write_record(["value"]).map_err(csv_err)?;
                for item in arr {
                    wtr.write_record([value_to_string(item)]).map_err(csv_err)?;
                }
            }
        }
        Value::Object(obj) => {
            wtr.write_record(["key", "value"]).map_err(csv_err)?;
            for (k, v) in obj {
                wtr.write_record([k.as_str(), &value_to_string(v)])
                    .map_err(csv_err)?;
            }
        }
        _ => {
            wtr.write_record(["value"]).map_err(csv_err)?;
            wtr.write_record([value_to_string(value)]).map_err(csv_err)?;
        }
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| SerializeError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| SerializeError::Csv(e.to_string()))
}

/// Converts a JSON value to a string for CSV output.
fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
