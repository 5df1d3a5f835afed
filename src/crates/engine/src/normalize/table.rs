use crate::normalize::artifact::{TableArtifact, TableColumn, TableMeta};
use crate::normalize::TOOL_TABLE;
use crate::util::errors::ValidationError;
use indexmap::IndexMap;
use log::debug;
use serde_json::{Map, Value};

const DEFAULT_TABLE_TYPE: &str = "comparison";

pub fn normalize_table(payload: &Value) -> Result<TableArtifact, ValidationError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| err("", "expected a JSON object payload"))?;

    // config and data are hard requirements; tableType is not (see below).
    let missing: Vec<&str> = ["config", "data"]
        .iter()
        .copied()
        .filter(|key| !obj.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(err(
            &missing.join(", "),
            format!("missing required key(s): {}", missing.join(", ")),
        ));
    }

    // Missing or invalid tableType is a soft recovery, not a failure: the
    // model gets a "comparison" table instead of an error. Intentional
    // asymmetry with charts and metrics.
    let table_type = match obj.get("tableType").and_then(Value::as_str) {
        Some(t) if !t.trim().is_empty() => t.to_string(),
        _ => {
            debug!("Table payload missing/invalid tableType, defaulting to {}", DEFAULT_TABLE_TYPE);
            DEFAULT_TABLE_TYPE.to_string()
        }
    };

    let config = obj["config"]
        .as_object()
        .ok_or_else(|| err("config", "expected an object"))?;
    let title = config
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let description = config
        .get("description")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(&title)
        .to_string();

    let rows: Vec<Map<String, Value>> = obj["data"]
        .as_array()
        .ok_or_else(|| err("data", "expected an array of row objects"))?
        .iter()
        .filter_map(Value::as_object)
        .cloned()
        .collect();

    let columns = build_columns(config, &rows);
    if columns.is_empty() {
        return Err(err("config.columns", "no usable columns"));
    }

    Ok(TableArtifact {
        table_type,
        config: TableMeta { title, description },
        columns,
        rows,
    })
}

/// Columns from config, falling back to the first data row's fields.
/// Keys are unique; a duplicate key keeps the first definition.
fn build_columns(config: &Map<String, Value>, rows: &[Map<String, Value>]) -> Vec<TableColumn> {
    let mut unique: IndexMap<String, TableColumn> = IndexMap::new();

    if let Some(configured) = config.get("columns").and_then(Value::as_array) {
        for entry in configured {
            let Some(entry) = entry.as_object() else {
                continue;
            };
            let Some(key) = entry.get("key").and_then(Value::as_str) else {
                continue;
            };
            let header = entry
                .get("header")
                .or_else(|| entry.get("label"))
                .and_then(Value::as_str)
                .unwrap_or(key)
                .to_string();
            let format = entry
                .get("format")
                .and_then(Value::as_str)
                .unwrap_or("text")
                .to_string();
            let width = entry
                .get("width")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| default_width(key).to_string());
            unique.entry(key.to_string()).or_insert(TableColumn {
                key: key.to_string(),
                header,
                format,
                width,
            });
        }
    }

    if unique.is_empty() {
        if let Some(first) = rows.first() {
            for key in first.keys() {
                unique.entry(key.clone()).or_insert(TableColumn {
                    key: key.clone(),
                    header: key.clone(),
                    format: "text".to_string(),
                    width: default_width(key).to_string(),
                });
            }
        }
    }

    unique.into_values().collect()
}

/// Key-name heuristic for the default column width.
fn default_width(key: &str) -> &'static str {
    let key = key.to_lowercase();
    const WIDE: [&str; 6] = ["name", "title", "description", "label", "summary", "item"];
    const MEDIUM: [&str; 7] = ["period", "date", "quarter", "year", "category", "segment", "metric"];
    if WIDE.iter().any(|w| key.contains(w)) {
        "lg"
    } else if MEDIUM.iter().any(|m| key.contains(m)) {
        "md"
    } else {
        "sm"
    }
}

fn err(field_path: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::new(TOOL_TABLE, field_path, message)
}
