use super::RecordError;
use serde_json::{Map, Value};

pub fn optional_string(fields: &Map<String, Value>, name: &str) -> Option<String> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn required_string(fields: &Map<String, Value>, name: &str) -> Result<String, RecordError> {
    optional_string(fields, name)
        .ok_or_else(|| RecordError::validation(format!("field `{name}` must be a non-empty string")))
}

/// Trimmed, non-empty, order-preserving and de-duplicated.
pub fn string_list(fields: &Map<String, Value>, name: &str) -> Result<Vec<String>, RecordError> {
    let Some(value) = fields.get(name) else {
        return Ok(Vec::new());
    };
    let Some(items) = value.as_array() else {
        return Err(RecordError::validation(format!(
            "field `{name}` must be an array of strings"
        )));
    };
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let Some(raw) = item.as_str() else {
            return Err(RecordError::validation(format!(
                "field `{name}` must be an array of strings"
            )));
        };
        let trimmed = raw.trim();
        if !trimmed.is_empty() && !out.iter().any(|existing| existing == trimmed) {
            out.push(trimmed.to_string());
        }
    }
    Ok(out)
}

pub fn positive_integer(fields: &Map<String, Value>, name: &str) -> Result<Option<u64>, RecordError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .filter(|number| *number > 0)
            .map(Some)
            .ok_or_else(|| {
                RecordError::validation(format!("field `{name}` must be a positive integer"))
            }),
    }
}

pub fn merge_unique(base: &[String], extra: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(base.len() + extra.len());
    for label in base.iter().cloned().chain(extra) {
        let trimmed = label.trim().to_string();
        if !trimmed.is_empty() && !merged.contains(&trimmed) {
            merged.push(trimmed);
        }
    }
    merged
}

pub fn set_string_list(fields: &mut Map<String, Value>, name: &str, values: &[String]) {
    if values.is_empty() {
        fields.remove(name);
        return;
    }
    fields.insert(
        name.to_string(),
        Value::Array(values.iter().cloned().map(Value::String).collect()),
    );
}

pub fn apply_title_prefix(title: String, prefix: Option<&str>) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() && !title.starts_with(prefix) => {
            format!("{prefix}{title}")
        }
        _ => title,
    }
}
