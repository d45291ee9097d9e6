use super::mentions::MentionSet;
use super::sanitize::Sanitizer;
use crate::config::{FieldKind, FieldSchema, TypeSchema};
use serde_json::{Map, Number, Value};

/// Validates and normalizes a record's fields against its type schema.
///
/// Missing optional fields take their declared default, numeric strings in number
/// fields are coerced, strings (including string array elements) are sanitized with the
/// current mention allow-list, and undeclared fields are dropped. All field errors are
/// reported together.
pub fn validate_fields(
    schema: &TypeSchema,
    record: &Map<String, Value>,
    sanitizer: &dyn Sanitizer,
    mentions: &MentionSet,
) -> Result<Map<String, Value>, String> {
    let mut normalized = Map::new();
    let mut errors = Vec::new();

    for (name, field) in &schema.fields {
        let value = match record.get(name) {
            None | Some(Value::Null) => match &field.default {
                Some(default) => default.clone(),
                None if field.required => {
                    errors.push(format!("field `{name}` is required"));
                    continue;
                }
                None => continue,
            },
            Some(value) => coerce(field, value.clone()),
        };

        if let Err(reason) = field.check_shape(&value) {
            errors.push(format!("field `{name}` {reason}"));
            continue;
        }

        let value = sanitize_value(field, value, sanitizer, mentions);
        if let (Some(max_length), Value::String(text)) = (field.max_length, &value) {
            let length = text.chars().count();
            if length > max_length {
                errors.push(format!(
                    "field `{name}` must be at most {max_length} characters (got {length})"
                ));
                continue;
            }
        }
        normalized.insert(name.clone(), value);
    }

    if errors.is_empty() {
        Ok(normalized)
    } else {
        Err(errors.join("; "))
    }
}

fn coerce(field: &FieldSchema, value: Value) -> Value {
    match (field.kind, &value) {
        (FieldKind::Number, Value::String(raw)) => raw
            .trim()
            .trim_start_matches('#')
            .parse::<u64>()
            .map(|number| Value::Number(Number::from(number)))
            .unwrap_or(value),
        (FieldKind::Array, Value::String(raw)) if !raw.trim().is_empty() => {
            Value::Array(vec![value])
        }
        _ => value,
    }
}

fn sanitize_value(
    field: &FieldSchema,
    value: Value,
    sanitizer: &dyn Sanitizer,
    mentions: &MentionSet,
) -> Value {
    match (field.kind, value) {
        (FieldKind::String, Value::String(text)) => {
            Value::String(sanitizer.sanitize(&text, mentions))
        }
        (FieldKind::Array, Value::Array(items)) => Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(text) => Value::String(sanitizer.sanitize(&text, mentions)),
                    other => other,
                })
                .collect(),
        ),
        (_, other) => other,
    }
}
