use super::{ConfigError, SafeOutputsConfig, TypeConfig};
use crate::outputs::{normalize_type_name, OutputType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const DEFAULT_TYPE_MAX: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Array,
    Choice,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Array => "array",
            FieldKind::Choice => "choice",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSchema {
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default, alias = "enum")]
    pub options: Vec<String>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub description: Option<String>,
}

impl FieldSchema {
    pub fn required(kind: FieldKind) -> Self {
        Self {
            kind,
            required: true,
            default: None,
            options: Vec::new(),
            max_length: None,
            description: None,
        }
    }

    pub fn optional(kind: FieldKind) -> Self {
        Self {
            required: false,
            ..Self::required(kind)
        }
    }

    pub fn options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|option| option.to_string()).collect();
        self
    }

    pub fn default_value(mut self, value: &str) -> Self {
        self.default = Some(Value::String(value.to_string()));
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Checks `value` against kind and options only; sanitization happens elsewhere.
    pub fn check_shape(&self, value: &Value) -> Result<(), String> {
        match (self.kind, value) {
            (FieldKind::String, Value::String(_)) => Ok(()),
            (FieldKind::Number, Value::Number(_)) => Ok(()),
            (FieldKind::Boolean, Value::Bool(_)) => Ok(()),
            (FieldKind::Array, Value::Array(_)) => Ok(()),
            (FieldKind::Choice, Value::String(raw)) => {
                if self.options.iter().any(|option| option == raw) {
                    Ok(())
                } else {
                    Err(format!(
                        "must be one of: {} (got `{raw}`)",
                        self.options.join(", ")
                    ))
                }
            }
            (kind, other) => Err(format!("must be a {kind}, got {}", value_kind(other))),
        }
    }
}

pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Resolved schema for one declared type: built-in fields overlaid with configured inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSchema {
    pub output_type: OutputType,
    pub max: u32,
    pub min: u32,
    pub fields: BTreeMap<String, FieldSchema>,
    pub options: TypeConfig,
}

/// The read-only per-batch schema table. Only declared types are accepted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSchemas {
    types: BTreeMap<OutputType, TypeSchema>,
}

impl BatchSchemas {
    pub fn from_config(config: &SafeOutputsConfig) -> Result<Self, ConfigError> {
        let mut types = BTreeMap::new();
        for (raw_name, type_config) in &config.types {
            let normalized = normalize_type_name(raw_name);
            let output_type =
                OutputType::parse(&normalized).ok_or_else(|| ConfigError::UnknownType {
                    name: raw_name.clone(),
                    known: OutputType::ALL
                        .iter()
                        .map(|candidate| candidate.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                })?;

            let mut fields = output_type.builtin_fields();
            for (field, schema) in &type_config.inputs {
                fields.insert(field.clone(), schema.clone());
            }

            let schema = TypeSchema {
                output_type,
                max: type_config.max.unwrap_or(DEFAULT_TYPE_MAX),
                min: type_config.min,
                fields,
                options: type_config.clone(),
            };
            if types.insert(output_type, schema).is_some() {
                return Err(ConfigError::DuplicateType {
                    name: output_type.as_str().to_string(),
                });
            }
        }
        Ok(Self { types })
    }

    pub fn get(&self, output_type: OutputType) -> Option<&TypeSchema> {
        self.types.get(&output_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeSchema> {
        self.types.values()
    }

    pub fn known_type_names(&self) -> Vec<&'static str> {
        self.types.keys().map(|output_type| output_type.as_str()).collect()
    }
}
