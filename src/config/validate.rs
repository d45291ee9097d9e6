use super::{BatchSchemas, ConfigError, FieldKind, SafeOutputsConfig};
use crate::targeting::RepoSlug;

pub fn validate_config(config: &SafeOutputsConfig) -> Result<(), ConfigError> {
    if let Some(default_repo) = &config.default_repo {
        RepoSlug::parse(default_repo).map_err(|reason| {
            ConfigError::Invalid(format!("default_repo `{default_repo}`: {reason}"))
        })?;
    }
    if config.max == Some(0) {
        return Err(ConfigError::Invalid(
            "max must be at least 1 when set".to_string(),
        ));
    }

    let schemas = BatchSchemas::from_config(config)?;
    for schema in schemas.iter() {
        let output_type = schema.output_type.as_str().to_string();
        if schema.min > schema.max {
            return Err(ConfigError::Type {
                output_type,
                reason: format!("min ({}) exceeds max ({})", schema.min, schema.max),
            });
        }
        if let Some(target_repo) = &schema.options.target_repo {
            RepoSlug::parse(target_repo).map_err(|reason| ConfigError::Type {
                output_type: output_type.clone(),
                reason: format!("target_repo `{target_repo}`: {reason}"),
            })?;
        }
        for (field, field_schema) in &schema.fields {
            if field_schema.kind == FieldKind::Choice && field_schema.options.is_empty() {
                return Err(ConfigError::Field {
                    output_type,
                    field: field.clone(),
                    reason: "choice fields must declare options".to_string(),
                });
            }
            if let Some(default) = &field_schema.default {
                field_schema
                    .check_shape(default)
                    .map_err(|reason| ConfigError::Field {
                        output_type: output_type.clone(),
                        field: field.clone(),
                        reason: format!("default {reason}"),
                    })?;
            }
        }
    }
    Ok(())
}
