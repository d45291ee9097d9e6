pub mod mentions;
pub mod quota;
pub mod repair;
pub mod sanitize;
pub mod taint;
pub mod validate;

pub use mentions::{MentionResolver, MentionSet};
pub use quota::QuotaTracker;
pub use repair::{parse_line, repair_json, ParseError, ParsedLine};
pub use sanitize::{ContentSanitizer, Sanitizer};
pub use taint::strip_tainted_keys;
pub use validate::validate_fields;

use crate::config::BatchSchemas;
use crate::outputs::{normalize_type_name, BuildContext, OutputType, SafeOutput};
use crate::shared::errors::{ErrorCode, LineError};
use crate::shared::logging::BatchLog;
use crate::targeting::RepoResolver;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// One accepted record: normalized fields plus their typed form.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedItem {
    pub line: usize,
    pub output_type: OutputType,
    pub fields: Map<String, Value>,
    pub output: SafeOutput,
}

impl ValidatedItem {
    pub fn to_json(&self) -> Value {
        let mut object = self.fields.clone();
        object.insert(
            "type".to_string(),
            Value::String(self.output_type.as_str().to_string()),
        );
        Value::Object(object)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestOutcome {
    pub items: Vec<ValidatedItem>,
    pub errors: Vec<String>,
    pub counts: BTreeMap<String, u32>,
}

impl IngestOutcome {
    /// `{"items": [...], "errors": [...]}`.
    pub fn to_json(&self) -> Value {
        json!({
            "items": self.items.iter().map(ValidatedItem::to_json).collect::<Vec<_>>(),
            "errors": self.errors,
        })
    }
}

/// Sequential validation of one batch of agent output lines.
pub struct Ingestor<'a> {
    schemas: &'a BatchSchemas,
    repos: &'a RepoResolver,
    mentions: MentionResolver<'a>,
    sanitizer: &'a dyn Sanitizer,
    global_max: Option<u32>,
    log: &'a BatchLog,
}

impl<'a> Ingestor<'a> {
    pub fn new(
        schemas: &'a BatchSchemas,
        repos: &'a RepoResolver,
        mentions: MentionResolver<'a>,
        log: &'a BatchLog,
    ) -> Self {
        Self {
            schemas,
            repos,
            mentions,
            sanitizer: &ContentSanitizer::DEFAULT,
            global_max: None,
            log,
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: &'a dyn Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn with_global_max(mut self, global_max: Option<u32>) -> Self {
        self.global_max = global_max;
        self
    }

    /// Never fails as a whole: rejected lines become errors tagged with their 1-based
    /// line number and the remaining lines are still processed.
    pub fn ingest(mut self, input: &str) -> IngestOutcome {
        let mut quota = QuotaTracker::new(self.global_max);
        let mut outcome = IngestOutcome::default();

        for (index, raw) in input.lines().enumerate() {
            if raw.trim().is_empty() {
                continue;
            }
            let line = index + 1;
            match self.ingest_line(line, raw, &quota) {
                Ok(item) => {
                    quota.record(item.output_type);
                    outcome.items.push(item);
                }
                Err(err) => {
                    self.log.warn("ingest.reject", &err.to_string());
                    outcome.errors.push(err.to_string());
                }
            }
        }

        for violation in quota.min_violations(self.schemas) {
            self.log.warn("ingest.min_not_met", &violation);
            outcome.errors.push(violation);
        }
        outcome.counts = quota.counts_by_name();
        self.log.info(
            "ingest.done",
            &format!(
                "accepted {} item(s), {} error(s)",
                outcome.items.len(),
                outcome.errors.len()
            ),
        );
        outcome
    }

    fn ingest_line(
        &mut self,
        line: usize,
        raw: &str,
        quota: &QuotaTracker,
    ) -> Result<ValidatedItem, LineError> {
        let parsed = parse_line(line, raw)?;
        if parsed.repaired {
            self.log
                .info("ingest.repaired", &format!("line {line}: parsed after repair"));
        }
        let (record, removed) = strip_tainted_keys(parsed.record);
        if removed > 0 {
            self.log.warn(
                "ingest.taint",
                &format!("line {line}: removed {removed} prototype-pollution key(s)"),
            );
        }

        let raw_type = match record.get("type") {
            None | Some(Value::Null) => {
                return Err(LineError::new(
                    line,
                    ErrorCode::MissingType,
                    "record has no `type` field",
                ))
            }
            Some(Value::String(raw_type)) if !raw_type.trim().is_empty() => raw_type.clone(),
            Some(_) => {
                return Err(LineError::new(
                    line,
                    ErrorCode::MissingType,
                    "field `type` must be a non-empty string",
                ))
            }
        };
        let schemas = self.schemas;
        let normalized = normalize_type_name(&raw_type);
        let schema = OutputType::parse(&normalized)
            .and_then(|output_type| schemas.get(output_type))
            .ok_or_else(|| {
                let known = schemas.known_type_names();
                LineError::new(
                    line,
                    ErrorCode::UnknownType,
                    format!(
                        "unknown type `{raw_type}`; known types: {}",
                        if known.is_empty() {
                            "none".to_string()
                        } else {
                            known.join(", ")
                        }
                    ),
                )
            })?;

        quota
            .check(schema)
            .map_err(|reason| LineError::new(line, ErrorCode::MaxExceeded, reason))?;

        let type_repos = self
            .repos
            .for_type(&schema.options)
            .unwrap_or_else(|_| self.repos.clone());
        self.mentions
            .observe(schema.output_type, &record, &type_repos, self.log);

        let mut fields = validate_fields(
            schema,
            &record,
            self.sanitizer,
            self.mentions.allowed(),
        )
        .map_err(|reason| LineError::new(line, ErrorCode::Validation, reason))?;

        let cx = BuildContext {
            options: &schema.options,
            mentions: self.mentions.allowed(),
        };
        let output = SafeOutput::from_fields(schema.output_type, &mut fields, &cx)
            .map_err(|err| LineError::new(line, err.code, err.message))?;

        Ok(ValidatedItem {
            line,
            output_type: schema.output_type,
            fields,
            output,
        })
    }
}
