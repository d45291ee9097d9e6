use crate::config::{BatchSchemas, TypeSchema};
use crate::outputs::OutputType;
use crate::shared::errors::ErrorCode;
use std::collections::BTreeMap;

/// Per-type and global running counts of accepted records for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotaTracker {
    counts: BTreeMap<OutputType, u32>,
    total: u32,
    global_max: Option<u32>,
}

impl QuotaTracker {
    pub fn new(global_max: Option<u32>) -> Self {
        Self {
            global_max,
            ..Self::default()
        }
    }

    pub fn count(&self, output_type: OutputType) -> u32 {
        self.counts.get(&output_type).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Does not increment; call `record` once the record is accepted.
    pub fn check(&self, schema: &TypeSchema) -> Result<(), String> {
        let count = self.count(schema.output_type);
        if count >= schema.max {
            return Err(format!(
                "too many `{}` items: at most {} allowed per run",
                schema.output_type, schema.max
            ));
        }
        if let Some(global_max) = self.global_max {
            if self.total >= global_max {
                return Err(format!(
                    "too many safe output items: at most {global_max} allowed per run across all types"
                ));
            }
        }
        Ok(())
    }

    pub fn record(&mut self, output_type: OutputType) {
        *self.counts.entry(output_type).or_insert(0) += 1;
        self.total += 1;
    }

    /// One aggregate message per declared type whose final count is below its `min`.
    pub fn min_violations(&self, schemas: &BatchSchemas) -> Vec<String> {
        schemas
            .iter()
            .filter(|schema| schema.min > 0)
            .filter_map(|schema| {
                let count = self.count(schema.output_type);
                (count < schema.min).then(|| {
                    format!(
                        "{}: expected at least {} `{}` item(s), found {count}",
                        ErrorCode::MinNotMet,
                        schema.min,
                        schema.output_type
                    )
                })
            })
            .collect()
    }

    pub fn counts_by_name(&self) -> BTreeMap<String, u32> {
        self.counts
            .iter()
            .map(|(output_type, count)| (output_type.as_str().to_string(), *count))
            .collect()
    }
}
