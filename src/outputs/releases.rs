use super::fields::{optional_string, required_string};
use super::{BuildContext, RecordError};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOperation {
    Replace,
    Append,
    Prepend,
}

impl ReleaseOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            ReleaseOperation::Replace => "replace",
            ReleaseOperation::Append => "append",
            ReleaseOperation::Prepend => "prepend",
        }
    }

    /// `addition` already carries any footer.
    pub fn apply(self, existing: &str, addition: &str) -> String {
        let existing = existing.trim_end();
        match self {
            ReleaseOperation::Replace => addition.to_string(),
            ReleaseOperation::Append if existing.is_empty() => addition.to_string(),
            ReleaseOperation::Append => format!("{existing}\n\n{addition}"),
            ReleaseOperation::Prepend if existing.is_empty() => addition.to_string(),
            ReleaseOperation::Prepend => format!("{addition}\n\n---\n\n{existing}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRelease {
    /// Falls back to the triggering release's tag.
    pub tag: Option<String>,
    pub operation: ReleaseOperation,
    pub body: String,
    pub repo: Option<String>,
}

impl UpdateRelease {
    pub fn from_fields(
        fields: &mut Map<String, Value>,
        _cx: &BuildContext<'_>,
    ) -> Result<Self, RecordError> {
        let operation = match required_string(fields, "operation")?.as_str() {
            "replace" => ReleaseOperation::Replace,
            "append" => ReleaseOperation::Append,
            "prepend" => ReleaseOperation::Prepend,
            other => {
                return Err(RecordError::validation(format!(
                    "field `operation` must be one of: replace, append, prepend (got `{other}`)"
                )))
            }
        };
        Ok(Self {
            tag: optional_string(fields, "tag"),
            operation,
            body: required_string(fields, "body")?,
            repo: optional_string(fields, "repo"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_combine_existing_notes() {
        assert_eq!(ReleaseOperation::Replace.apply("old", "new"), "new");
        assert_eq!(ReleaseOperation::Append.apply("old\n", "new"), "old\n\nnew");
        assert_eq!(
            ReleaseOperation::Prepend.apply("old", "new"),
            "new\n\n---\n\nold"
        );
        assert_eq!(ReleaseOperation::Append.apply("", "new"), "new");
    }
}
