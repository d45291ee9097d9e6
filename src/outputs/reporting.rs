use super::fields::{optional_string, required_string};
use super::{BuildContext, RecordError};
use serde::Serialize;
use serde_json::{Map, Value};

/// The agent decided nothing needed doing; recorded for the run summary only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Noop {
    pub message: String,
}

impl Noop {
    pub fn from_fields(
        fields: &mut Map<String, Value>,
        _cx: &BuildContext<'_>,
    ) -> Result<Self, RecordError> {
        Ok(Self {
            message: required_string(fields, "message")?,
        })
    }
}

/// The agent needed a tool it did not have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingTool {
    pub tool: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<String>,
}

impl MissingTool {
    pub fn from_fields(
        fields: &mut Map<String, Value>,
        _cx: &BuildContext<'_>,
    ) -> Result<Self, RecordError> {
        Ok(Self {
            tool: required_string(fields, "tool")?,
            reason: required_string(fields, "reason")?,
            alternatives: optional_string(fields, "alternatives"),
        })
    }
}
