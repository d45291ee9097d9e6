use super::fields::{apply_title_prefix, optional_string, required_string};
use super::{BuildContext, RecordError};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDiscussion {
    pub title: String,
    pub body: String,
    /// Record value, else the configured category, else the repository's first category.
    pub category: Option<String>,
    pub repo: Option<String>,
}

impl CreateDiscussion {
    pub fn from_fields(
        fields: &mut Map<String, Value>,
        cx: &BuildContext<'_>,
    ) -> Result<Self, RecordError> {
        let title = apply_title_prefix(
            required_string(fields, "title")?,
            cx.options.title_prefix.as_deref(),
        );
        fields.insert("title".to_string(), Value::String(title.clone()));
        Ok(Self {
            title,
            body: required_string(fields, "body")?,
            category: optional_string(fields, "category").or_else(|| cx.options.category.clone()),
            repo: optional_string(fields, "repo"),
        })
    }
}
