use super::fields::{
    apply_title_prefix, merge_unique, optional_string, positive_integer, required_string,
    set_string_list, string_list,
};
use super::{BuildContext, RecordError};
use crate::shared::ids::TemporaryId;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    pub temporary_id: Option<TemporaryId>,
    pub repo: Option<String>,
}

impl CreateIssue {
    pub fn from_fields(
        fields: &mut Map<String, Value>,
        cx: &BuildContext<'_>,
    ) -> Result<Self, RecordError> {
        let title = apply_title_prefix(
            required_string(fields, "title")?,
            cx.options.title_prefix.as_deref(),
        );
        fields.insert("title".to_string(), Value::String(title.clone()));

        let labels = merge_unique(&cx.options.labels, string_list(fields, "labels")?);
        set_string_list(fields, "labels", &labels);

        let assignees = string_list(fields, "assignees")?;
        let disallowed: Vec<&str> = assignees
            .iter()
            .map(String::as_str)
            .filter(|login| !cx.mentions.contains(login))
            .collect();
        if !disallowed.is_empty() {
            let allowed = cx.mentions.iter().collect::<Vec<_>>();
            return Err(RecordError::mention(format!(
                "assignees not on the mention allow-list: {}; allowed: {}",
                disallowed.join(", "),
                if allowed.is_empty() {
                    "none".to_string()
                } else {
                    allowed.join(", ")
                }
            )));
        }

        let temporary_id = optional_string(fields, "temporary_id")
            .map(|raw| TemporaryId::parse(&raw))
            .transpose()
            .map_err(|reason| RecordError::validation(format!("field `temporary_id` {reason}")))?;

        Ok(Self {
            title,
            body: required_string(fields, "body")?,
            labels,
            assignees,
            temporary_id,
            repo: optional_string(fields, "repo"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddComment {
    pub body: String,
    pub item_number: Option<u64>,
    pub repo: Option<String>,
}

impl AddComment {
    pub fn from_fields(
        fields: &mut Map<String, Value>,
        _cx: &BuildContext<'_>,
    ) -> Result<Self, RecordError> {
        Ok(Self {
            body: required_string(fields, "body")?,
            item_number: positive_integer(fields, "item_number")?,
            repo: optional_string(fields, "repo"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateIssue {
    pub title: Option<String>,
    pub body: Option<String>,
    pub status: Option<IssueState>,
    pub issue_number: Option<u64>,
    pub repo: Option<String>,
}

impl UpdateIssue {
    pub fn from_fields(
        fields: &mut Map<String, Value>,
        cx: &BuildContext<'_>,
    ) -> Result<Self, RecordError> {
        let status = match optional_string(fields, "status").as_deref() {
            None => None,
            Some("open") => Some(IssueState::Open),
            Some("closed") => Some(IssueState::Closed),
            Some(other) => {
                return Err(RecordError::validation(format!(
                    "field `status` must be one of: open, closed (got `{other}`)"
                )))
            }
        };
        let title = optional_string(fields, "title")
            .map(|title| apply_title_prefix(title, cx.options.title_prefix.as_deref()));
        let body = optional_string(fields, "body");
        if title.is_none() && body.is_none() && status.is_none() {
            return Err(RecordError::validation(
                "update_issue needs at least one of `title`, `body` or `status`",
            ));
        }
        Ok(Self {
            title,
            body,
            status,
            issue_number: positive_integer(fields, "issue_number")?,
            repo: optional_string(fields, "repo"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLabels {
    pub labels: Vec<String>,
    pub item_number: Option<u64>,
    pub repo: Option<String>,
}

impl AddLabels {
    /// Labels are de-duplicated and, when `allowed` is configured, filtered to it.
    pub fn from_fields(
        fields: &mut Map<String, Value>,
        cx: &BuildContext<'_>,
    ) -> Result<Self, RecordError> {
        let requested = string_list(fields, "labels")?;
        let allowed = &cx.options.allowed;
        let labels: Vec<String> = if allowed.is_empty() {
            requested
        } else {
            requested
                .into_iter()
                .filter(|label| allowed.iter().any(|candidate| candidate == label))
                .collect()
        };
        if labels.is_empty() {
            return Err(RecordError::validation(if allowed.is_empty() {
                "field `labels` must contain at least one non-empty label".to_string()
            } else {
                format!(
                    "no requested label is allowed; allowed labels: {}",
                    allowed.join(", ")
                )
            }));
        }
        set_string_list(fields, "labels", &labels);
        Ok(Self {
            labels,
            item_number: positive_integer(fields, "item_number")?,
            repo: optional_string(fields, "repo"),
        })
    }
}
