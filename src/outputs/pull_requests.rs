use super::fields::{
    apply_title_prefix, merge_unique, optional_string, positive_integer, required_string,
    set_string_list, string_list,
};
use super::{BuildContext, RecordError};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePullRequest {
    pub title: String,
    pub body: String,
    pub branch: Option<String>,
    pub labels: Vec<String>,
    pub repo: Option<String>,
}

impl CreatePullRequest {
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

        let branch = optional_string(fields, "branch");
        if let Some(branch) = &branch {
            if branch.contains("..") || branch.starts_with('-') || branch.contains(char::is_whitespace) {
                return Err(RecordError::validation(format!(
                    "field `branch` `{branch}` is not a valid branch name"
                )));
            }
        }
        Ok(Self {
            title,
            body: required_string(fields, "body")?,
            branch,
            labels,
            repo: optional_string(fields, "repo"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    fn parse(field: &str, raw: &str) -> Result<Self, RecordError> {
        match raw {
            "LEFT" => Ok(Side::Left),
            "RIGHT" => Ok(Side::Right),
            other => Err(RecordError::validation(format!(
                "field `{field}` must be one of: LEFT, RIGHT (got `{other}`)"
            ))),
        }
    }
}

/// One line-level comment destined for the pull request review buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewCommentRequest {
    pub path: String,
    pub line: u64,
    pub body: String,
    pub start_line: Option<u64>,
    pub side: Side,
    pub start_side: Option<Side>,
    pub pull_request_number: Option<u64>,
    pub repo: Option<String>,
}

impl ReviewCommentRequest {
    pub fn from_fields(
        fields: &mut Map<String, Value>,
        _cx: &BuildContext<'_>,
    ) -> Result<Self, RecordError> {
        let path = required_string(fields, "path")?;
        if path.starts_with('/') || path.split('/').any(|segment| segment == "..") {
            return Err(RecordError::validation(format!(
                "field `path` `{path}` must be relative to the repository root"
            )));
        }
        let line = positive_integer(fields, "line")?
            .ok_or_else(|| RecordError::validation("field `line` is required"))?;
        let start_line = positive_integer(fields, "start_line")?;
        if let Some(start_line) = start_line {
            if start_line > line {
                return Err(RecordError::validation(format!(
                    "field `start_line` ({start_line}) must not be greater than `line` ({line})"
                )));
            }
        }
        let side = match optional_string(fields, "side") {
            Some(raw) => Side::parse("side", &raw)?,
            None => Side::Right,
        };
        let start_side = optional_string(fields, "start_side")
            .map(|raw| Side::parse("start_side", &raw))
            .transpose()?;

        Ok(Self {
            path,
            line,
            body: required_string(fields, "body")?,
            start_line,
            side,
            start_side,
            pull_request_number: positive_integer(fields, "pull_request_number")?,
            repo: optional_string(fields, "repo"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewEvent {
    Approve,
    RequestChanges,
    #[default]
    Comment,
}

impl ReviewEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewEvent::Approve => "APPROVE",
            ReviewEvent::RequestChanges => "REQUEST_CHANGES",
            ReviewEvent::Comment => "COMMENT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReview {
    pub body: Option<String>,
    pub event: ReviewEvent,
    pub pull_request_number: Option<u64>,
    pub repo: Option<String>,
}

impl SubmitReview {
    pub fn from_fields(
        fields: &mut Map<String, Value>,
        _cx: &BuildContext<'_>,
    ) -> Result<Self, RecordError> {
        let event = match optional_string(fields, "event").as_deref() {
            None | Some("COMMENT") => ReviewEvent::Comment,
            Some("APPROVE") => ReviewEvent::Approve,
            Some("REQUEST_CHANGES") => ReviewEvent::RequestChanges,
            Some(other) => {
                return Err(RecordError::validation(format!(
                    "field `event` must be one of: APPROVE, REQUEST_CHANGES, COMMENT (got `{other}`)"
                )))
            }
        };
        let body = optional_string(fields, "body");
        if event == ReviewEvent::RequestChanges && body.is_none() {
            return Err(RecordError::validation(
                "a REQUEST_CHANGES review needs a `body` explaining the requested changes",
            ));
        }
        Ok(Self {
            body,
            event,
            pull_request_number: positive_integer(fields, "pull_request_number")?,
            repo: optional_string(fields, "repo"),
        })
    }
}
