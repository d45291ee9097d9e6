use crate::config::{FieldKind, FieldSchema};
use serde::Serialize;
use std::collections::BTreeMap;

/// The closed vocabulary of record types an agent may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    CreateIssue,
    AddComment,
    UpdateIssue,
    AddLabels,
    CreatePullRequest,
    CreatePullRequestReviewComment,
    SubmitPullRequestReview,
    CreateDiscussion,
    UpdateRelease,
    CreateProject,
    CreateProjectStatusUpdate,
    Noop,
    MissingTool,
}

/// What kind of existing item a record type points at, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Issue,
    PullRequest,
    IssueOrPullRequest,
}

impl TargetKind {
    /// Field a record uses to name its target explicitly.
    pub fn number_field(self) -> &'static str {
        match self {
            TargetKind::Issue => "issue_number",
            TargetKind::PullRequest => "pull_request_number",
            TargetKind::IssueOrPullRequest => "item_number",
        }
    }
}

impl OutputType {
    pub const ALL: [OutputType; 13] = [
        OutputType::CreateIssue,
        OutputType::AddComment,
        OutputType::UpdateIssue,
        OutputType::AddLabels,
        OutputType::CreatePullRequest,
        OutputType::CreatePullRequestReviewComment,
        OutputType::SubmitPullRequestReview,
        OutputType::CreateDiscussion,
        OutputType::UpdateRelease,
        OutputType::CreateProject,
        OutputType::CreateProjectStatusUpdate,
        OutputType::Noop,
        OutputType::MissingTool,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OutputType::CreateIssue => "create_issue",
            OutputType::AddComment => "add_comment",
            OutputType::UpdateIssue => "update_issue",
            OutputType::AddLabels => "add_labels",
            OutputType::CreatePullRequest => "create_pull_request",
            OutputType::CreatePullRequestReviewComment => "create_pull_request_review_comment",
            OutputType::SubmitPullRequestReview => "submit_pull_request_review",
            OutputType::CreateDiscussion => "create_discussion",
            OutputType::UpdateRelease => "update_release",
            OutputType::CreateProject => "create_project",
            OutputType::CreateProjectStatusUpdate => "create_project_status_update",
            OutputType::Noop => "noop",
            OutputType::MissingTool => "missing_tool",
        }
    }

    /// Parses an already-normalized type name.
    pub fn parse(normalized: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == normalized)
    }

    pub fn target_kind(self) -> Option<TargetKind> {
        match self {
            OutputType::AddComment | OutputType::AddLabels => {
                Some(TargetKind::IssueOrPullRequest)
            }
            OutputType::UpdateIssue => Some(TargetKind::Issue),
            OutputType::CreatePullRequestReviewComment | OutputType::SubmitPullRequestReview => {
                Some(TargetKind::PullRequest)
            }
            OutputType::CreateIssue
            | OutputType::CreatePullRequest
            | OutputType::CreateDiscussion
            | OutputType::UpdateRelease
            | OutputType::CreateProject
            | OutputType::CreateProjectStatusUpdate
            | OutputType::Noop
            | OutputType::MissingTool => None,
        }
    }

    /// Whether records of this type are sent somewhere in a repository and so honor `repo`.
    pub fn accepts_repo_override(self) -> bool {
        !matches!(
            self,
            OutputType::Noop | OutputType::MissingTool | OutputType::CreateProjectStatusUpdate
        )
    }

    /// Built-in field schema; configured `inputs` are layered on top of it.
    pub fn builtin_fields(self) -> BTreeMap<String, FieldSchema> {
        let fields: Vec<(&str, FieldSchema)> = match self {
            OutputType::CreateIssue => vec![
                ("title", FieldSchema::required(FieldKind::String).max_length(256)),
                ("body", FieldSchema::required(FieldKind::String)),
                ("labels", FieldSchema::optional(FieldKind::Array)),
                ("assignees", FieldSchema::optional(FieldKind::Array)),
                ("temporary_id", FieldSchema::optional(FieldKind::String)),
            ],
            OutputType::AddComment => vec![
                ("body", FieldSchema::required(FieldKind::String)),
                ("item_number", FieldSchema::optional(FieldKind::Number)),
            ],
            OutputType::UpdateIssue => vec![
                ("title", FieldSchema::optional(FieldKind::String).max_length(256)),
                ("body", FieldSchema::optional(FieldKind::String)),
                (
                    "status",
                    FieldSchema::optional(FieldKind::Choice).options(&["open", "closed"]),
                ),
                ("issue_number", FieldSchema::optional(FieldKind::Number)),
            ],
            OutputType::AddLabels => vec![
                ("labels", FieldSchema::required(FieldKind::Array)),
                ("item_number", FieldSchema::optional(FieldKind::Number)),
            ],
            OutputType::CreatePullRequest => vec![
                ("title", FieldSchema::required(FieldKind::String).max_length(256)),
                ("body", FieldSchema::required(FieldKind::String)),
                ("branch", FieldSchema::optional(FieldKind::String)),
                ("labels", FieldSchema::optional(FieldKind::Array)),
            ],
            OutputType::CreatePullRequestReviewComment => vec![
                ("path", FieldSchema::required(FieldKind::String)),
                ("line", FieldSchema::required(FieldKind::Number)),
                ("body", FieldSchema::required(FieldKind::String)),
                ("start_line", FieldSchema::optional(FieldKind::Number)),
                (
                    "side",
                    FieldSchema::optional(FieldKind::Choice)
                        .options(&["LEFT", "RIGHT"])
                        .default_value("RIGHT"),
                ),
                (
                    "start_side",
                    FieldSchema::optional(FieldKind::Choice).options(&["LEFT", "RIGHT"]),
                ),
                ("pull_request_number", FieldSchema::optional(FieldKind::Number)),
            ],
            OutputType::SubmitPullRequestReview => vec![
                ("body", FieldSchema::optional(FieldKind::String)),
                (
                    "event",
                    FieldSchema::optional(FieldKind::Choice)
                        .options(&["APPROVE", "REQUEST_CHANGES", "COMMENT"])
                        .default_value("COMMENT"),
                ),
                ("pull_request_number", FieldSchema::optional(FieldKind::Number)),
            ],
            OutputType::CreateDiscussion => vec![
                ("title", FieldSchema::required(FieldKind::String).max_length(256)),
                ("body", FieldSchema::required(FieldKind::String)),
                ("category", FieldSchema::optional(FieldKind::String)),
            ],
            OutputType::UpdateRelease => vec![
                ("tag", FieldSchema::optional(FieldKind::String)),
                (
                    "operation",
                    FieldSchema::required(FieldKind::Choice)
                        .options(&["replace", "append", "prepend"]),
                ),
                ("body", FieldSchema::required(FieldKind::String)),
            ],
            OutputType::CreateProject => vec![
                ("title", FieldSchema::required(FieldKind::String).max_length(256)),
                ("owner", FieldSchema::optional(FieldKind::String)),
                ("temporary_id", FieldSchema::optional(FieldKind::String)),
            ],
            OutputType::CreateProjectStatusUpdate => vec![
                ("project", FieldSchema::required(FieldKind::String)),
                ("body", FieldSchema::required(FieldKind::String)),
                (
                    "status",
                    FieldSchema::optional(FieldKind::Choice)
                        .options(&["ON_TRACK", "AT_RISK", "OFF_TRACK", "COMPLETE", "INACTIVE"])
                        .default_value("ON_TRACK"),
                ),
                ("start_date", FieldSchema::optional(FieldKind::String)),
                ("target_date", FieldSchema::optional(FieldKind::String)),
            ],
            OutputType::Noop => vec![("message", FieldSchema::required(FieldKind::String))],
            OutputType::MissingTool => vec![
                ("tool", FieldSchema::required(FieldKind::String).max_length(128)),
                ("reason", FieldSchema::required(FieldKind::String)),
                ("alternatives", FieldSchema::optional(FieldKind::String)),
            ],
        };

        let mut map: BTreeMap<String, FieldSchema> = fields
            .into_iter()
            .map(|(name, schema)| (name.to_string(), schema))
            .collect();
        if self.accepts_repo_override() {
            map.insert("repo".to_string(), FieldSchema::optional(FieldKind::String));
        }
        map
    }
}

impl std::fmt::Display for OutputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical form of a record or config type name: trimmed, lowercase, `-` -> `_`.
pub fn normalize_type_name(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace('-', "_")
}
