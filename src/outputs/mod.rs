pub mod discussions;
pub mod fields;
pub mod issues;
pub mod kind;
pub mod projects;
pub mod pull_requests;
pub mod releases;
pub mod reporting;

pub use discussions::CreateDiscussion;
pub use issues::{AddComment, AddLabels, CreateIssue, IssueState, UpdateIssue};
pub use kind::{normalize_type_name, OutputType, TargetKind};
pub use projects::{CreateProject, ProjectStatus, ProjectStatusUpdate};
pub use pull_requests::{CreatePullRequest, ReviewCommentRequest, ReviewEvent, Side, SubmitReview};
pub use releases::{ReleaseOperation, UpdateRelease};
pub use reporting::{MissingTool, Noop};

use crate::config::TypeConfig;
use crate::ingest::mentions::MentionSet;
use crate::shared::errors::ErrorCode;
use crate::shared::ids::TemporaryId;
use serde_json::{Map, Value};

/// A record that passed field validation but not the type's own rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RecordError {
    pub code: ErrorCode,
    pub message: String,
}

impl RecordError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Validation,
            message: message.into(),
        }
    }

    pub fn mention(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::MentionNotAllowed,
            message: message.into(),
        }
    }
}

/// What a typed record builder may consult besides the record itself.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub options: &'a TypeConfig,
    pub mentions: &'a MentionSet,
}

/// A validated record in its typed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafeOutput {
    CreateIssue(CreateIssue),
    AddComment(AddComment),
    UpdateIssue(UpdateIssue),
    AddLabels(AddLabels),
    CreatePullRequest(CreatePullRequest),
    ReviewComment(ReviewCommentRequest),
    SubmitReview(SubmitReview),
    CreateDiscussion(CreateDiscussion),
    UpdateRelease(UpdateRelease),
    CreateProject(CreateProject),
    ProjectStatusUpdate(ProjectStatusUpdate),
    Noop(Noop),
    MissingTool(MissingTool),
}

impl SafeOutput {
    /// Builds the typed record; may normalize `fields` in place (prefixed titles, merged labels).
    pub fn from_fields(
        output_type: OutputType,
        fields: &mut Map<String, Value>,
        cx: &BuildContext<'_>,
    ) -> Result<Self, RecordError> {
        Ok(match output_type {
            OutputType::CreateIssue => SafeOutput::CreateIssue(CreateIssue::from_fields(fields, cx)?),
            OutputType::AddComment => SafeOutput::AddComment(AddComment::from_fields(fields, cx)?),
            OutputType::UpdateIssue => SafeOutput::UpdateIssue(UpdateIssue::from_fields(fields, cx)?),
            OutputType::AddLabels => SafeOutput::AddLabels(AddLabels::from_fields(fields, cx)?),
            OutputType::CreatePullRequest => {
                SafeOutput::CreatePullRequest(CreatePullRequest::from_fields(fields, cx)?)
            }
            OutputType::CreatePullRequestReviewComment => {
                SafeOutput::ReviewComment(ReviewCommentRequest::from_fields(fields, cx)?)
            }
            OutputType::SubmitPullRequestReview => {
                SafeOutput::SubmitReview(SubmitReview::from_fields(fields, cx)?)
            }
            OutputType::CreateDiscussion => {
                SafeOutput::CreateDiscussion(CreateDiscussion::from_fields(fields, cx)?)
            }
            OutputType::UpdateRelease => {
                SafeOutput::UpdateRelease(UpdateRelease::from_fields(fields, cx)?)
            }
            OutputType::CreateProject => {
                SafeOutput::CreateProject(CreateProject::from_fields(fields, cx)?)
            }
            OutputType::CreateProjectStatusUpdate => {
                SafeOutput::ProjectStatusUpdate(ProjectStatusUpdate::from_fields(fields, cx)?)
            }
            OutputType::Noop => SafeOutput::Noop(Noop::from_fields(fields, cx)?),
            OutputType::MissingTool => SafeOutput::MissingTool(MissingTool::from_fields(fields, cx)?),
        })
    }

    pub fn output_type(&self) -> OutputType {
        match self {
            SafeOutput::CreateIssue(_) => OutputType::CreateIssue,
            SafeOutput::AddComment(_) => OutputType::AddComment,
            SafeOutput::UpdateIssue(_) => OutputType::UpdateIssue,
            SafeOutput::AddLabels(_) => OutputType::AddLabels,
            SafeOutput::CreatePullRequest(_) => OutputType::CreatePullRequest,
            SafeOutput::ReviewComment(_) => OutputType::CreatePullRequestReviewComment,
            SafeOutput::SubmitReview(_) => OutputType::SubmitPullRequestReview,
            SafeOutput::CreateDiscussion(_) => OutputType::CreateDiscussion,
            SafeOutput::UpdateRelease(_) => OutputType::UpdateRelease,
            SafeOutput::CreateProject(_) => OutputType::CreateProject,
            SafeOutput::ProjectStatusUpdate(_) => OutputType::CreateProjectStatusUpdate,
            SafeOutput::Noop(_) => OutputType::Noop,
            SafeOutput::MissingTool(_) => OutputType::MissingTool,
        }
    }

    /// The record's own `repo` field, before allow-list resolution.
    pub fn repo(&self) -> Option<&str> {
        match self {
            SafeOutput::CreateIssue(record) => record.repo.as_deref(),
            SafeOutput::AddComment(record) => record.repo.as_deref(),
            SafeOutput::UpdateIssue(record) => record.repo.as_deref(),
            SafeOutput::AddLabels(record) => record.repo.as_deref(),
            SafeOutput::CreatePullRequest(record) => record.repo.as_deref(),
            SafeOutput::ReviewComment(record) => record.repo.as_deref(),
            SafeOutput::SubmitReview(record) => record.repo.as_deref(),
            SafeOutput::CreateDiscussion(record) => record.repo.as_deref(),
            SafeOutput::UpdateRelease(record) => record.repo.as_deref(),
            SafeOutput::CreateProject(record) => record.repo.as_deref(),
            SafeOutput::ProjectStatusUpdate(_) | SafeOutput::Noop(_) | SafeOutput::MissingTool(_) => {
                None
            }
        }
    }

    /// Temporary id this record declares for the entity it creates.
    pub fn temporary_id(&self) -> Option<&TemporaryId> {
        match self {
            SafeOutput::CreateIssue(record) => record.temporary_id.as_ref(),
            SafeOutput::CreateProject(record) => record.temporary_id.as_ref(),
            _ => None,
        }
    }
}
