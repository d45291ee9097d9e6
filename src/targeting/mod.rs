pub mod repo;
pub mod target;
pub mod temporary_id;

pub use repo::{is_repo_allowed, RepoResolver, RepoSlug};
pub use target::{parse_item_number, resolve_target, ResolvedTarget, TargetResolution};
pub use temporary_id::{ResolvedEntity, TemporaryIdMap};

use crate::shared::errors::ErrorCode;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetingError {
    #[error("invalid repository `{repo}`: {reason}")]
    InvalidRepo { repo: String, reason: String },
    #[error("repository `{repo}` is not allowed; default repository is `{default_repo}`; allowed repositories: {allowed}")]
    RepoNotAllowed {
        repo: String,
        default_repo: String,
        allowed: String,
    },
    #[error("{0}")]
    TargetUnresolved(String),
    #[error("temporary id reference `{reference}` is not resolved; known temporary ids: {known}")]
    TemporaryIdUnresolved { reference: String, known: String },
    #[error("temporary id `{0}` is already assigned in this batch")]
    TemporaryIdConflict(String),
}

impl TargetingError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TargetingError::InvalidRepo { .. } => ErrorCode::InvalidRepo,
            TargetingError::RepoNotAllowed { .. } => ErrorCode::RepoNotAllowed,
            TargetingError::TargetUnresolved(_) => ErrorCode::TargetUnresolved,
            TargetingError::TemporaryIdUnresolved { .. }
            | TargetingError::TemporaryIdConflict(_) => ErrorCode::TemporaryIdUnresolved,
        }
    }
}
