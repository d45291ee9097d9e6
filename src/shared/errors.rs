use serde::Serialize;

/// Stable short codes surfaced to callers and to the agent so both can pattern-match
/// on a failure and self-correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ErrorCode {
    #[serde(rename = "E_PARSE")]
    Parse,
    #[serde(rename = "E_MISSING_TYPE")]
    MissingType,
    #[serde(rename = "E_UNKNOWN_TYPE")]
    UnknownType,
    #[serde(rename = "E_MAX_EXCEEDED")]
    MaxExceeded,
    #[serde(rename = "E_MIN_NOT_MET")]
    MinNotMet,
    #[serde(rename = "E_VALIDATION")]
    Validation,
    #[serde(rename = "E_MENTION_NOT_ALLOWED")]
    MentionNotAllowed,
    #[serde(rename = "E_REPO_NOT_ALLOWED")]
    RepoNotAllowed,
    #[serde(rename = "E_INVALID_REPO")]
    InvalidRepo,
    #[serde(rename = "E_TARGET_UNRESOLVED")]
    TargetUnresolved,
    #[serde(rename = "E_TEMPORARY_ID_UNRESOLVED")]
    TemporaryIdUnresolved,
    #[serde(rename = "E_REVIEW_CONTEXT")]
    ReviewContext,
    #[serde(rename = "E_PATCH_MISSING")]
    PatchMissing,
    #[serde(rename = "E_API")]
    Api,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Parse => "E_PARSE",
            ErrorCode::MissingType => "E_MISSING_TYPE",
            ErrorCode::UnknownType => "E_UNKNOWN_TYPE",
            ErrorCode::MaxExceeded => "E_MAX_EXCEEDED",
            ErrorCode::MinNotMet => "E_MIN_NOT_MET",
            ErrorCode::Validation => "E_VALIDATION",
            ErrorCode::MentionNotAllowed => "E_MENTION_NOT_ALLOWED",
            ErrorCode::RepoNotAllowed => "E_REPO_NOT_ALLOWED",
            ErrorCode::InvalidRepo => "E_INVALID_REPO",
            ErrorCode::TargetUnresolved => "E_TARGET_UNRESOLVED",
            ErrorCode::TemporaryIdUnresolved => "E_TEMPORARY_ID_UNRESOLVED",
            ErrorCode::ReviewContext => "E_REVIEW_CONTEXT",
            ErrorCode::PatchMissing => "E_PATCH_MISSING",
            ErrorCode::Api => "E_API",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rejected input line. Renders as `line {n}: {CODE}: {message}`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {code}: {message}")]
pub struct LineError {
    pub line: usize,
    pub code: ErrorCode,
    pub message: String,
}

impl LineError {
    pub fn new(line: usize, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            line,
            code,
            message: message.into(),
        }
    }
}
