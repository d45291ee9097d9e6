use crate::github::{CreatedItem, GithubApi, GithubError, NewReview, ReviewCommentPayload};
use crate::outputs::ReviewEvent;
use crate::shared::errors::ErrorCode;
use crate::targeting::RepoSlug;

/// The pull request a review is bound to. Set at most once per buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewContext {
    pub repo: RepoSlug,
    pub pull_request_number: u64,
    pub head_sha: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewMetadata {
    pub body: Option<String>,
    pub event: ReviewEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    Empty,
    Accumulating,
    ContextBound,
    Submitted,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReviewError {
    #[error("review comments must target the same pull request: already bound to {bound}, got {requested}")]
    ContextMismatch { bound: String, requested: String },
    #[error("cannot submit review: no pull request was ever resolved for it")]
    NoContext,
    #[error("cannot submit review on {0}: head commit sha is unknown")]
    MissingHeadSha(String),
    #[error("review for {0} was already submitted; start a new buffer for another review")]
    AlreadySubmitted(String),
    #[error(transparent)]
    Api(#[from] GithubError),
}

impl ReviewError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ReviewError::Api(_) => ErrorCode::Api,
            _ => ErrorCode::ReviewContext,
        }
    }
}

/// Accumulates line comments and review metadata for a single pull request and sends
/// them as one review. Owned by one batch; never shared between batches.
#[derive(Debug, Clone)]
pub struct ReviewBuffer {
    comments: Vec<ReviewCommentPayload>,
    metadata: Option<ReviewMetadata>,
    context: Option<ReviewContext>,
    footer: Option<String>,
    submitted: bool,
}

impl Default for ReviewBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn describe(repo: &RepoSlug, number: u64) -> String {
    format!("{repo}#{number}")
}

impl ReviewBuffer {
    pub fn new() -> Self {
        Self {
            comments: Vec::new(),
            metadata: None,
            context: None,
            footer: None,
            submitted: false,
        }
    }

    /// Footer appended to the review body on submit; `None` disables it.
    pub fn with_footer(mut self, footer: Option<String>) -> Self {
        self.footer = footer;
        self
    }

    pub fn state(&self) -> ReviewState {
        if self.submitted {
            ReviewState::Submitted
        } else if self.context.is_some() {
            ReviewState::ContextBound
        } else if self.comments.is_empty() && self.metadata.is_none() {
            ReviewState::Empty
        } else {
            ReviewState::Accumulating
        }
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    pub fn context(&self) -> Option<&ReviewContext> {
        self.context.as_ref()
    }

    pub fn has_content(&self) -> bool {
        !self.comments.is_empty() || self.metadata.is_some()
    }

    fn ensure_open(&self) -> Result<(), ReviewError> {
        if !self.submitted {
            return Ok(());
        }
        Err(ReviewError::AlreadySubmitted(
            self.context
                .as_ref()
                .map(|context| describe(&context.repo, context.pull_request_number))
                .unwrap_or_else(|| "this pull request".to_string()),
        ))
    }

    /// Binds the buffer to a pull request. Re-binding to the same pull request is
    /// accepted and may fill in a head sha that was unknown before.
    pub fn set_context(&mut self, context: ReviewContext) -> Result<(), ReviewError> {
        self.ensure_open()?;
        self.ensure_same_target(&context.repo, context.pull_request_number)?;
        match &mut self.context {
            None => self.context = Some(context),
            Some(bound) => {
                if bound.head_sha.is_none() {
                    bound.head_sha = context.head_sha;
                }
            }
        }
        Ok(())
    }

    /// Fails when the buffer is already bound to a different pull request.
    pub fn ensure_same_target(&self, repo: &RepoSlug, number: u64) -> Result<(), ReviewError> {
        match &self.context {
            Some(bound) if bound.repo != *repo || bound.pull_request_number != number => {
                Err(ReviewError::ContextMismatch {
                    bound: describe(&bound.repo, bound.pull_request_number),
                    requested: describe(repo, number),
                })
            }
            _ => Ok(()),
        }
    }

    pub fn add_comment(&mut self, comment: ReviewCommentPayload) -> Result<(), ReviewError> {
        self.ensure_open()?;
        self.comments.push(comment);
        Ok(())
    }

    /// Later metadata replaces earlier metadata.
    pub fn set_metadata(&mut self, metadata: ReviewMetadata) -> Result<(), ReviewError> {
        self.ensure_open()?;
        self.metadata = Some(metadata);
        Ok(())
    }

    /// The review that `submit` would send, without the head sha check.
    pub fn build_review(&self) -> NewReview {
        let metadata = self.metadata.clone().unwrap_or_default();
        let mut body = metadata.body.unwrap_or_default();
        if let Some(footer) = &self.footer {
            if body.trim().is_empty() {
                body = footer.clone();
            } else {
                body = format!("{}\n\n{footer}", body.trim_end());
            }
        }
        NewReview {
            commit_id: self
                .context
                .as_ref()
                .and_then(|context| context.head_sha.clone())
                .unwrap_or_default(),
            body,
            event: metadata.event,
            comments: self.comments.iter().cloned().map(normalize_comment).collect(),
        }
    }

    /// Sends everything buffered as exactly one review. Nothing buffered is a successful
    /// no-op and makes no call.
    pub fn submit(&mut self, api: &dyn GithubApi) -> Result<Option<CreatedItem>, ReviewError> {
        self.ensure_open()?;
        if !self.has_content() {
            return Ok(None);
        }
        let context = self.context.as_ref().ok_or(ReviewError::NoContext)?;
        if context.head_sha.as_deref().map_or(true, str::is_empty) {
            return Err(ReviewError::MissingHeadSha(describe(
                &context.repo,
                context.pull_request_number,
            )));
        }
        let review = self.build_review();
        let created = api.create_review(&context.repo, context.pull_request_number, &review)?;
        self.submitted = true;
        Ok(Some(created))
    }
}

/// Multi-line comments take `side` for `start_side` unless it was given.
fn normalize_comment(mut comment: ReviewCommentPayload) -> ReviewCommentPayload {
    match comment.start_line {
        Some(start_line) if start_line != comment.line => {
            if comment.start_side.is_none() {
                comment.start_side = Some(comment.side);
            }
        }
        _ => {
            comment.start_line = None;
            comment.start_side = None;
        }
    }
    comment
}
