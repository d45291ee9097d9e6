use crate::outputs::{IssueState, ProjectStatus, ReviewEvent, Side};
use crate::targeting::RepoSlug;
use chrono::NaiveDate;
use serde::Serialize;

pub mod client;

pub use client::GithubClient;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GithubError {
    #[error("github api request failed: {0}")]
    Request(String),
    #[error("github api responded with status {status} for {url}: {message}")]
    Status {
        status: u16,
        url: String,
        message: String,
    },
    #[error("github api returned an unexpected response: {0}")]
    Response(String),
    #[error("github graphql error: {0}")]
    GraphQl(String),
    #[error("{0} not found")]
    NotFound(String),
}

/// What the API handed back for something that now exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedItem {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueAuthor {
    pub login: String,
    pub is_bot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assignees: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssuePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<&'static str>,
}

impl IssuePatch {
    pub fn with_state(mut self, state: Option<IssueState>) -> Self {
        self.state = state.map(IssueState::as_str);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
    pub draft: bool,
    #[serde(skip)]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub id: u64,
    pub tag: String,
    pub body: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDiscussion {
    pub title: String,
    pub body: String,
    /// Category name or slug; the repository's first category when absent.
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub owner: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProjectStatusUpdate {
    pub project_url: String,
    pub body: String,
    pub status: ProjectStatus,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
}

/// One line-level comment as the review API expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewCommentPayload {
    pub path: String,
    pub line: u64,
    pub body: String,
    pub side: Side,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_side: Option<Side>,
}

impl ReviewCommentPayload {
    pub fn single_line(path: &str, line: u64, body: &str) -> Self {
        Self {
            path: path.to_string(),
            line,
            body: body.to_string(),
            side: Side::Right,
            start_line: None,
            start_side: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewReview {
    pub commit_id: String,
    pub body: String,
    pub event: ReviewEvent,
    pub comments: Vec<ReviewCommentPayload>,
}

/// Resolves who opened an issue or pull request. `Ok(None)` when it does not exist.
pub trait IssueAuthorLookup {
    fn lookup_issue_author(
        &self,
        repo: &RepoSlug,
        number: u64,
    ) -> Result<Option<IssueAuthor>, GithubError>;
}

/// The privileged calls dispatch is allowed to make. Only invoked with validated records.
pub trait GithubApi {
    fn create_issue(&self, repo: &RepoSlug, issue: &NewIssue) -> Result<CreatedItem, GithubError>;

    fn add_comment(
        &self,
        repo: &RepoSlug,
        number: u64,
        body: &str,
    ) -> Result<CreatedItem, GithubError>;

    fn update_issue(
        &self,
        repo: &RepoSlug,
        number: u64,
        patch: &IssuePatch,
    ) -> Result<CreatedItem, GithubError>;

    fn add_labels(
        &self,
        repo: &RepoSlug,
        number: u64,
        labels: &[String],
    ) -> Result<(), GithubError>;

    fn create_pull_request(
        &self,
        repo: &RepoSlug,
        pull_request: &NewPullRequest,
    ) -> Result<CreatedItem, GithubError>;

    fn pull_request_head_sha(&self, repo: &RepoSlug, number: u64) -> Result<String, GithubError>;

    fn release_by_tag(&self, repo: &RepoSlug, tag: &str) -> Result<Release, GithubError>;

    fn update_release_body(
        &self,
        repo: &RepoSlug,
        release_id: u64,
        body: &str,
    ) -> Result<CreatedItem, GithubError>;

    fn create_discussion(
        &self,
        repo: &RepoSlug,
        discussion: &NewDiscussion,
    ) -> Result<CreatedItem, GithubError>;

    fn create_project(&self, project: &NewProject) -> Result<CreatedItem, GithubError>;

    fn create_project_status_update(
        &self,
        update: &NewProjectStatusUpdate,
    ) -> Result<CreatedItem, GithubError>;

    fn create_review(
        &self,
        repo: &RepoSlug,
        number: u64,
        review: &NewReview,
    ) -> Result<CreatedItem, GithubError>;
}

/// Stands in for the client when no token is configured. Staged runs never reach it;
/// anything else fails with a request error naming the missing token.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineApi;

impl OfflineApi {
    fn unavailable<T>(&self, operation: &str) -> Result<T, GithubError> {
        Err(GithubError::Request(format!(
            "{operation}: no github token configured (set GITHUB_TOKEN or GH_TOKEN)"
        )))
    }
}

impl GithubApi for OfflineApi {
    fn create_issue(&self, _: &RepoSlug, _: &NewIssue) -> Result<CreatedItem, GithubError> {
        self.unavailable("create issue")
    }

    fn add_comment(&self, _: &RepoSlug, _: u64, _: &str) -> Result<CreatedItem, GithubError> {
        self.unavailable("add comment")
    }

    fn update_issue(
        &self,
        _: &RepoSlug,
        _: u64,
        _: &IssuePatch,
    ) -> Result<CreatedItem, GithubError> {
        self.unavailable("update issue")
    }

    fn add_labels(&self, _: &RepoSlug, _: u64, _: &[String]) -> Result<(), GithubError> {
        self.unavailable("add labels")
    }

    fn create_pull_request(
        &self,
        _: &RepoSlug,
        _: &NewPullRequest,
    ) -> Result<CreatedItem, GithubError> {
        self.unavailable("create pull request")
    }

    fn pull_request_head_sha(&self, _: &RepoSlug, _: u64) -> Result<String, GithubError> {
        self.unavailable("fetch pull request")
    }

    fn release_by_tag(&self, _: &RepoSlug, _: &str) -> Result<Release, GithubError> {
        self.unavailable("fetch release")
    }

    fn update_release_body(&self, _: &RepoSlug, _: u64, _: &str) -> Result<CreatedItem, GithubError> {
        self.unavailable("update release")
    }

    fn create_discussion(
        &self,
        _: &RepoSlug,
        _: &NewDiscussion,
    ) -> Result<CreatedItem, GithubError> {
        self.unavailable("create discussion")
    }

    fn create_project(&self, _: &NewProject) -> Result<CreatedItem, GithubError> {
        self.unavailable("create project")
    }

    fn create_project_status_update(
        &self,
        _: &NewProjectStatusUpdate,
    ) -> Result<CreatedItem, GithubError> {
        self.unavailable("create project status update")
    }

    fn create_review(&self, _: &RepoSlug, _: u64, _: &NewReview) -> Result<CreatedItem, GithubError> {
        self.unavailable("create review")
    }
}
