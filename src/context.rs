use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

const DEFAULT_SERVER_URL: &str = "https://github.com";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct IssueContext {
    pub number: u64,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PullRequestContext {
    pub number: u64,
    #[serde(default)]
    pub head_sha: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

/// What the workflow run knows about the event that triggered it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct EventContext {
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub issue: Option<IssueContext>,
    #[serde(default)]
    pub pull_request: Option<PullRequestContext>,
    #[serde(default)]
    pub discussion_number: Option<u64>,
    #[serde(default)]
    pub release_tag: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub run_id: Option<u64>,
    #[serde(default)]
    pub run_url: Option<String>,
    #[serde(default)]
    pub workflow_name: Option<String>,
    #[serde(default)]
    pub server_url: Option<String>,
}

impl EventContext {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Context {
            path: path.display().to_string(),
            source,
        })
    }

    /// Extracts the triggering issue/pull request/release from a raw webhook payload.
    /// Comments on pull requests arrive as `issue_comment` events and are mapped to
    /// the pull request.
    pub fn from_github_event(event_name: &str, payload: &Value) -> Self {
        let login = |value: &Value| {
            value
                .pointer("/user/login")
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let mut context = EventContext {
            event_name: Some(event_name.to_string()),
            repo: payload
                .pointer("/repository/full_name")
                .and_then(Value::as_str)
                .map(str::to_string),
            default_branch: payload
                .pointer("/repository/default_branch")
                .and_then(Value::as_str)
                .map(str::to_string),
            actor: payload
                .pointer("/sender/login")
                .and_then(Value::as_str)
                .map(str::to_string),
            ..Self::default()
        };

        if let Some(pr) = payload.get("pull_request") {
            if let Some(number) = pr.get("number").and_then(Value::as_u64) {
                context.pull_request = Some(PullRequestContext {
                    number,
                    head_sha: pr
                        .pointer("/head/sha")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    author: login(pr),
                });
            }
        }
        if let Some(issue) = payload.get("issue") {
            if let Some(number) = issue.get("number").and_then(Value::as_u64) {
                if issue.get("pull_request").is_some() {
                    context.pull_request.get_or_insert(PullRequestContext {
                        number,
                        head_sha: None,
                        author: login(issue),
                    });
                } else {
                    context.issue = Some(IssueContext {
                        number,
                        author: login(issue),
                    });
                }
            }
        }
        context.discussion_number = payload
            .pointer("/discussion/number")
            .and_then(Value::as_u64);
        context.release_tag = payload
            .pointer("/release/tag_name")
            .and_then(Value::as_str)
            .map(str::to_string);
        context
    }

    pub fn triggering_issue_number(&self) -> Option<u64> {
        self.issue.as_ref().map(|issue| issue.number)
    }

    pub fn triggering_pull_request_number(&self) -> Option<u64> {
        self.pull_request.as_ref().map(|pr| pr.number)
    }

    pub fn run_url(&self) -> Option<String> {
        if let Some(run_url) = &self.run_url {
            return Some(run_url.clone());
        }
        let repo = self.repo.as_deref()?;
        let run_id = self.run_id?;
        let server = self
            .server_url
            .as_deref()
            .unwrap_or(DEFAULT_SERVER_URL)
            .trim_end_matches('/');
        Some(format!("{server}/{repo}/actions/runs/{run_id}"))
    }
}
