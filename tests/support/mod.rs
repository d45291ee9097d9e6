#![allow(dead_code)]

use safe_outputs::config::{BatchSchemas, SafeOutputsConfig};
use safe_outputs::github::{
    CreatedItem, GithubApi, GithubError, IssueAuthor, IssueAuthorLookup, IssuePatch,
    NewDiscussion, NewIssue, NewProject, NewProjectStatusUpdate, NewPullRequest, NewReview,
    Release,
};
use safe_outputs::targeting::RepoSlug;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

/// One privileged call as the fake saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateIssue { repo: String, issue: NewIssue },
    AddComment { repo: String, number: u64, body: String },
    UpdateIssue { repo: String, number: u64, patch: IssuePatch },
    AddLabels { repo: String, number: u64, labels: Vec<String> },
    CreatePullRequest { repo: String, pull_request: NewPullRequest },
    PullRequestHeadSha { repo: String, number: u64 },
    ReleaseByTag { repo: String, tag: String },
    UpdateReleaseBody { repo: String, release_id: u64, body: String },
    CreateDiscussion { repo: String, discussion: NewDiscussion },
    CreateProject { project: NewProject },
    CreateProjectStatusUpdate { update: NewProjectStatusUpdate },
    CreateReview { repo: String, number: u64, review: NewReview },
    LookupIssueAuthor { repo: String, number: u64 },
}

/// Recording stand-in for the GitHub API. Every created item gets the next number.
#[derive(Default)]
pub struct FakeGithub {
    calls: RefCell<Vec<Call>>,
    next_number: Cell<u64>,
    pub authors: BTreeMap<u64, IssueAuthor>,
    pub release_body: String,
    pub head_sha: String,
    /// Operations named here fail with a 500.
    pub failing: Vec<&'static str>,
}

impl FakeGithub {
    pub fn new() -> Self {
        Self {
            next_number: Cell::new(100),
            head_sha: "feedface".to_string(),
            ..Self::default()
        }
    }

    pub fn with_author(mut self, number: u64, login: &str) -> Self {
        self.authors.insert(
            number,
            IssueAuthor {
                login: login.to_string(),
                is_bot: login.ends_with("[bot]"),
            },
        );
        self
    }

    pub fn with_release_body(mut self, body: &str) -> Self {
        self.release_body = body.to_string();
        self
    }

    pub fn failing(mut self, operation: &'static str) -> Self {
        self.failing.push(operation);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count<F: Fn(&Call) -> bool>(&self, predicate: F) -> usize {
        self.calls.borrow().iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, operation: &'static str, call: Call) -> Result<(), GithubError> {
        self.calls.borrow_mut().push(call);
        if self.failing.contains(&operation) {
            return Err(GithubError::Status {
                status: 500,
                url: format!("https://api.github.test/{operation}"),
                message: "server error".to_string(),
            });
        }
        Ok(())
    }

    fn created(&self, repo: &RepoSlug, kind: &str) -> CreatedItem {
        let number = self.next_number.get();
        self.next_number.set(number + 1);
        CreatedItem {
            url: format!("https://github.com/{repo}/{kind}/{number}"),
            number: Some(number),
        }
    }
}

impl IssueAuthorLookup for FakeGithub {
    fn lookup_issue_author(
        &self,
        repo: &RepoSlug,
        number: u64,
    ) -> Result<Option<IssueAuthor>, GithubError> {
        self.record(
            "lookup_issue_author",
            Call::LookupIssueAuthor {
                repo: repo.full_name(),
                number,
            },
        )?;
        Ok(self.authors.get(&number).cloned())
    }
}

impl GithubApi for FakeGithub {
    fn create_issue(&self, repo: &RepoSlug, issue: &NewIssue) -> Result<CreatedItem, GithubError> {
        self.record(
            "create_issue",
            Call::CreateIssue {
                repo: repo.full_name(),
                issue: issue.clone(),
            },
        )?;
        Ok(self.created(repo, "issues"))
    }

    fn add_comment(
        &self,
        repo: &RepoSlug,
        number: u64,
        body: &str,
    ) -> Result<CreatedItem, GithubError> {
        self.record(
            "add_comment",
            Call::AddComment {
                repo: repo.full_name(),
                number,
                body: body.to_string(),
            },
        )?;
        let id = self.next_number.get();
        self.next_number.set(id + 1);
        Ok(CreatedItem {
            url: format!("https://github.com/{repo}/issues/{number}#issuecomment-{id}"),
            number: Some(number),
        })
    }

    fn update_issue(
        &self,
        repo: &RepoSlug,
        number: u64,
        patch: &IssuePatch,
    ) -> Result<CreatedItem, GithubError> {
        self.record(
            "update_issue",
            Call::UpdateIssue {
                repo: repo.full_name(),
                number,
                patch: patch.clone(),
            },
        )?;
        Ok(CreatedItem {
            url: format!("https://github.com/{repo}/issues/{number}"),
            number: Some(number),
        })
    }

    fn add_labels(&self, repo: &RepoSlug, number: u64, labels: &[String]) -> Result<(), GithubError> {
        self.record(
            "add_labels",
            Call::AddLabels {
                repo: repo.full_name(),
                number,
                labels: labels.to_vec(),
            },
        )
    }

    fn create_pull_request(
        &self,
        repo: &RepoSlug,
        pull_request: &NewPullRequest,
    ) -> Result<CreatedItem, GithubError> {
        self.record(
            "create_pull_request",
            Call::CreatePullRequest {
                repo: repo.full_name(),
                pull_request: pull_request.clone(),
            },
        )?;
        Ok(self.created(repo, "pull"))
    }

    fn pull_request_head_sha(&self, repo: &RepoSlug, number: u64) -> Result<String, GithubError> {
        self.record(
            "pull_request_head_sha",
            Call::PullRequestHeadSha {
                repo: repo.full_name(),
                number,
            },
        )?;
        Ok(self.head_sha.clone())
    }

    fn release_by_tag(&self, repo: &RepoSlug, tag: &str) -> Result<Release, GithubError> {
        self.record(
            "release_by_tag",
            Call::ReleaseByTag {
                repo: repo.full_name(),
                tag: tag.to_string(),
            },
        )?;
        Ok(Release {
            id: 7,
            tag: tag.to_string(),
            body: self.release_body.clone(),
            url: format!("https://github.com/{repo}/releases/tag/{tag}"),
        })
    }

    fn update_release_body(
        &self,
        repo: &RepoSlug,
        release_id: u64,
        body: &str,
    ) -> Result<CreatedItem, GithubError> {
        self.record(
            "update_release_body",
            Call::UpdateReleaseBody {
                repo: repo.full_name(),
                release_id,
                body: body.to_string(),
            },
        )?;
        Ok(CreatedItem {
            url: format!("https://github.com/{repo}/releases/{release_id}"),
            number: None,
        })
    }

    fn create_discussion(
        &self,
        repo: &RepoSlug,
        discussion: &NewDiscussion,
    ) -> Result<CreatedItem, GithubError> {
        self.record(
            "create_discussion",
            Call::CreateDiscussion {
                repo: repo.full_name(),
                discussion: discussion.clone(),
            },
        )?;
        Ok(self.created(repo, "discussions"))
    }

    fn create_project(&self, project: &NewProject) -> Result<CreatedItem, GithubError> {
        self.record(
            "create_project",
            Call::CreateProject {
                project: project.clone(),
            },
        )?;
        let number = self.next_number.get();
        self.next_number.set(number + 1);
        Ok(CreatedItem {
            url: format!("https://github.com/orgs/{}/projects/{number}", project.owner),
            number: Some(number),
        })
    }

    fn create_project_status_update(
        &self,
        update: &NewProjectStatusUpdate,
    ) -> Result<CreatedItem, GithubError> {
        self.record(
            "create_project_status_update",
            Call::CreateProjectStatusUpdate {
                update: update.clone(),
            },
        )?;
        Ok(CreatedItem {
            url: format!("{}#status-update", update.project_url),
            number: None,
        })
    }

    fn create_review(
        &self,
        repo: &RepoSlug,
        number: u64,
        review: &NewReview,
    ) -> Result<CreatedItem, GithubError> {
        self.record(
            "create_review",
            Call::CreateReview {
                repo: repo.full_name(),
                number,
                review: review.clone(),
            },
        )?;
        Ok(CreatedItem {
            url: format!("https://github.com/{repo}/pull/{number}#pullrequestreview-1"),
            number: Some(number),
        })
    }
}

pub fn config(yaml: &str) -> (SafeOutputsConfig, BatchSchemas) {
    let config = SafeOutputsConfig::from_yaml_str(yaml).expect("parse config");
    config.validate().expect("valid config");
    let schemas = BatchSchemas::from_config(&config).expect("schemas");
    (config, schemas)
}

pub fn lines(records: &[serde_json::Value]) -> String {
    records
        .iter()
        .map(|record| record.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Validates and dispatches `input` against the fake.
pub fn dispatch(
    yaml: &str,
    context: &safe_outputs::context::EventContext,
    input: &str,
    fake: &FakeGithub,
    options: safe_outputs::batch::BatchOptions,
) -> safe_outputs::batch::BatchReport {
    let (config, schemas) = config(yaml);
    safe_outputs::batch::process_batch(
        input,
        &config,
        &schemas,
        context,
        safe_outputs::batch::BatchOptions {
            dispatch: true,
            ..options
        },
        safe_outputs::batch::BatchServices {
            api: Some(fake),
            lookup: Some(fake),
        },
    )
    .expect("batch")
}

pub fn outcome(report: &safe_outputs::batch::BatchReport, index: usize) -> serde_json::Value {
    serde_json::to_value(&report.results[index]).expect("encode result")
}
