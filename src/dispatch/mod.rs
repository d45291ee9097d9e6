pub mod manifest;
pub mod review_buffer;

pub use manifest::{ManifestEntry, ManifestError, ManifestWriter};
pub use review_buffer::{ReviewBuffer, ReviewContext, ReviewError, ReviewMetadata, ReviewState};

use crate::config::BatchSchemas;
use crate::context::EventContext;
use crate::github::{
    CreatedItem, GithubApi, GithubError, IssuePatch, NewDiscussion, NewIssue, NewProject,
    NewProjectStatusUpdate, NewPullRequest, ReviewCommentPayload,
};
use crate::ingest::ValidatedItem;
use crate::outputs::{OutputType, SafeOutput};
use crate::shared::errors::ErrorCode;
use crate::shared::ids::TemporaryId;
use crate::shared::logging::BatchLog;
use crate::targeting::{
    resolve_target, RepoResolver, RepoSlug, ResolvedEntity, TargetResolution, TargetingError,
    TemporaryIdMap,
};
use serde::Serialize;

const DEFAULT_BASE_BRANCH: &str = "main";
const DEFAULT_WORKFLOW_NAME: &str = "safe-outputs";

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Targeting(#[from] TargetingError),
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error(transparent)]
    Api(#[from] GithubError),
    #[error("create_pull_request needs an attachable patch, but this run produced none")]
    PatchMissing,
    #[error("{0}")]
    TemporaryId(String),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

impl DispatchError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DispatchError::Targeting(err) => err.code(),
            DispatchError::Review(err) => err.code(),
            DispatchError::Api(_) | DispatchError::Manifest(_) => ErrorCode::Api,
            DispatchError::PatchMissing => ErrorCode::PatchMissing,
            DispatchError::TemporaryId(_) => ErrorCode::TemporaryIdUnresolved,
        }
    }
}

/// Batch-wide switches that shape dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    pub staged: bool,
    pub has_patch: bool,
    pub footer: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            staged: false,
            has_patch: false,
            footer: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Created {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        number: Option<u64>,
        repo: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        temporary_id: Option<String>,
    },
    Updated {
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        number: Option<u64>,
        repo: String,
    },
    /// Staged run: what would have happened.
    Staged { preview: String },
    /// Expected no-op, such as a `triggering` target outside an issue or pull request.
    Skipped { reason: String },
    /// Held in the review buffer until the batch ends.
    Buffered { pull_request_number: u64 },
    Reported { message: String },
    Failed { code: ErrorCode, error: String },
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, DispatchOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    pub line: usize,
    #[serde(rename = "type")]
    pub output_type: OutputType,
    #[serde(flatten)]
    pub outcome: DispatchOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub results: Vec<DispatchResult>,
    pub temporary_ids: TemporaryIdMap,
}

impl DispatchSummary {
    pub fn failures(&self) -> impl Iterator<Item = &DispatchResult> {
        self.results
            .iter()
            .filter(|result| !result.outcome.is_success())
    }
}

/// Performs the privileged call for each validated record in line order. Sibling records
/// proceed when one fails; only manifest write failures abort.
pub struct Dispatcher<'a> {
    api: &'a dyn GithubApi,
    schemas: &'a BatchSchemas,
    repos: &'a RepoResolver,
    context: &'a EventContext,
    manifest: &'a ManifestWriter,
    log: &'a BatchLog,
    options: DispatchOptions,
    temporary_ids: TemporaryIdMap,
    review: ReviewBuffer,
    review_line: Option<(usize, OutputType)>,
    review_staged: bool,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        api: &'a dyn GithubApi,
        schemas: &'a BatchSchemas,
        repos: &'a RepoResolver,
        context: &'a EventContext,
        manifest: &'a ManifestWriter,
        log: &'a BatchLog,
        options: DispatchOptions,
    ) -> Self {
        Self {
            api,
            schemas,
            repos,
            context,
            manifest,
            log,
            options,
            temporary_ids: TemporaryIdMap::new(),
            review: ReviewBuffer::new(),
            review_line: None,
            review_staged: options.staged,
        }
    }

    pub fn dispatch_all(mut self, items: &[ValidatedItem]) -> Result<DispatchSummary, ManifestError> {
        let mut results = Vec::with_capacity(items.len() + 1);
        for item in items {
            let outcome = match self.dispatch_item(item) {
                Ok(outcome) => outcome,
                Err(DispatchError::Manifest(err)) => return Err(err),
                Err(err) => DispatchOutcome::Failed {
                    code: err.code(),
                    error: err.to_string(),
                },
            };
            self.log_outcome(item.line, item.output_type, &outcome);
            results.push(DispatchResult {
                line: item.line,
                output_type: item.output_type,
                outcome,
            });
        }

        if let Some((line, output_type)) = self.review_line {
            let outcome = match self.finish_review() {
                Ok(outcome) => outcome,
                Err(DispatchError::Manifest(err)) => return Err(err),
                Err(err) => DispatchOutcome::Failed {
                    code: err.code(),
                    error: err.to_string(),
                },
            };
            self.log_outcome(line, output_type, &outcome);
            results.push(DispatchResult {
                line,
                output_type,
                outcome,
            });
        }

        Ok(DispatchSummary {
            results,
            temporary_ids: self.temporary_ids,
        })
    }

    fn log_outcome(&self, line: usize, output_type: OutputType, outcome: &DispatchOutcome) {
        let message = match serde_json::to_string(outcome) {
            Ok(encoded) => format!("line {line}: {output_type}: {encoded}"),
            Err(_) => format!("line {line}: {output_type}"),
        };
        if outcome.is_success() {
            self.log.info("dispatch.result", &message);
        } else {
            self.log.error("dispatch.failed", &message);
        }
    }

    fn footer(&self) -> String {
        let workflow = self
            .context
            .workflow_name
            .as_deref()
            .unwrap_or(DEFAULT_WORKFLOW_NAME);
        match self.context.run_url() {
            Some(run_url) => format!("> Generated by [{workflow}]({run_url})"),
            None => format!("> Generated by {workflow}"),
        }
    }

    fn footer_enabled(&self, output_type: OutputType) -> bool {
        self.schemas
            .get(output_type)
            .and_then(|schema| schema.options.footer)
            .unwrap_or(self.options.footer)
    }

    /// A type may opt into staging; it cannot opt out of a staged batch.
    fn staged(&self, output_type: OutputType) -> bool {
        self.options.staged
            || self
                .schemas
                .get(output_type)
                .and_then(|schema| schema.options.staged)
                .unwrap_or(false)
    }

    /// Rewrites resolved `#aw_...` references and appends the footer when enabled.
    fn render_body(&self, body: &str, repo: &RepoSlug, output_type: OutputType) -> String {
        let body = self.temporary_ids.replace_references(body, repo);
        if !self.footer_enabled(output_type) {
            return body;
        }
        let footer = self.footer();
        if body.trim().is_empty() {
            footer
        } else {
            format!("{}\n\n{footer}", body.trim_end())
        }
    }

    fn resolve_repo(&self, item: &ValidatedItem) -> Result<RepoSlug, DispatchError> {
        let resolver = match self.schemas.get(item.output_type) {
            Some(schema) => self.repos.for_type(&schema.options)?,
            None => self.repos.clone(),
        };
        Ok(resolver.resolve(item.output.repo())?)
    }

    fn resolve_number(&self, item: &ValidatedItem) -> Result<TargetResolution, DispatchError> {
        let Some(kind) = item.output_type.target_kind() else {
            return Err(TargetingError::TargetUnresolved(format!(
                "`{}` records do not target an existing item",
                item.output_type
            ))
            .into());
        };
        let mode = self
            .schemas
            .get(item.output_type)
            .and_then(|schema| schema.options.target)
            .unwrap_or_default();
        Ok(resolve_target(mode, kind, &item.fields, self.context)?)
    }

    fn record_created(
        &self,
        output_type: OutputType,
        created: &CreatedItem,
        repo: Option<&RepoSlug>,
        temporary_id: Option<&TemporaryId>,
    ) -> Result<DispatchOutcome, DispatchError> {
        let entry = manifest::ManifestEntry::new(output_type, created, repo, temporary_id);
        if self.manifest.log_created_item(&entry)? {
            self.log
                .info("manifest.write", &format!("{output_type}: {}", created.url));
        }
        Ok(DispatchOutcome::Created {
            url: created.url.clone(),
            number: created.number,
            repo: repo.map(RepoSlug::full_name),
            temporary_id: temporary_id.map(|id| id.as_str().to_string()),
        })
    }

    fn dispatch_item(&mut self, item: &ValidatedItem) -> Result<DispatchOutcome, DispatchError> {
        let output_type = item.output_type;
        let staged = self.staged(output_type);

        match &item.output {
            SafeOutput::Noop(noop) => Ok(DispatchOutcome::Reported {
                message: noop.message.clone(),
            }),
            SafeOutput::MissingTool(missing) => Ok(DispatchOutcome::Reported {
                message: match &missing.alternatives {
                    Some(alternatives) => format!(
                        "missing tool `{}`: {} (alternatives: {alternatives})",
                        missing.tool, missing.reason
                    ),
                    None => format!("missing tool `{}`: {}", missing.tool, missing.reason),
                },
            }),

            SafeOutput::CreateIssue(issue) => {
                let repo = self.resolve_repo(item)?;
                if staged {
                    return Ok(DispatchOutcome::Staged {
                        preview: format!("would create issue `{}` in {repo}", issue.title),
                    });
                }
                let temporary_id = match &issue.temporary_id {
                    Some(id) => id.clone(),
                    None => TemporaryId::mint().map_err(DispatchError::TemporaryId)?,
                };
                self.temporary_ids.ensure_unused(&temporary_id)?;
                let created = self.api.create_issue(
                    &repo,
                    &NewIssue {
                        title: issue.title.clone(),
                        body: self.render_body(&issue.body, &repo, output_type),
                        labels: issue.labels.clone(),
                        assignees: issue.assignees.clone(),
                    },
                )?;
                self.temporary_ids.insert(
                    temporary_id.clone(),
                    ResolvedEntity {
                        repo: repo.clone(),
                        number: created.number,
                        project_url: None,
                    },
                )?;
                self.record_created(output_type, &created, Some(&repo), Some(&temporary_id))
            }

            SafeOutput::AddComment(comment) => {
                let repo = self.resolve_repo(item)?;
                let target = match self.resolve_number(item)? {
                    TargetResolution::Resolved(target) => target,
                    TargetResolution::Skip(reason) => return Ok(DispatchOutcome::Skipped { reason }),
                };
                if staged {
                    return Ok(DispatchOutcome::Staged {
                        preview: format!("would comment on {repo}#{}", target.number),
                    });
                }
                let body = self.render_body(&comment.body, &repo, output_type);
                let created = self.api.add_comment(&repo, target.number, &body)?;
                self.record_created(output_type, &created, Some(&repo), None)
            }

            SafeOutput::UpdateIssue(update) => {
                let repo = self.resolve_repo(item)?;
                let target = match self.resolve_number(item)? {
                    TargetResolution::Resolved(target) => target,
                    TargetResolution::Skip(reason) => return Ok(DispatchOutcome::Skipped { reason }),
                };
                if staged {
                    return Ok(DispatchOutcome::Staged {
                        preview: format!("would update issue {repo}#{}", target.number),
                    });
                }
                let patch = IssuePatch {
                    title: update.title.clone(),
                    body: update
                        .body
                        .as_deref()
                        .map(|body| self.temporary_ids.replace_references(body, &repo)),
                    state: None,
                }
                .with_state(update.status);
                let updated = self.api.update_issue(&repo, target.number, &patch)?;
                Ok(DispatchOutcome::Updated {
                    url: Some(updated.url),
                    number: Some(target.number),
                    repo: repo.full_name(),
                })
            }

            SafeOutput::AddLabels(labels) => {
                let repo = self.resolve_repo(item)?;
                let target = match self.resolve_number(item)? {
                    TargetResolution::Resolved(target) => target,
                    TargetResolution::Skip(reason) => return Ok(DispatchOutcome::Skipped { reason }),
                };
                if staged {
                    return Ok(DispatchOutcome::Staged {
                        preview: format!(
                            "would add labels [{}] to {repo}#{}",
                            labels.labels.join(", "),
                            target.number
                        ),
                    });
                }
                self.api.add_labels(&repo, target.number, &labels.labels)?;
                Ok(DispatchOutcome::Updated {
                    url: None,
                    number: Some(target.number),
                    repo: repo.full_name(),
                })
            }

            SafeOutput::CreatePullRequest(pull_request) => {
                let repo = self.resolve_repo(item)?;
                if !self.options.has_patch {
                    return Err(DispatchError::PatchMissing);
                }
                let options = self.schemas.get(output_type).map(|schema| &schema.options);
                let base = options
                    .and_then(|options| options.base_branch.clone())
                    .or_else(|| self.context.default_branch.clone())
                    .unwrap_or_else(|| DEFAULT_BASE_BRANCH.to_string());
                let draft = options.and_then(|options| options.draft).unwrap_or(true);
                let head = match &pull_request.branch {
                    Some(branch) => branch.clone(),
                    None => match self.context.run_id {
                        Some(run_id) => format!("safe-outputs/run-{run_id}"),
                        None => format!(
                            "safe-outputs/{}",
                            TemporaryId::mint().map_err(DispatchError::TemporaryId)?
                        ),
                    },
                };
                if staged {
                    return Ok(DispatchOutcome::Staged {
                        preview: format!(
                            "would open pull request `{}` in {repo} from `{head}` into `{base}`",
                            pull_request.title
                        ),
                    });
                }
                let created = self.api.create_pull_request(
                    &repo,
                    &NewPullRequest {
                        title: pull_request.title.clone(),
                        body: self.render_body(&pull_request.body, &repo, output_type),
                        head,
                        base,
                        draft,
                        labels: pull_request.labels.clone(),
                    },
                )?;
                self.record_created(output_type, &created, Some(&repo), None)
            }

            SafeOutput::ReviewComment(comment) => {
                let pull_request_number = match self.bind_review(item, staged)? {
                    Some(number) => number,
                    None => {
                        return Ok(DispatchOutcome::Skipped {
                            reason: "no pull request to review in this run".to_string(),
                        })
                    }
                };
                let repo = self.resolve_repo(item)?;
                self.review.add_comment(ReviewCommentPayload {
                    path: comment.path.clone(),
                    line: comment.line,
                    body: self.temporary_ids.replace_references(&comment.body, &repo),
                    side: comment.side,
                    start_line: comment.start_line,
                    start_side: comment.start_side,
                })?;
                Ok(DispatchOutcome::Buffered {
                    pull_request_number,
                })
            }

            SafeOutput::SubmitReview(review) => {
                let pull_request_number = match self.bind_review(item, staged)? {
                    Some(number) => number,
                    None => {
                        return Ok(DispatchOutcome::Skipped {
                            reason: "no pull request to review in this run".to_string(),
                        })
                    }
                };
                self.review.set_metadata(ReviewMetadata {
                    body: review.body.clone(),
                    event: review.event,
                })?;
                Ok(DispatchOutcome::Buffered {
                    pull_request_number,
                })
            }

            SafeOutput::CreateDiscussion(discussion) => {
                let repo = self.resolve_repo(item)?;
                if staged {
                    return Ok(DispatchOutcome::Staged {
                        preview: format!("would create discussion `{}` in {repo}", discussion.title),
                    });
                }
                let created = self.api.create_discussion(
                    &repo,
                    &NewDiscussion {
                        title: discussion.title.clone(),
                        body: self.render_body(&discussion.body, &repo, output_type),
                        category: discussion.category.clone(),
                    },
                )?;
                self.record_created(output_type, &created, Some(&repo), None)
            }

            SafeOutput::UpdateRelease(release) => {
                let repo = self.resolve_repo(item)?;
                let tag = release
                    .tag
                    .clone()
                    .or_else(|| self.context.release_tag.clone())
                    .ok_or_else(|| {
                        TargetingError::TargetUnresolved(
                            "update_release needs `tag` when the run was not triggered by a release"
                                .to_string(),
                        )
                    })?;
                if staged {
                    return Ok(DispatchOutcome::Staged {
                        preview: format!(
                            "would {} release notes of `{tag}` in {repo}",
                            release.operation.as_str()
                        ),
                    });
                }
                let existing = self.api.release_by_tag(&repo, &tag)?;
                let addition = self.render_body(&release.body, &repo, output_type);
                let body = release.operation.apply(&existing.body, &addition);
                let updated = self.api.update_release_body(&repo, existing.id, &body)?;
                Ok(DispatchOutcome::Updated {
                    url: Some(updated.url),
                    number: None,
                    repo: repo.full_name(),
                })
            }

            SafeOutput::CreateProject(project) => {
                let repo = self.resolve_repo(item)?;
                let owner = project.owner.clone().unwrap_or_else(|| repo.owner.clone());
                if staged {
                    return Ok(DispatchOutcome::Staged {
                        preview: format!("would create project `{}` owned by {owner}", project.title),
                    });
                }
                let temporary_id = match &project.temporary_id {
                    Some(id) => id.clone(),
                    None => TemporaryId::mint().map_err(DispatchError::TemporaryId)?,
                };
                self.temporary_ids.ensure_unused(&temporary_id)?;
                let created = self.api.create_project(&NewProject {
                    owner,
                    title: project.title.clone(),
                })?;
                self.temporary_ids.insert(
                    temporary_id.clone(),
                    ResolvedEntity {
                        repo: repo.clone(),
                        number: created.number,
                        project_url: Some(created.url.clone()),
                    },
                )?;
                self.record_created(output_type, &created, Some(&repo), Some(&temporary_id))
            }

            SafeOutput::ProjectStatusUpdate(update) => {
                if staged {
                    return Ok(DispatchOutcome::Staged {
                        preview: format!(
                            "would post a {} status update to project {}",
                            update.status.as_str(),
                            update.project
                        ),
                    });
                }
                let project_url = self
                    .temporary_ids
                    .resolve_project_reference(&update.project)?;
                let created = self.api.create_project_status_update(&NewProjectStatusUpdate {
                    project_url,
                    body: update.body.clone(),
                    status: update.status,
                    start_date: update.start_date,
                    target_date: update.target_date,
                })?;
                self.record_created(output_type, &created, None, None)
            }
        }
    }

    /// Resolves the pull request a review record belongs to and binds the batch's review
    /// buffer to it. `None` means the record is a skip.
    fn bind_review(&mut self, item: &ValidatedItem, staged: bool) -> Result<Option<u64>, DispatchError> {
        let repo = self.resolve_repo(item)?;
        let target = match self.resolve_number(item)? {
            TargetResolution::Resolved(target) => target,
            TargetResolution::Skip(_) => return Ok(None),
        };
        self.review.ensure_same_target(&repo, target.number)?;

        let bound_sha = self
            .review
            .context()
            .and_then(|bound| bound.head_sha.clone());
        let head_sha = match bound_sha {
            Some(sha) => Some(sha),
            None => match self.context.pull_request.as_ref() {
                Some(pr) if pr.number == target.number && pr.head_sha.is_some() => {
                    pr.head_sha.clone()
                }
                _ if staged => None,
                _ => Some(self.api.pull_request_head_sha(&repo, target.number)?),
            },
        };
        self.review.set_context(ReviewContext {
            repo,
            pull_request_number: target.number,
            head_sha,
        })?;

        if self.review_line.is_none() || item.output_type == OutputType::SubmitPullRequestReview {
            self.review_line = Some((item.line, item.output_type));
        }
        self.review_staged |= staged;
        Ok(Some(target.number))
    }

    fn finish_review(&mut self) -> Result<DispatchOutcome, DispatchError> {
        let footer_enabled = self.footer_enabled(OutputType::SubmitPullRequestReview)
            && self.footer_enabled(OutputType::CreatePullRequestReviewComment);
        let footer = footer_enabled.then(|| self.footer());
        let mut review = std::mem::take(&mut self.review).with_footer(footer);

        if self.review_staged {
            let target = review
                .context()
                .map(|context| format!("{}#{}", context.repo, context.pull_request_number))
                .unwrap_or_else(|| "the pull request".to_string());
            return Ok(DispatchOutcome::Staged {
                preview: format!(
                    "would submit one review with {} comment(s) on {target}",
                    review.comment_count()
                ),
            });
        }

        let repo = review.context().map(|context| context.repo.clone());
        let Some(created) = review.submit(self.api)? else {
            return Ok(DispatchOutcome::Skipped {
                reason: "nothing to review".to_string(),
            });
        };
        self.log.info(
            "review.submit",
            &format!(
                "submitted one review with {} comment(s): {}",
                review.comment_count(),
                created.url
            ),
        );
        self.record_created(
            OutputType::SubmitPullRequestReview,
            &created,
            repo.as_ref(),
            None,
        )
    }
}
