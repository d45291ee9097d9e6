use crate::config::{load_config, BatchSchemas, ConfigError, SafeOutputsConfig};
use crate::context::EventContext;
use crate::dispatch::{
    DispatchOptions, DispatchResult, Dispatcher, ManifestError, ManifestWriter,
};
use crate::github::{GithubApi, IssueAuthorLookup};
use crate::ingest::{Ingestor, MentionResolver};
use crate::shared::logging::BatchLog;
use crate::targeting::{RepoResolver, RepoSlug, TemporaryIdMap};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Failures that abort the whole batch.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("failed to read agent output {path}: {source}")]
    Input {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("no default repository: set `default_repo` in the config or run inside a repository context")]
    NoDefaultRepo,
    #[error("invalid default repository `{repo}`: {reason}")]
    InvalidDefaultRepo { repo: String, reason: String },
    #[error("dispatch needs a github client")]
    NoApi,
}

/// External collaborators a batch may call. Validation-only runs need neither.
#[derive(Clone, Copy, Default)]
pub struct BatchServices<'a> {
    pub api: Option<&'a dyn GithubApi>,
    pub lookup: Option<&'a dyn IssueAuthorLookup>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Validate only, or validate and then dispatch.
    pub dispatch: bool,
    /// Forces a staged run regardless of configuration.
    pub staged: bool,
    pub has_patch: bool,
}

/// Paths and context for a batch driven from files.
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    pub input_path: PathBuf,
    pub config_path: PathBuf,
    pub patch_path: Option<PathBuf>,
    pub context: EventContext,
    pub dispatch: bool,
    pub staged: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub items: Vec<Value>,
    pub errors: Vec<String>,
    pub counts: BTreeMap<String, u32>,
    pub has_patch: bool,
    pub staged: bool,
    pub results: Vec<DispatchResult>,
    pub temporary_ids: TemporaryIdMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal: Option<String>,
}

impl BatchReport {
    /// Everything defaulted to empty/false, carrying only the fatal message.
    pub fn fatal(err: &BatchError) -> Self {
        Self {
            fatal: Some(err.to_string()),
            ..Self::default()
        }
    }

    /// The `{"items": [...], "errors": [...]}` value handed to callers.
    pub fn output_json(&self) -> Value {
        serde_json::json!({
            "items": self.items,
            "errors": self.errors,
        })
    }

    pub fn is_success(&self) -> bool {
        self.fatal.is_none()
            && self.errors.is_empty()
            && self.results.iter().all(|result| result.outcome.is_success())
    }
}

/// A patch is attachable when the file exists and is non-empty.
pub fn patch_is_attachable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|metadata| metadata.is_file() && metadata.len() > 0)
        .unwrap_or(false)
}

/// Reads the input and configuration from disk and runs the batch. Never fails: fatal
/// errors come back as a report with `fatal` set.
pub fn run_batch(request: &BatchRequest, services: BatchServices<'_>) -> BatchReport {
    match load_and_run(request, services) {
        Ok(report) => report,
        Err(err) => BatchReport::fatal(&err),
    }
}

fn load_and_run(
    request: &BatchRequest,
    services: BatchServices<'_>,
) -> Result<BatchReport, BatchError> {
    let input = fs::read_to_string(&request.input_path).map_err(|source| BatchError::Input {
        path: request.input_path.display().to_string(),
        source,
    })?;
    let (config, schemas) = load_config(&request.config_path)?;
    let options = BatchOptions {
        dispatch: request.dispatch,
        staged: request.staged,
        has_patch: request
            .patch_path
            .as_deref()
            .is_some_and(patch_is_attachable),
    };
    process_batch(&input, &config, &schemas, &request.context, options, services)
}

/// Ingests `input` and, when asked, dispatches the accepted records.
pub fn process_batch(
    input: &str,
    config: &SafeOutputsConfig,
    schemas: &BatchSchemas,
    context: &EventContext,
    options: BatchOptions,
    services: BatchServices<'_>,
) -> Result<BatchReport, BatchError> {
    let log = BatchLog::new(config.log_path.clone());
    let staged = options.staged || config.staged;

    let default_repo = config
        .default_repo
        .as_deref()
        .or(context.repo.as_deref())
        .ok_or(BatchError::NoDefaultRepo)?;
    let default_repo =
        RepoSlug::parse(default_repo).map_err(|reason| BatchError::InvalidDefaultRepo {
            repo: default_repo.to_string(),
            reason,
        })?;
    let repos = RepoResolver::new(default_repo, config.allowed_repos.clone());

    let manifest = ManifestWriter::new(config.manifest_path.clone(), staged);
    if options.dispatch {
        manifest.touch()?;
    }

    let mut mentions = MentionResolver::new(config.allowed_mentions.as_slice());
    if config.allow_context_mentions {
        mentions = mentions.with_context(context);
    }
    if let Some(lookup) = services.lookup {
        mentions = mentions.with_lookup(lookup);
    }

    log.info(
        "batch.start",
        &format!(
            "{} {} line(s) for {}",
            if options.dispatch { "dispatching" } else { "validating" },
            input.lines().count(),
            repos.default_repo()
        ),
    );
    let outcome = Ingestor::new(schemas, &repos, mentions, &log)
        .with_global_max(config.max)
        .ingest(input);

    let mut report = BatchReport {
        items: outcome.items.iter().map(|item| item.to_json()).collect(),
        errors: outcome.errors.clone(),
        counts: outcome.counts.clone(),
        has_patch: options.has_patch,
        staged,
        ..BatchReport::default()
    };

    if options.dispatch {
        let api = services.api.ok_or(BatchError::NoApi)?;
        let dispatcher = Dispatcher::new(
            api,
            schemas,
            &repos,
            context,
            &manifest,
            &log,
            DispatchOptions {
                staged,
                has_patch: options.has_patch,
                footer: config.footer,
            },
        );
        let summary = dispatcher.dispatch_all(&outcome.items)?;
        report.results = summary.results;
        report.temporary_ids = summary.temporary_ids;
    }

    log.info(
        "batch.done",
        &format!(
            "{} item(s), {} error(s), {} dispatch result(s)",
            report.items.len(),
            report.errors.len(),
            report.results.len()
        ),
    );
    Ok(report)
}
