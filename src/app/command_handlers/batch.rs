use crate::batch::{run_batch, BatchRequest, BatchServices};
use crate::context::EventContext;
use crate::github::{GithubApi, GithubClient, IssueAuthorLookup, OfflineApi};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

const USAGE: &str =
    "usage: <validate|dispatch> <outputs.jsonl> --config <file> [--context <file>] [--patch <file>] [--staged]";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct BatchArgs {
    input: PathBuf,
    config: PathBuf,
    context: Option<PathBuf>,
    patch: Option<PathBuf>,
    staged: bool,
}

fn flag_value(args: &[String], index: usize, flag: &str) -> Result<PathBuf, String> {
    args.get(index + 1)
        .filter(|value| !value.starts_with("--"))
        .map(PathBuf::from)
        .ok_or_else(|| format!("`{flag}` needs a value\n{USAGE}"))
}

fn parse_batch_args(args: &[String]) -> Result<BatchArgs, String> {
    let mut input = None;
    let mut parsed = BatchArgs::default();
    let mut config = None;
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--config" => {
                config = Some(flag_value(args, index, "--config")?);
                index += 2;
            }
            "--context" => {
                parsed.context = Some(flag_value(args, index, "--context")?);
                index += 2;
            }
            "--patch" => {
                parsed.patch = Some(flag_value(args, index, "--patch")?);
                index += 2;
            }
            "--staged" => {
                parsed.staged = true;
                index += 1;
            }
            flag if flag.starts_with("--") => {
                return Err(format!("unknown option `{flag}`\n{USAGE}"));
            }
            positional => {
                if input.is_some() {
                    return Err(format!("unexpected argument `{positional}`\n{USAGE}"));
                }
                input = Some(PathBuf::from(positional));
                index += 1;
            }
        }
    }
    parsed.input = input.ok_or_else(|| format!("missing agent output file\n{USAGE}"))?;
    parsed.config = config.ok_or_else(|| format!("missing `--config`\n{USAGE}"))?;
    Ok(parsed)
}

/// Builds the event context the way a workflow step sees it: the webhook payload at
/// `GITHUB_EVENT_PATH`, overlaid with the run-level `GITHUB_*` values.
pub fn context_from_env<F>(var: F) -> Result<EventContext, String>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| var(key).filter(|value| !value.trim().is_empty());
    let mut context = match (var("GITHUB_EVENT_NAME"), var("GITHUB_EVENT_PATH")) {
        (Some(event_name), Some(event_path)) => {
            let raw = fs::read_to_string(&event_path)
                .map_err(|err| format!("failed to read event payload {event_path}: {err}"))?;
            let payload: Value = serde_json::from_str(&raw)
                .map_err(|err| format!("failed to parse event payload {event_path}: {err}"))?;
            EventContext::from_github_event(&event_name, &payload)
        }
        (event_name, _) => EventContext {
            event_name,
            ..EventContext::default()
        },
    };

    if let Some(repo) = var("GITHUB_REPOSITORY") {
        context.repo = Some(repo);
    }
    if let Some(actor) = var("GITHUB_ACTOR") {
        context.actor = Some(actor);
    }
    if let Some(run_id) = var("GITHUB_RUN_ID") {
        context.run_id = Some(
            run_id
                .trim()
                .parse()
                .map_err(|_| format!("GITHUB_RUN_ID must be a number, got `{run_id}`"))?,
        );
    }
    context.server_url = var("GITHUB_SERVER_URL").or(context.server_url);
    context.workflow_name = var("GITHUB_WORKFLOW").or(context.workflow_name);
    Ok(context)
}

fn load_context(args: &BatchArgs) -> Result<EventContext, String> {
    match &args.context {
        Some(path) => EventContext::from_path(path).map_err(|err| err.to_string()),
        None => context_from_env(|key| std::env::var(key).ok()),
    }
}

fn run(args: &[String], dispatch: bool) -> Result<String, String> {
    let args = parse_batch_args(args)?;
    let request = BatchRequest {
        input_path: args.input.clone(),
        config_path: args.config.clone(),
        patch_path: args.patch.clone(),
        context: load_context(&args)?,
        dispatch,
        staged: args.staged,
    };

    let client = GithubClient::from_env().ok();
    let api: &dyn GithubApi = match &client {
        Some(client) => client,
        None => &OfflineApi,
    };
    let services = BatchServices {
        api: dispatch.then_some(api),
        lookup: client
            .as_ref()
            .map(|client| client as &dyn IssueAuthorLookup),
    };

    let report = run_batch(&request, services);
    if let Some(fatal) = &report.fatal {
        return Err(fatal.clone());
    }
    serde_json::to_string_pretty(&report).map_err(|err| format!("failed to encode report: {err}"))
}

pub fn cmd_validate(args: &[String]) -> Result<String, String> {
    run(args, false)
}

pub fn cmd_dispatch(args: &[String]) -> Result<String, String> {
    run(args, true)
}
