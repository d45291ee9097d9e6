use super::TargetingError;
use crate::config::TargetMode;
use crate::context::EventContext;
use crate::outputs::TargetKind;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub number: u64,
    pub is_pull_request: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetResolution {
    Resolved(ResolvedTarget),
    /// Expected no-op: the run was not triggered by a matching issue or pull request.
    Skip(String),
}

/// Accepts a positive number, or a numeric string with an optional leading `#`.
pub fn parse_item_number(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().filter(|number| *number > 0),
        Value::String(raw) => raw
            .trim()
            .trim_start_matches('#')
            .parse::<u64>()
            .ok()
            .filter(|number| *number > 0),
        _ => None,
    }
}

pub fn resolve_target(
    mode: TargetMode,
    kind: TargetKind,
    fields: &Map<String, Value>,
    context: &EventContext,
) -> Result<TargetResolution, TargetingError> {
    match mode {
        TargetMode::Triggering => Ok(resolve_triggering(kind, context)),
        TargetMode::Explicit(number) => Ok(TargetResolution::Resolved(ResolvedTarget {
            number,
            is_pull_request: kind == TargetKind::PullRequest,
        })),
        TargetMode::Any => {
            let field = kind.number_field();
            let Some(raw) = fields.get(field).filter(|value| !value.is_null()) else {
                return Err(TargetingError::TargetUnresolved(format!(
                    "target is `*`, so the record must set `{field}` to the number to act on"
                )));
            };
            let number = parse_item_number(raw).ok_or_else(|| {
                TargetingError::TargetUnresolved(format!(
                    "`{field}` must be a positive issue or pull request number, got {raw}"
                ))
            })?;
            let is_pull_request = match kind {
                TargetKind::PullRequest => true,
                TargetKind::Issue => false,
                TargetKind::IssueOrPullRequest => {
                    context.triggering_pull_request_number() == Some(number)
                }
            };
            Ok(TargetResolution::Resolved(ResolvedTarget {
                number,
                is_pull_request,
            }))
        }
    }
}

fn resolve_triggering(kind: TargetKind, context: &EventContext) -> TargetResolution {
    let issue = context.triggering_issue_number();
    let pull_request = context.triggering_pull_request_number();
    let resolved = match kind {
        TargetKind::Issue => issue.map(|number| (number, false)),
        TargetKind::PullRequest => pull_request.map(|number| (number, true)),
        TargetKind::IssueOrPullRequest => issue
            .map(|number| (number, false))
            .or_else(|| pull_request.map(|number| (number, true))),
    };
    match resolved {
        Some((number, is_pull_request)) => TargetResolution::Resolved(ResolvedTarget {
            number,
            is_pull_request,
        }),
        None => TargetResolution::Skip(format!(
            "target is `triggering` but the run was not triggered by {}",
            match kind {
                TargetKind::Issue => "an issue",
                TargetKind::PullRequest => "a pull request",
                TargetKind::IssueOrPullRequest => "an issue or pull request",
            }
        )),
    }
}
