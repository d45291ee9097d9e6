mod support;

use safe_outputs::batch::BatchOptions;
use safe_outputs::context::EventContext;
use safe_outputs::shared::ids::TemporaryId;
use safe_outputs::targeting::{RepoSlug, ResolvedEntity, TemporaryIdMap};
use serde_json::json;
use support::{dispatch, lines, outcome, Call, FakeGithub};

const PROJECT_CONFIG: &str = "default_repo: acme/widgets
types:
  create_project: {}
  create_project_status_update: {}
";

fn status_updates(fake: &FakeGithub) -> Vec<String> {
    fake.calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::CreateProjectStatusUpdate { update } => Some(update.project_url),
            _ => None,
        })
        .collect()
}

#[test]
fn status_update_resolves_project_created_earlier_in_the_batch() {
    let fake = FakeGithub::new();
    let input = lines(&[
        json!({"type": "create_project", "title": "Roadmap", "temporary_id": "aw_abcdef012345"}),
        json!({"type": "create_project_status_update", "project": "#aw_abcdef012345", "body": "Kicked off", "status": "AT_RISK"}),
    ]);
    let report = dispatch(
        PROJECT_CONFIG,
        &EventContext::default(),
        &input,
        &fake,
        BatchOptions::default(),
    );

    let created = outcome(&report, 0);
    assert_eq!(created["status"], "created");
    assert_eq!(created["temporary_id"], "aw_abcdef012345");
    assert_eq!(
        status_updates(&fake),
        vec!["https://github.com/orgs/acme/projects/100".to_string()]
    );
    assert_eq!(outcome(&report, 1)["status"], "created");

    let ids = serde_json::to_value(&report.temporary_ids).expect("encode");
    assert_eq!(
        ids["aw_abcdef012345"]["project_url"],
        "https://github.com/orgs/acme/projects/100"
    );
}

#[test]
fn project_without_temporary_id_gets_one_minted() {
    let fake = FakeGithub::new();
    let report = dispatch(
        PROJECT_CONFIG,
        &EventContext::default(),
        r#"{"type":"create_project","title":"Roadmap","owner":"octo-org"}"#,
        &fake,
        BatchOptions::default(),
    );
    let minted = outcome(&report, 0)["temporary_id"]
        .as_str()
        .map(str::to_string)
        .expect("minted id");
    assert!(TemporaryId::parse(&minted).is_ok());
    assert_eq!(report.temporary_ids.len(), 1);
    assert!(matches!(
        &fake.calls()[0],
        Call::CreateProject { project } if project.owner == "octo-org"
    ));
}

#[test]
fn unknown_reference_fails_without_calling_the_api() {
    let fake = FakeGithub::new();
    let report = dispatch(
        PROJECT_CONFIG,
        &EventContext::default(),
        r##"{"type":"create_project_status_update","project":"#aw_000000000000","body":"orphan"}"##,
        &fake,
        BatchOptions::default(),
    );
    let failed = outcome(&report, 0);
    assert_eq!(failed["status"], "failed");
    assert_eq!(failed["code"], "E_TEMPORARY_ID_UNRESOLVED");
    assert!(status_updates(&fake).is_empty());
}

#[test]
fn staged_runs_leave_references_unresolved() {
    let fake = FakeGithub::new();
    let input = lines(&[
        json!({"type": "create_project", "title": "Roadmap", "temporary_id": "aw_abcdef012345"}),
        json!({"type": "create_project_status_update", "project": "#aw_abcdef012345", "body": "Kicked off"}),
    ]);
    let report = dispatch(
        PROJECT_CONFIG,
        &EventContext::default(),
        &input,
        &fake,
        BatchOptions {
            staged: true,
            ..BatchOptions::default()
        },
    );
    assert!(fake.calls().is_empty());
    assert!(report.temporary_ids.is_empty());
    assert!(outcome(&report, 1)["preview"]
        .as_str()
        .is_some_and(|preview| preview.contains("#aw_abcdef012345")));
}

#[test]
fn issue_references_in_later_bodies_are_rewritten() {
    let fake = FakeGithub::new();
    let config = "default_repo: acme/widgets
footer: false
types:
  create_issue: {max: 2}
";
    let input = lines(&[
        json!({"type": "create_issue", "title": "Parent", "body": "tracking", "temporary_id": "aw_111111111111"}),
        json!({"type": "create_issue", "title": "Child", "body": "Part of #aw_111111111111, see #aw_999999999999"}),
    ]);
    dispatch(
        config,
        &EventContext::default(),
        &input,
        &fake,
        BatchOptions::default(),
    );
    let bodies: Vec<String> = fake
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::CreateIssue { issue, .. } => Some(issue.body),
            _ => None,
        })
        .collect();
    assert_eq!(bodies, vec!["tracking", "Part of #100, see #aw_999999999999"]);
}

#[test]
fn references_to_other_repositories_keep_the_slug() {
    let mut ids = TemporaryIdMap::new();
    let id = TemporaryId::parse("aw_222222222222").expect("id");
    ids.insert(
        id.clone(),
        ResolvedEntity {
            repo: RepoSlug::parse("acme/docs").expect("slug"),
            number: Some(8),
            project_url: None,
        },
    )
    .expect("insert");
    let current = RepoSlug::parse("acme/widgets").expect("slug");
    assert_eq!(
        ids.replace_references("see #aw_222222222222.", &current),
        "see acme/docs#8."
    );
    assert!(ids
        .insert(
            id,
            ResolvedEntity {
                repo: current,
                number: Some(9),
                project_url: None,
            },
        )
        .is_err());
}
