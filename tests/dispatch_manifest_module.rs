mod support;

use safe_outputs::batch::{process_batch, BatchError, BatchOptions, BatchServices};
use safe_outputs::context::{EventContext, IssueContext};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use support::{config, dispatch, lines, outcome, Call, FakeGithub};
use tempfile::tempdir;

fn manifest_config(path: &Path, types: &str) -> String {
    format!(
        "default_repo: acme/widgets\nmanifest_path: {}\ntypes:\n{types}",
        path.display()
    )
}

fn manifest_lines(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .expect("read manifest")
        .lines()
        .map(|line| serde_json::from_str(line).expect("manifest json"))
        .collect()
}

fn issue_context() -> EventContext {
    EventContext {
        repo: Some("acme/widgets".to_string()),
        issue: Some(IssueContext {
            number: 12,
            author: None,
        }),
        ..EventContext::default()
    }
}

#[test]
fn staged_create_issue_never_writes_an_entry() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("manifest.jsonl");
    let fake = FakeGithub::new();
    let report = dispatch(
        &manifest_config(&path, "  create_issue: {}\n"),
        &issue_context(),
        r#"{"type":"create_issue","title":"Preview","body":"only a preview"}"#,
        &fake,
        BatchOptions {
            staged: true,
            ..BatchOptions::default()
        },
    );
    assert!(report.staged);
    assert_eq!(outcome(&report, 0)["status"], "staged");
    assert!(fake.calls().is_empty());
    assert!(manifest_lines(&path).is_empty());
}

#[test]
fn real_create_issue_writes_exactly_one_entry() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("manifest.jsonl");
    let fake = FakeGithub::new();
    let report = dispatch(
        &manifest_config(&path, "  create_issue: {}\n"),
        &issue_context(),
        r#"{"type":"create_issue","title":"Real","body":"created","temporary_id":"aw_0123456789ab"}"#,
        &fake,
        BatchOptions::default(),
    );
    assert_eq!(outcome(&report, 0)["status"], "created");

    let entries = manifest_lines(&path);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["type"], "create_issue");
    assert_eq!(entries[0]["url"], "https://github.com/acme/widgets/issues/100");
    assert_eq!(entries[0]["number"], 100);
    assert_eq!(entries[0]["repo"], "acme/widgets");
    assert_eq!(entries[0]["temporaryId"], "aw_0123456789ab");
    assert!(entries[0]["timestamp"].as_str().is_some());
}

#[test]
fn type_level_staging_only_skips_that_type() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("manifest.jsonl");
    let fake = FakeGithub::new();
    let input = lines(&[
        json!({"type": "create_issue", "title": "Held back", "body": "x"}),
        json!({"type": "add_comment", "body": "posted"}),
    ]);
    let report = dispatch(
        &manifest_config(&path, "  create_issue: {staged: true}\n  add_comment: {}\n"),
        &issue_context(),
        &input,
        &fake,
        BatchOptions::default(),
    );
    assert_eq!(outcome(&report, 0)["status"], "staged");
    assert_eq!(outcome(&report, 1)["status"], "created");
    let entries = manifest_lines(&path);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["type"], "add_comment");
}

#[test]
fn updates_and_failures_are_not_recorded() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("manifest.jsonl");
    let fake = FakeGithub::new().failing("add_comment");
    let input = lines(&[
        json!({"type": "update_issue", "status": "closed"}),
        json!({"type": "add_comment", "body": "will fail"}),
    ]);
    let report = dispatch(
        &manifest_config(&path, "  update_issue: {}\n  add_comment: {}\n"),
        &issue_context(),
        &input,
        &fake,
        BatchOptions::default(),
    );
    assert_eq!(outcome(&report, 0)["status"], "updated");
    let failed = outcome(&report, 1);
    assert_eq!(failed["status"], "failed");
    assert_eq!(failed["code"], "E_API");
    assert!(!report.is_success());
    assert!(manifest_lines(&path).is_empty());
}

#[test]
fn reused_temporary_id_is_refused_before_creating() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("manifest.jsonl");
    let fake = FakeGithub::new();
    let input = lines(&[
        json!({"type": "create_issue", "title": "First", "body": "a", "temporary_id": "aw_111111111111"}),
        json!({"type": "create_issue", "title": "Second", "body": "b", "temporary_id": "aw_111111111111"}),
    ]);
    let report = dispatch(
        &manifest_config(&path, "  create_issue: {max: 2}\n"),
        &issue_context(),
        &input,
        &fake,
        BatchOptions::default(),
    );

    assert_eq!(
        fake.count(|call| matches!(call, Call::CreateIssue { .. })),
        1
    );
    assert_eq!(outcome(&report, 0)["status"], "created");
    let refused = outcome(&report, 1);
    assert_eq!(refused["status"], "failed");
    assert_eq!(refused["code"], "E_TEMPORARY_ID_UNRESOLVED");
    assert!(refused["error"]
        .as_str()
        .is_some_and(|error| error.contains("aw_111111111111")));
    assert_eq!(manifest_lines(&path).len(), 1);
}

#[test]
fn reused_project_temporary_id_makes_one_project() {
    let fake = FakeGithub::new();
    let input = lines(&[
        json!({"type": "create_project", "title": "Roadmap", "temporary_id": "aw_abcdef012345"}),
        json!({"type": "create_project", "title": "Roadmap again", "temporary_id": "aw_abcdef012345"}),
    ]);
    let report = dispatch(
        "default_repo: acme/widgets\ntypes:\n  create_project: {max: 2}\n",
        &issue_context(),
        &input,
        &fake,
        BatchOptions::default(),
    );
    assert_eq!(
        fake.count(|call| matches!(call, Call::CreateProject { .. })),
        1
    );
    assert_eq!(outcome(&report, 1)["status"], "failed");
}

#[test]
fn entries_accumulate_across_batches() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("audit/manifest.jsonl");
    let yaml = manifest_config(&path, "  add_comment: {}\n");
    for body in ["first", "second"] {
        let fake = FakeGithub::new();
        dispatch(
            &yaml,
            &issue_context(),
            &json!({"type": "add_comment", "body": body}).to_string(),
            &fake,
            BatchOptions::default(),
        );
    }
    assert_eq!(manifest_lines(&path).len(), 2);
}

#[test]
fn unwritable_manifest_is_fatal() {
    let temp = tempdir().expect("tempdir");
    let (config, schemas) = config(&manifest_config(temp.path(), "  noop: {}\n"));
    let fake = FakeGithub::new();
    let err = process_batch(
        r#"{"type":"noop","message":"x"}"#,
        &config,
        &schemas,
        &issue_context(),
        BatchOptions {
            dispatch: true,
            ..BatchOptions::default()
        },
        BatchServices {
            api: Some(&fake),
            lookup: None,
        },
    )
    .expect_err("directory is not a manifest file");
    assert!(matches!(err, BatchError::Manifest(_)));
}
