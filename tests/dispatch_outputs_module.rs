mod support;

use safe_outputs::batch::BatchOptions;
use safe_outputs::context::{EventContext, IssueContext};
use serde_json::json;
use support::{dispatch, lines, outcome, Call, FakeGithub};

fn issue_context() -> EventContext {
    EventContext {
        repo: Some("acme/widgets".to_string()),
        issue: Some(IssueContext {
            number: 12,
            author: Some("dana".to_string()),
        }),
        run_id: Some(77),
        workflow_name: Some("triage".to_string()),
        default_branch: Some("trunk".to_string()),
        ..EventContext::default()
    }
}

#[test]
fn created_issue_gets_prefix_labels_and_footer() {
    let fake = FakeGithub::new();
    let yaml = "types:
  create_issue:
    title_prefix: \"[bot] \"
    labels: [automation]
";
    dispatch(
        yaml,
        &issue_context(),
        r#"{"type":"create_issue","title":"Flaky test","body":"Seen twice","labels":["ci","automation"],"assignees":["dana"]}"#,
        &fake,
        BatchOptions::default(),
    );
    let Some(Call::CreateIssue { repo, issue }) = fake.calls().into_iter().next() else {
        panic!("expected create_issue");
    };
    assert_eq!(repo, "acme/widgets");
    assert_eq!(issue.title, "[bot] Flaky test");
    assert_eq!(issue.labels, vec!["automation", "ci"]);
    assert_eq!(issue.assignees, vec!["dana"]);
    assert_eq!(
        issue.body,
        "Seen twice\n\n> Generated by [triage](https://github.com/acme/widgets/actions/runs/77)"
    );
}

#[test]
fn assignees_must_be_mentionable() {
    let fake = FakeGithub::new();
    let report = dispatch(
        "types:\n  create_issue: {}\n",
        &issue_context(),
        r#"{"type":"create_issue","title":"t","body":"b","assignees":["eve"]}"#,
        &fake,
        BatchOptions::default(),
    );
    assert!(report.items.is_empty());
    assert!(report.errors[0].starts_with("line 1: E_MENTION_NOT_ALLOWED"));
    assert!(fake.calls().is_empty());
}

#[test]
fn labels_are_added_to_the_triggering_issue() {
    let fake = FakeGithub::new();
    let report = dispatch(
        "types:\n  add_labels: {max: 10, allowed: [bug, triage]}\n",
        &issue_context(),
        r#"{"type":"add_labels","labels":["bug","bug","wontfix","triage"]}"#,
        &fake,
        BatchOptions::default(),
    );
    assert_eq!(outcome(&report, 0)["status"], "updated");
    assert_eq!(
        fake.calls(),
        vec![Call::AddLabels {
            repo: "acme/widgets".to_string(),
            number: 12,
            labels: vec!["bug".to_string(), "triage".to_string()],
        }]
    );
}

#[test]
fn update_issue_needs_a_change_and_sends_state() {
    let fake = FakeGithub::new();
    let input = lines(&[
        json!({"type": "update_issue"}),
        json!({"type": "update_issue", "status": "closed", "title": "Resolved"}),
    ]);
    let report = dispatch(
        "types:\n  update_issue: {max: 2}\n",
        &issue_context(),
        &input,
        &fake,
        BatchOptions::default(),
    );
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("line 1: E_VALIDATION"));
    let Some(Call::UpdateIssue { number, patch, .. }) = fake.calls().into_iter().next() else {
        panic!("expected update_issue");
    };
    assert_eq!(number, 12);
    assert_eq!(patch.state, Some("closed"));
    assert_eq!(patch.title.as_deref(), Some("Resolved"));
}

#[test]
fn pull_request_needs_an_attachable_patch() {
    let fake = FakeGithub::new();
    let record = r#"{"type":"create_pull_request","title":"Fix typo","body":"One word"}"#;
    let report = dispatch(
        "types:\n  create_pull_request: {}\n",
        &issue_context(),
        record,
        &fake,
        BatchOptions::default(),
    );
    let failed = outcome(&report, 0);
    assert_eq!(failed["code"], "E_PATCH_MISSING");
    assert!(fake.calls().is_empty());

    let report = dispatch(
        "types:\n  create_pull_request: {draft: false, labels: [docs]}\n",
        &issue_context(),
        record,
        &fake,
        BatchOptions {
            has_patch: true,
            ..BatchOptions::default()
        },
    );
    assert_eq!(outcome(&report, 0)["status"], "created");
    let Some(Call::CreatePullRequest { pull_request, .. }) = fake.calls().into_iter().next() else {
        panic!("expected create_pull_request");
    };
    assert_eq!(pull_request.head, "safe-outputs/run-77");
    assert_eq!(pull_request.base, "trunk");
    assert!(!pull_request.draft);
    assert_eq!(pull_request.labels, vec!["docs"]);
}

#[test]
fn discussion_category_falls_back_to_config() {
    let fake = FakeGithub::new();
    dispatch(
        "types:\n  create_discussion: {category: Announcements}\n",
        &issue_context(),
        r#"{"type":"create_discussion","title":"Release notes","body":"Shipped"}"#,
        &fake,
        BatchOptions::default(),
    );
    let Some(Call::CreateDiscussion { discussion, .. }) = fake.calls().into_iter().next() else {
        panic!("expected create_discussion");
    };
    assert_eq!(discussion.category.as_deref(), Some("Announcements"));
}

#[test]
fn release_notes_are_appended() {
    let fake = FakeGithub::new().with_release_body("Initial notes");
    let report = dispatch(
        "footer: false\ntypes:\n  update_release: {}\n",
        &issue_context(),
        r#"{"type":"update_release","tag":"v1.2.0","operation":"append","body":"Extra fix"}"#,
        &fake,
        BatchOptions::default(),
    );
    assert_eq!(outcome(&report, 0)["status"], "updated");
    let Some(Call::UpdateReleaseBody { release_id, body, .. }) = fake
        .calls()
        .into_iter()
        .find(|call| matches!(call, Call::UpdateReleaseBody { .. }))
    else {
        panic!("expected update_release_body");
    };
    assert_eq!(release_id, 7);
    assert_eq!(body, "Initial notes\n\nExtra fix");
}

#[test]
fn release_without_tag_outside_release_event_is_unresolved() {
    let fake = FakeGithub::new();
    let report = dispatch(
        "types:\n  update_release: {}\n",
        &issue_context(),
        r#"{"type":"update_release","operation":"replace","body":"New"}"#,
        &fake,
        BatchOptions::default(),
    );
    assert_eq!(outcome(&report, 0)["code"], "E_TARGET_UNRESOLVED");
    assert!(fake.calls().is_empty());
}

#[test]
fn disallowed_repository_fails_only_that_record() {
    let fake = FakeGithub::new();
    let input = lines(&[
        json!({"type": "create_issue", "title": "Elsewhere", "body": "x", "repo": "other/widgets"}),
        json!({"type": "create_issue", "title": "Sibling", "body": "y", "repo": "gh-tools"}),
    ]);
    let report = dispatch(
        "allowed_repos: [\"acme/gh-*\"]\ntypes:\n  create_issue: {max: 2}\n",
        &issue_context(),
        &input,
        &fake,
        BatchOptions::default(),
    );
    let rejected = outcome(&report, 0);
    assert_eq!(rejected["code"], "E_REPO_NOT_ALLOWED");
    assert!(rejected["error"]
        .as_str()
        .is_some_and(|error| error.contains("acme/gh-*")));
    let created = outcome(&report, 1);
    assert_eq!(created["status"], "created");
    assert_eq!(created["repo"], "acme/gh-tools");
}

#[test]
fn reporting_types_make_no_calls() {
    let fake = FakeGithub::new();
    let input = lines(&[
        json!({"type": "noop", "message": "Nothing to do"}),
        json!({"type": "missing_tool", "tool": "terraform", "reason": "not installed", "alternatives": "tofu"}),
    ]);
    let report = dispatch(
        "types:\n  noop: {}\n  missing_tool: {}\n",
        &issue_context(),
        &input,
        &fake,
        BatchOptions::default(),
    );
    assert_eq!(outcome(&report, 0)["message"], "Nothing to do");
    assert_eq!(
        outcome(&report, 1)["message"],
        "missing tool `terraform`: not installed (alternatives: tofu)"
    );
    assert!(fake.calls().is_empty());
    assert!(report.is_success());
}

#[test]
fn triggering_target_outside_an_issue_is_skipped() {
    let fake = FakeGithub::new();
    let context = EventContext {
        repo: Some("acme/widgets".to_string()),
        ..EventContext::default()
    };
    let report = dispatch(
        "types:\n  add_comment: {}\n",
        &context,
        r#"{"type":"add_comment","body":"hello"}"#,
        &fake,
        BatchOptions::default(),
    );
    assert_eq!(outcome(&report, 0)["status"], "skipped");
    assert!(report.is_success());
    assert!(fake.calls().is_empty());
}
