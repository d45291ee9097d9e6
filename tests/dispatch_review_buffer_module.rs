mod support;

use safe_outputs::batch::BatchOptions;
use safe_outputs::context::{EventContext, PullRequestContext};
use safe_outputs::dispatch::{ReviewBuffer, ReviewContext, ReviewMetadata, ReviewState};
use safe_outputs::github::ReviewCommentPayload;
use safe_outputs::outputs::ReviewEvent;
use safe_outputs::targeting::RepoSlug;
use serde_json::json;
use support::{dispatch, lines, outcome, Call, FakeGithub};

const REVIEW_CONFIG: &str = "default_repo: acme/widgets
types:
  create_pull_request_review_comment: {max: 5}
  submit_pull_request_review: {}
";

fn pull_request_context(head_sha: Option<&str>) -> EventContext {
    EventContext {
        repo: Some("acme/widgets".to_string()),
        pull_request: Some(PullRequestContext {
            number: 4,
            head_sha: head_sha.map(str::to_string),
            author: None,
        }),
        ..EventContext::default()
    }
}

fn is_review(call: &Call) -> bool {
    matches!(call, Call::CreateReview { .. })
}

#[test]
fn three_comments_and_metadata_become_one_review() {
    let fake = FakeGithub::new();
    let input = lines(&[
        json!({"type": "create_pull_request_review_comment", "path": "src/a.rs", "line": 3, "body": "nit"}),
        json!({"type": "create_pull_request_review_comment", "path": "src/b.rs", "line": 9, "start_line": 5, "body": "range"}),
        json!({"type": "submit_pull_request_review", "body": "Looks good overall", "event": "APPROVE"}),
        json!({"type": "create_pull_request_review_comment", "path": "src/c.rs", "line": 1, "side": "LEFT", "body": "removed"}),
    ]);
    let report = dispatch(
        REVIEW_CONFIG,
        &pull_request_context(Some("abc123")),
        &input,
        &fake,
        BatchOptions::default(),
    );

    assert_eq!(fake.count(is_review), 1);
    assert_eq!(fake.count(|call| matches!(call, Call::PullRequestHeadSha { .. })), 0);
    let Some(Call::CreateReview {
        repo,
        number,
        review,
    }) = fake.calls().into_iter().find(is_review)
    else {
        panic!("expected a review call");
    };
    assert_eq!(repo, "acme/widgets");
    assert_eq!(number, 4);
    assert_eq!(review.commit_id, "abc123");
    assert_eq!(review.event, ReviewEvent::Approve);
    assert_eq!(review.comments.len(), 3);
    assert_eq!(review.comments[1].start_line, Some(5));
    assert!(review.body.starts_with("Looks good overall\n\n> Generated by"));

    assert_eq!(report.results.len(), 5);
    for index in 0..4 {
        assert_eq!(outcome(&report, index)["status"], "buffered");
    }
    let submitted = outcome(&report, 4);
    assert_eq!(submitted["status"], "created");
    assert_eq!(submitted["line"], 3);
    assert_eq!(submitted["type"], "submit_pull_request_review");
}

#[test]
fn empty_buffer_submits_nothing() {
    let fake = FakeGithub::new();
    let mut buffer = ReviewBuffer::new();
    assert_eq!(buffer.submit(&fake).expect("submit"), None);
    assert!(fake.calls().is_empty());
    assert_eq!(buffer.state(), ReviewState::Empty);
}

#[test]
fn buffer_submits_once_and_then_refuses_more_comments() {
    let fake = FakeGithub::new();
    let mut buffer = ReviewBuffer::new();
    buffer
        .set_context(ReviewContext {
            repo: RepoSlug::parse("acme/widgets").expect("slug"),
            pull_request_number: 4,
            head_sha: Some("abc123".to_string()),
        })
        .expect("bind");
    for line in 1..=3 {
        buffer
            .add_comment(ReviewCommentPayload::single_line("src/a.rs", line, "note"))
            .expect("add");
    }
    buffer
        .set_metadata(ReviewMetadata {
            body: Some("summary".to_string()),
            event: ReviewEvent::RequestChanges,
        })
        .expect("metadata");

    let created = buffer.submit(&fake).expect("submit").expect("created");
    assert!(created.url.contains("pullrequestreview"));
    assert_eq!(buffer.state(), ReviewState::Submitted);
    assert_eq!(fake.count(is_review), 1);

    assert!(buffer
        .add_comment(ReviewCommentPayload::single_line("src/a.rs", 4, "late"))
        .is_err());
}

#[test]
fn head_sha_is_fetched_once_when_the_event_lacks_it() {
    let fake = FakeGithub::new();
    let input = lines(&[
        json!({"type": "create_pull_request_review_comment", "path": "a.rs", "line": 1, "body": "one"}),
        json!({"type": "create_pull_request_review_comment", "path": "a.rs", "line": 2, "body": "two"}),
    ]);
    dispatch(
        REVIEW_CONFIG,
        &pull_request_context(None),
        &input,
        &fake,
        BatchOptions::default(),
    );
    assert_eq!(fake.count(|call| matches!(call, Call::PullRequestHeadSha { .. })), 1);
    let Some(Call::CreateReview { review, .. }) = fake.calls().into_iter().find(is_review) else {
        panic!("expected a review call");
    };
    assert_eq!(review.commit_id, "feedface");
    assert_eq!(review.event, ReviewEvent::Comment);
}

#[test]
fn comments_for_a_second_pull_request_are_rejected() {
    let fake = FakeGithub::new();
    let config = "default_repo: acme/widgets
types:
  create_pull_request_review_comment: {max: 5, target: \"*\"}
";
    let input = lines(&[
        json!({"type": "create_pull_request_review_comment", "pull_request_number": 4, "path": "a.rs", "line": 1, "body": "one"}),
        json!({"type": "create_pull_request_review_comment", "pull_request_number": 5, "path": "a.rs", "line": 1, "body": "other"}),
    ]);
    let report = dispatch(
        config,
        &EventContext::default(),
        &input,
        &fake,
        BatchOptions::default(),
    );

    let rejected = outcome(&report, 1);
    assert_eq!(rejected["status"], "failed");
    assert_eq!(rejected["code"], "E_REVIEW_CONTEXT");
    assert_eq!(
        fake.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::PullRequestHeadSha { .. }))
            .collect::<Vec<_>>(),
        vec![Call::PullRequestHeadSha {
            repo: "acme/widgets".to_string(),
            number: 4,
        }]
    );
    assert!(rejected["error"]
        .as_str()
        .is_some_and(|error| error.contains("acme/widgets#4")));

    let Some(Call::CreateReview { number, review, .. }) = fake.calls().into_iter().find(is_review)
    else {
        panic!("expected a review call");
    };
    assert_eq!(number, 4);
    assert_eq!(review.comments.len(), 1);
}

#[test]
fn review_outside_a_pull_request_run_is_skipped() {
    let fake = FakeGithub::new();
    let report = dispatch(
        REVIEW_CONFIG,
        &EventContext::default(),
        r#"{"type":"create_pull_request_review_comment","path":"a.rs","line":1,"body":"x"}"#,
        &fake,
        BatchOptions::default(),
    );
    assert_eq!(outcome(&report, 0)["status"], "skipped");
    assert_eq!(report.results.len(), 1);
    assert!(fake.calls().is_empty());
}

#[test]
fn staged_review_is_previewed_without_calls() {
    let fake = FakeGithub::new();
    let input = lines(&[
        json!({"type": "create_pull_request_review_comment", "path": "a.rs", "line": 1, "body": "one"}),
        json!({"type": "submit_pull_request_review", "event": "COMMENT"}),
    ]);
    let report = dispatch(
        REVIEW_CONFIG,
        &pull_request_context(None),
        &input,
        &fake,
        BatchOptions {
            staged: true,
            ..BatchOptions::default()
        },
    );
    assert!(fake.calls().is_empty(), "{:?}", fake.calls());
    let preview = outcome(&report, 2);
    assert_eq!(preview["status"], "staged");
    assert!(preview["preview"]
        .as_str()
        .is_some_and(|text| text.contains("1 comment(s) on acme/widgets#4")));
}

#[test]
fn invalid_comment_ranges_are_rejected_at_validation() {
    let fake = FakeGithub::new();
    let report = dispatch(
        REVIEW_CONFIG,
        &pull_request_context(Some("abc123")),
        r#"{"type":"create_pull_request_review_comment","path":"a.rs","line":3,"start_line":8,"body":"x"}"#,
        &fake,
        BatchOptions::default(),
    );
    assert!(report.items.is_empty());
    assert!(report.errors[0].starts_with("line 1: E_VALIDATION"));
    assert!(fake.calls().is_empty());
}
