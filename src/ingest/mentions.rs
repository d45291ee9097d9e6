use crate::context::EventContext;
use crate::github::IssueAuthorLookup;
use crate::outputs::OutputType;
use crate::shared::logging::BatchLog;
use crate::targeting::{parse_item_number, RepoResolver};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Case-insensitive set of usernames (or `org/team` handles).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionSet(BTreeSet<String>);

impl MentionSet {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for name in names {
            set.insert(name.as_ref());
        }
        set
    }

    /// Returns false for blank names and names already present.
    pub fn insert(&mut self, name: &str) -> bool {
        let normalized = name.trim().trim_start_matches('@').to_ascii_lowercase();
        if normalized.is_empty() {
            return false;
        }
        self.0.insert(normalized)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0
            .contains(&name.trim().trim_start_matches('@').to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn is_automation_account(login: &str) -> bool {
    login.trim().to_ascii_lowercase().ends_with("[bot]")
}

/// Computes which usernames sanitized text may @-mention. Starts from configuration and
/// grows as records reference existing issues whose authors can be looked up.
pub struct MentionResolver<'a> {
    allowed: MentionSet,
    lookup: Option<&'a dyn IssueAuthorLookup>,
    looked_up: BTreeSet<(String, u64)>,
}

impl<'a> MentionResolver<'a> {
    pub fn new<S: AsRef<str>>(configured: &[S]) -> Self {
        Self {
            allowed: MentionSet::from_names(configured),
            lookup: None,
            looked_up: BTreeSet::new(),
        }
    }

    /// Pre-allows the triggering actor and the authors of the triggering issue or pull
    /// request, skipping automation accounts.
    pub fn with_context(mut self, context: &EventContext) -> Self {
        let candidates = [
            context.actor.as_deref(),
            context.issue.as_ref().and_then(|issue| issue.author.as_deref()),
            context
                .pull_request
                .as_ref()
                .and_then(|pr| pr.author.as_deref()),
        ];
        for login in candidates.into_iter().flatten() {
            if !is_automation_account(login) {
                self.allowed.insert(login);
            }
        }
        self
    }

    pub fn with_lookup(mut self, lookup: &'a dyn IssueAuthorLookup) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn allowed(&self) -> &MentionSet {
        &self.allowed
    }

    /// Called before a record's own sanitization. Lookup failures leave the set unchanged.
    pub fn observe(
        &mut self,
        output_type: OutputType,
        fields: &Map<String, Value>,
        repos: &RepoResolver,
        log: &BatchLog,
    ) {
        let Some(lookup) = self.lookup else {
            return;
        };
        let Some(kind) = output_type.target_kind() else {
            return;
        };
        let Some(number) = fields.get(kind.number_field()).and_then(parse_item_number) else {
            return;
        };
        let requested = fields.get("repo").and_then(Value::as_str);
        let Ok(repo) = repos.resolve(requested) else {
            return;
        };
        if !self.looked_up.insert((repo.full_name(), number)) {
            return;
        }

        match lookup.lookup_issue_author(&repo, number) {
            Ok(Some(author)) if author.is_bot || is_automation_account(&author.login) => {
                log.info(
                    "mentions.skip_bot",
                    &format!("skipping automation author `{}` of {repo}#{number}", author.login),
                );
            }
            Ok(Some(author)) => {
                if self.allowed.insert(&author.login) {
                    log.info(
                        "mentions.allow",
                        &format!("allowing mentions of `{}`, author of {repo}#{number}", author.login),
                    );
                }
            }
            Ok(None) => {}
            Err(err) => {
                log.warn(
                    "mentions.lookup_failed",
                    &format!("author lookup for {repo}#{number} failed: {err}"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::IssueContext;
    use crate::github::{GithubError, IssueAuthor};
    use crate::targeting::RepoSlug;
    use serde_json::json;
    use std::cell::RefCell;

    struct StubLookup {
        calls: RefCell<Vec<(String, u64)>>,
    }

    impl IssueAuthorLookup for StubLookup {
        fn lookup_issue_author(
            &self,
            repo: &RepoSlug,
            number: u64,
        ) -> Result<Option<IssueAuthor>, GithubError> {
            self.calls.borrow_mut().push((repo.full_name(), number));
            match number {
                1 => Ok(Some(IssueAuthor {
                    login: "Dana".to_string(),
                    is_bot: false,
                })),
                2 => Ok(Some(IssueAuthor {
                    login: "renovate[bot]".to_string(),
                    is_bot: true,
                })),
                _ => Err(GithubError::Request("boom".to_string())),
            }
        }
    }

    fn repos() -> RepoResolver {
        RepoResolver::new(RepoSlug::parse("acme/widgets").expect("slug"), Vec::new())
    }

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn mention_set_is_case_insensitive() {
        let set = MentionSet::from_names(["@Octocat"]);
        assert!(set.contains("octocat"));
        assert!(set.contains("OCTOCAT"));
        assert!(!set.contains("other"));
    }

    #[test]
    fn context_participants_are_preallowed_except_bots() {
        let context = EventContext {
            actor: Some("github-actions[bot]".to_string()),
            issue: Some(IssueContext {
                number: 3,
                author: Some("reporter".to_string()),
            }),
            ..EventContext::default()
        };
        let resolver = MentionResolver::new(&["maintainer"]).with_context(&context);
        assert!(resolver.allowed().contains("reporter"));
        assert!(resolver.allowed().contains("maintainer"));
        assert!(!resolver.allowed().contains("github-actions[bot]"));
    }

    #[test]
    fn observe_grows_set_once_per_issue_and_skips_bots_and_failures() {
        let lookup = StubLookup {
            calls: RefCell::new(Vec::new()),
        };
        let log = BatchLog::default();
        let repos = repos();
        let mut resolver = MentionResolver::new::<&str>(&[]).with_lookup(&lookup);

        resolver.observe(OutputType::AddComment, &fields(json!({"item_number": 1})), &repos, &log);
        resolver.observe(OutputType::AddComment, &fields(json!({"item_number": 1})), &repos, &log);
        resolver.observe(OutputType::AddLabels, &fields(json!({"item_number": 2})), &repos, &log);
        resolver.observe(OutputType::AddComment, &fields(json!({"item_number": 9})), &repos, &log);
        resolver.observe(OutputType::Noop, &fields(json!({"item_number": 5})), &repos, &log);

        assert!(resolver.allowed().contains("dana"));
        assert_eq!(resolver.allowed().len(), 1);
        assert_eq!(
            lookup.calls.borrow().as_slice(),
            &[
                ("acme/widgets".to_string(), 1),
                ("acme/widgets".to_string(), 2),
                ("acme/widgets".to_string(), 9),
            ]
        );
    }

    #[test]
    fn observe_skips_disallowed_repositories() {
        let lookup = StubLookup {
            calls: RefCell::new(Vec::new()),
        };
        let mut resolver = MentionResolver::new::<&str>(&[]).with_lookup(&lookup);
        resolver.observe(
            OutputType::AddComment,
            &fields(json!({"item_number": 1, "repo": "evil/repo"})),
            &repos(),
            &BatchLog::default(),
        );
        assert!(lookup.calls.borrow().is_empty());
    }
}
