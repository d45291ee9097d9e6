use super::TargetingError;
use crate::config::{RepoPattern, TypeConfig};
use serde::Serialize;

/// A validated `owner/repo` pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
}

impl RepoSlug {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        let Some((owner, repo)) = trimmed.split_once('/') else {
            return Err("must be `owner/repo`".to_string());
        };
        if !valid_segment(owner) || !valid_segment(repo) {
            return Err(
                "owner and repo must be non-empty and use only letters, digits, `-`, `_` or `.`"
                    .to_string(),
            );
        }
        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// True iff any pattern matches the qualified slug.
pub fn is_repo_allowed(slug: &str, patterns: &[RepoPattern]) -> bool {
    patterns.iter().any(|pattern| pattern.matches(slug))
}

/// Resolves a record's optional `repo` override against the default repository and
/// the allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoResolver {
    default_repo: RepoSlug,
    allowed: Vec<RepoPattern>,
}

impl RepoResolver {
    pub fn new(default_repo: RepoSlug, allowed: Vec<RepoPattern>) -> Self {
        Self {
            default_repo,
            allowed,
        }
    }

    /// Narrows the batch-wide resolver with a type's `target_repo` and extra allow-list.
    pub fn for_type(&self, options: &TypeConfig) -> Result<Self, TargetingError> {
        let default_repo = match &options.target_repo {
            Some(target_repo) => {
                RepoSlug::parse(target_repo).map_err(|reason| TargetingError::InvalidRepo {
                    repo: target_repo.clone(),
                    reason,
                })?
            }
            None => self.default_repo.clone(),
        };
        let mut allowed = self.allowed.clone();
        for pattern in &options.allowed_repos {
            if !allowed.contains(pattern) {
                allowed.push(pattern.clone());
            }
        }
        Ok(Self {
            default_repo,
            allowed,
        })
    }

    pub fn default_repo(&self) -> &RepoSlug {
        &self.default_repo
    }

    pub fn allowed(&self) -> &[RepoPattern] {
        &self.allowed
    }

    /// Bare names are qualified with the default repository's owner. Does not consult
    /// the allow-list.
    pub fn qualify(&self, requested: &str) -> Result<RepoSlug, TargetingError> {
        let trimmed = requested.trim();
        let qualified = if trimmed.contains('/') {
            trimmed.to_string()
        } else {
            format!("{}/{}", self.default_repo.owner, trimmed)
        };
        RepoSlug::parse(&qualified).map_err(|reason| TargetingError::InvalidRepo {
            repo: trimmed.to_string(),
            reason,
        })
    }

    pub fn resolve(&self, requested: Option<&str>) -> Result<RepoSlug, TargetingError> {
        let Some(requested) = requested.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return Ok(self.default_repo.clone());
        };
        let slug = self.qualify(requested)?;
        if slug == self.default_repo || is_repo_allowed(&slug.full_name(), &self.allowed) {
            return Ok(slug);
        }
        Err(TargetingError::RepoNotAllowed {
            repo: slug.full_name(),
            default_repo: self.default_repo.full_name(),
            allowed: self.describe_allowed(),
        })
    }

    fn describe_allowed(&self) -> String {
        if self.allowed.is_empty() {
            return "none (only the default repository may be targeted)".to_string();
        }
        self.allowed
            .iter()
            .map(RepoPattern::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
