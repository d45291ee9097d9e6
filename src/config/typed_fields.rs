use crate::shared::serde_ext::{parse_via_string, parse_via_string_or_number, serialize_display};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// How a targeted record decides which issue or pull request it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetMode {
    /// The issue or pull request that triggered the run.
    #[default]
    Triggering,
    /// A fixed number from configuration.
    Explicit(u64),
    /// The record names its own target.
    Any,
}

impl TargetMode {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim() {
            "triggering" | "" => Ok(Self::Triggering),
            "*" => Ok(Self::Any),
            other => other
                .trim_start_matches('#')
                .parse::<u64>()
                .ok()
                .filter(|number| *number > 0)
                .map(Self::Explicit)
                .ok_or_else(|| {
                    "target must be `triggering`, `*` or a positive issue/pull request number"
                        .to_string()
                }),
        }
    }
}

impl std::fmt::Display for TargetMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetMode::Triggering => f.write_str("triggering"),
            TargetMode::Explicit(number) => write!(f, "{number}"),
            TargetMode::Any => f.write_str("*"),
        }
    }
}

impl Serialize for TargetMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serialize_display(self, serializer)
    }
}

impl<'de> Deserialize<'de> for TargetMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        parse_via_string_or_number(deserializer, "target", Self::parse)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SegmentPattern {
    Any,
    Exact(String),
    Prefix(String),
}

impl SegmentPattern {
    fn matches(&self, candidate: &str) -> bool {
        match self {
            SegmentPattern::Any => true,
            SegmentPattern::Exact(exact) => candidate == exact,
            SegmentPattern::Prefix(prefix) => candidate.starts_with(prefix.as_str()),
        }
    }
}

/// One entry of a repository allow-list: `owner/repo`, `*`, `owner/*`, `*/repo`
/// or `owner/prefix-*`. Matching is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoPattern {
    raw: String,
    owner: SegmentPattern,
    repo: SegmentPattern,
}

impl RepoPattern {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed == "*" {
            return Ok(Self {
                raw: trimmed.to_string(),
                owner: SegmentPattern::Any,
                repo: SegmentPattern::Any,
            });
        }
        let Some((owner, repo)) = trimmed.split_once('/') else {
            return Err(format!(
                "repository pattern `{trimmed}` must be `owner/repo`, `*`, `owner/*`, `*/repo` or `owner/prefix-*`"
            ));
        };
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return Err(format!(
                "repository pattern `{trimmed}` must contain exactly one `/` between non-empty owner and repo"
            ));
        }
        let owner = match owner {
            "*" => SegmentPattern::Any,
            other if other.contains('*') => {
                return Err(format!(
                    "repository pattern `{trimmed}` may only use `*` as the whole owner"
                ))
            }
            other => SegmentPattern::Exact(other.to_string()),
        };
        let repo = match repo {
            "*" => SegmentPattern::Any,
            other => match other.strip_suffix('*') {
                Some(prefix) if !prefix.contains('*') => {
                    if matches!(owner, SegmentPattern::Any) {
                        return Err(format!(
                            "repository pattern `{trimmed}` cannot combine a wildcard owner with a prefix"
                        ));
                    }
                    SegmentPattern::Prefix(prefix.to_string())
                }
                Some(_) => {
                    return Err(format!(
                        "repository pattern `{trimmed}` may only use `*` at the end of the repo name"
                    ))
                }
                None if other.contains('*') => {
                    return Err(format!(
                        "repository pattern `{trimmed}` may only use `*` at the end of the repo name"
                    ))
                }
                None => SegmentPattern::Exact(other.to_string()),
            },
        };
        Ok(Self {
            raw: trimmed.to_string(),
            owner,
            repo,
        })
    }

    /// `slug` must already be qualified as `owner/repo`.
    pub fn matches(&self, slug: &str) -> bool {
        let Some((owner, repo)) = slug.split_once('/') else {
            return false;
        };
        self.owner.matches(owner) && self.repo.matches(repo)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for RepoPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.raw.fmt(f)
    }
}

impl Serialize for RepoPattern {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for RepoPattern {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        parse_via_string(deserializer, "repository pattern", Self::parse)
    }
}
