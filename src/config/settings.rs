use super::{ConfigError, FieldSchema, RepoPattern, TargetMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

fn default_true() -> bool {
    true
}

/// Batch-level configuration for one agent run.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SafeOutputsConfig {
    /// `owner/repo`; falls back to the event context's repository when absent.
    #[serde(default)]
    pub default_repo: Option<String>,
    #[serde(default)]
    pub allowed_repos: Vec<RepoPattern>,
    #[serde(default)]
    pub allowed_mentions: Vec<String>,
    #[serde(default = "default_true")]
    pub allow_context_mentions: bool,
    /// Cap over all record types combined.
    #[serde(default)]
    pub max: Option<u32>,
    #[serde(default)]
    pub staged: bool,
    #[serde(default = "default_true")]
    pub footer: bool,
    #[serde(default)]
    pub manifest_path: Option<PathBuf>,
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    #[serde(default)]
    pub types: BTreeMap<String, TypeConfig>,
}

/// Per-type options. Only `max`, `min` and `inputs` are interpreted by every type;
/// the rest are read by the types they apply to.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TypeConfig {
    #[serde(default)]
    pub max: Option<u32>,
    #[serde(default)]
    pub min: u32,
    #[serde(default)]
    pub inputs: BTreeMap<String, FieldSchema>,
    #[serde(default)]
    pub target: Option<TargetMode>,
    #[serde(default)]
    pub target_repo: Option<String>,
    #[serde(default)]
    pub allowed_repos: Vec<RepoPattern>,
    /// Allow-list for `add_labels`.
    #[serde(default)]
    pub allowed: Vec<String>,
    /// Labels always attached to created issues and pull requests.
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub title_prefix: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub draft: Option<bool>,
    #[serde(default)]
    pub base_branch: Option<String>,
    #[serde(default)]
    pub footer: Option<bool>,
    #[serde(default)]
    pub staged: Option<bool>,
}

impl SafeOutputsConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        super::validate::validate_config(self)
    }
}
