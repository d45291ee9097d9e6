use crate::github::CreatedItem;
use crate::outputs::OutputType;
use crate::shared::ids::TemporaryId;
use crate::targeting::RepoSlug;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to write audit manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode audit manifest entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One item that now exists in the system of record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    #[serde(rename = "type")]
    pub output_type: OutputType,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(rename = "temporaryId", skip_serializing_if = "Option::is_none")]
    pub temporary_id: Option<String>,
    pub timestamp: String,
}

impl ManifestEntry {
    pub fn new(
        output_type: OutputType,
        created: &CreatedItem,
        repo: Option<&RepoSlug>,
        temporary_id: Option<&TemporaryId>,
    ) -> Self {
        Self {
            output_type,
            url: created.url.clone(),
            number: created.number,
            repo: repo.map(RepoSlug::full_name),
            temporary_id: temporary_id.map(|id| id.as_str().to_string()),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Append-only JSON-lines audit log of created items. Staged runs never write entries.
#[derive(Debug, Clone)]
pub struct ManifestWriter {
    path: Option<PathBuf>,
    staged: bool,
}

impl ManifestWriter {
    pub fn new(path: Option<PathBuf>, staged: bool) -> Self {
        Self { path, staged }
    }

    /// A writer that records nothing.
    pub fn disabled() -> Self {
        Self::new(None, false)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn io_error(path: &Path, source: std::io::Error) -> ManifestError {
        ManifestError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    fn open(path: &Path) -> Result<fs::File, ManifestError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| Self::io_error(parent, err))?;
            }
        }
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| Self::io_error(path, err))
    }

    /// Creates the file empty at batch start, leaving existing entries intact.
    pub fn touch(&self) -> Result<(), ManifestError> {
        match &self.path {
            Some(path) => Self::open(path).map(|_| ()),
            None => Ok(()),
        }
    }

    /// Returns whether an entry was written. Entries without a url, and every entry of a
    /// staged run, are dropped.
    pub fn log_created_item(&self, entry: &ManifestEntry) -> Result<bool, ManifestError> {
        let Some(path) = &self.path else {
            return Ok(false);
        };
        if self.staged || entry.url.trim().is_empty() {
            return Ok(false);
        }
        let line = serde_json::to_string(entry)?;
        let mut file = Self::open(path)?;
        writeln!(file, "{line}").map_err(|err| Self::io_error(path, err))?;
        Ok(true)
    }
}
