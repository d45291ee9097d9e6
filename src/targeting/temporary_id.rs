use super::{RepoSlug, TargetingError};
use crate::shared::ids::{TemporaryId, TEMPORARY_ID_HEX_LEN, TEMPORARY_ID_PREFIX};
use serde::Serialize;
use std::collections::BTreeMap;

/// What a temporary id turned into once its record was dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEntity {
    pub repo: RepoSlug,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_url: Option<String>,
}

/// Write-once map from temporary ids to created entities, owned by one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TemporaryIdMap {
    entries: BTreeMap<TemporaryId, ResolvedEntity>,
}

impl TemporaryIdMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: TemporaryId, entity: ResolvedEntity) -> Result<(), TargetingError> {
        self.ensure_unused(&id)?;
        self.entries.insert(id, entity);
        Ok(())
    }

    /// Fails when `id` already names an entity. Dispatch checks this before creating
    /// anything.
    pub fn ensure_unused(&self, id: &TemporaryId) -> Result<(), TargetingError> {
        if self.entries.contains_key(id) {
            return Err(TargetingError::TemporaryIdConflict(id.to_string()));
        }
        Ok(())
    }

    pub fn get(&self, id: &TemporaryId) -> Option<&ResolvedEntity> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn unresolved(&self, reference: &str) -> TargetingError {
        let known = if self.entries.is_empty() {
            "none".to_string()
        } else {
            self.entries
                .keys()
                .map(TemporaryId::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };
        TargetingError::TemporaryIdUnresolved {
            reference: reference.to_string(),
            known,
        }
    }

    /// A project reference is either a project URL or `#aw_...` minted by an earlier
    /// `create_project` in this batch.
    pub fn resolve_project_reference(&self, reference: &str) -> Result<String, TargetingError> {
        let trimmed = reference.trim();
        if trimmed.starts_with("https://") {
            return Ok(trimmed.to_string());
        }
        let Some(id) = TemporaryId::parse_reference(trimmed) else {
            return Err(TargetingError::TargetUnresolved(format!(
                "project `{trimmed}` must be a project URL or a temporary id reference like `#aw_0123456789ab`"
            )));
        };
        self.get(&id)
            .and_then(|entity| entity.project_url.clone())
            .ok_or_else(|| self.unresolved(trimmed))
    }

    /// Rewrites `#aw_...` references (any case) whose entity has a number to `#123`, or
    /// `owner/repo#123` when the entity lives in another repository. A reference must
    /// not run on into further word characters. Unknown ids are left as written.
    pub fn replace_references(&self, text: &str, current_repo: &RepoSlug) -> String {
        let token_len = 1 + TEMPORARY_ID_PREFIX.len() + TEMPORARY_ID_HEX_LEN;
        let bytes = text.as_bytes();
        let mut output = String::with_capacity(text.len());
        let mut cursor = 0usize;

        while let Some(rel_start) = text[cursor..].find('#') {
            let start = cursor + rel_start;
            output.push_str(&text[cursor..start]);
            let end = start + token_len;
            let replacement = text
                .get(start + 1..end)
                .filter(|candidate| !candidate.starts_with(char::is_whitespace))
                .filter(|_| {
                    !bytes
                        .get(end)
                        .is_some_and(|next| next.is_ascii_alphanumeric() || *next == b'_')
                })
                .and_then(|candidate| TemporaryId::parse(candidate).ok())
                .and_then(|id| self.get(&id))
                .and_then(|entity| {
                    let number = entity.number?;
                    Some(if &entity.repo == current_repo {
                        format!("#{number}")
                    } else {
                        format!("{}#{number}", entity.repo)
                    })
                });
            match replacement {
                Some(replacement) => {
                    output.push_str(&replacement);
                    cursor = end;
                }
                None => {
                    output.push('#');
                    cursor = start + 1;
                }
            }
        }
        output.push_str(&text[cursor..]);
        output
    }
}
