use crate::shared::serde_ext::parse_via_string;
use serde::{Deserialize, Deserializer, Serialize};

pub const TEMPORARY_ID_PREFIX: &str = "aw_";
pub const TEMPORARY_ID_HEX_LEN: usize = 12;

/// Placeholder for an entity that is created later in the same batch:
/// `aw_` followed by 12 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TemporaryId(String);

impl TemporaryId {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let normalized = raw.trim().to_ascii_lowercase();
        let Some(hex) = normalized.strip_prefix(TEMPORARY_ID_PREFIX) else {
            return Err(format!(
                "temporary id must start with `{TEMPORARY_ID_PREFIX}`, e.g. `aw_0123456789ab`"
            ));
        };
        if hex.len() != TEMPORARY_ID_HEX_LEN || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(format!(
                "temporary id must be `{TEMPORARY_ID_PREFIX}` followed by {TEMPORARY_ID_HEX_LEN} hex characters"
            ));
        }
        Ok(Self(normalized))
    }

    /// Accepts `#aw_...` as well as a bare `aw_...`.
    pub fn parse_reference(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let candidate = trimmed.strip_prefix('#').unwrap_or(trimmed);
        Self::parse(candidate).ok()
    }

    pub fn mint() -> Result<Self, String> {
        let mut bytes = [0_u8; TEMPORARY_ID_HEX_LEN / 2];
        getrandom::getrandom(&mut bytes)
            .map_err(|err| format!("failed to generate temporary id randomness: {err}"))?;
        let hex: String = bytes.iter().map(|byte| format!("{byte:02x}")).collect();
        Ok(Self(format!("{TEMPORARY_ID_PREFIX}{hex}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TemporaryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::borrow::Borrow<str> for TemporaryId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl<'de> Deserialize<'de> for TemporaryId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        parse_via_string(deserializer, "temporary id", Self::parse)
    }
}
