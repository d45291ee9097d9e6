use super::{BatchSchemas, ConfigError, SafeOutputsConfig};
use std::path::Path;

/// Reads, validates and resolves a configuration file. Any failure here is batch-fatal.
pub fn load_config(path: &Path) -> Result<(SafeOutputsConfig, BatchSchemas), ConfigError> {
    let config = SafeOutputsConfig::from_path(path)?;
    config.validate()?;
    let schemas = BatchSchemas::from_config(&config)?;
    Ok((config, schemas))
}
