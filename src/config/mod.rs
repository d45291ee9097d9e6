pub mod error;
pub mod load;
pub mod schema;
pub mod settings;
pub mod typed_fields;
pub mod validate;
pub use error::ConfigError;
pub use load::load_config;
pub use schema::{value_kind, BatchSchemas, FieldKind, FieldSchema, TypeSchema, DEFAULT_TYPE_MAX};
pub use settings::{SafeOutputsConfig, TypeConfig};
pub use typed_fields::{RepoPattern, TargetMode};
pub use validate::validate_config;
