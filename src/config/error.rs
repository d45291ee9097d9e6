#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid event context in {path}: {source}")]
    Context {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown safe output type `{name}` in configuration; known types: {known}")]
    UnknownType { name: String, known: String },
    #[error("safe output type `{name}` is configured more than once")]
    DuplicateType { name: String },
    #[error("safe output type `{output_type}` field `{field}`: {reason}")]
    Field {
        output_type: String,
        field: String,
        reason: String,
    },
    #[error("safe output type `{output_type}`: {reason}")]
    Type { output_type: String, reason: String },
    #[error("configuration validation failed: {0}")]
    Invalid(String),
}
