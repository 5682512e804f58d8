use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("score store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("score record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid score record: {reason}")]
    InvalidRecord { reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
pub type StoreResult<T> = Result<T, StoreError>;
