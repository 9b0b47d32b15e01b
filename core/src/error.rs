//! Error types for loading and saving store configuration.

use thiserror::Error;

use crate::validate::ValidationError;

/// Errors that can occur while loading or saving a [`StoreConfig`](crate::StoreConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A configured table definition is invalid.
    #[error("invalid table '{table}' in configuration: {error}")]
    InvalidTable {
        table: String,
        error: ValidationError,
    },
}

/// Convenience alias for results with [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;
