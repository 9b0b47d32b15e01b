//! Error types for local store operations.
//!
//! Every failure of a store operation is returned through this type; nothing
//! is retried, logged or swallowed along the way.

use tablesync_core::ValidationError;
use thiserror::Error;

/// Errors that can occur during local store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Malformed input caught before any statement executed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A row property is not declared in the table's schema.
    #[error("schema error: {0}")]
    Schema(String),

    /// A value cannot be written to a column of the declared type.
    #[error("cannot store {value} of type {kind} in a column of type {target}")]
    UnsupportedConversion {
        value: String,
        kind: &'static str,
        target: &'static str,
    },

    /// A stored value cannot be converted to its declared type on read.
    #[error("cannot deserialize {value} of type {kind} as {target}")]
    Deserialization {
        value: String,
        kind: &'static str,
        target: &'static str,
    },

    /// The operation targets a table that was never defined.
    #[error("table '{0}' is not defined")]
    NotDefined(String),

    /// The database reported a failure; the batch was rolled back.
    #[error("database error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// The database returned a different number of result sets than
    /// statements submitted.
    #[error("expected {expected} result sets, got {actual}")]
    UnexpectedStatementCount { expected: usize, actual: usize },

    /// A blocking store task panicked or was cancelled.
    #[error("store task failed: {0}")]
    TaskFailed(String),
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
