//! Error types for sync table operations.

use tablesync_core::ValidationError;
use tablesync_sqlite::StoreError;
use thiserror::Error;

/// Errors that can occur during sync table operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Malformed input, such as an invalid table name or a record without
    /// an id.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The local store rejected the operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Insert of a record whose id already exists.
    #[error("record {id} already exists in table '{table}'")]
    DuplicateId { table: String, id: String },

    /// Update of a record whose id does not exist.
    #[error("record {id} not found in table '{table}'")]
    NotFound { table: String, id: String },

    /// A query built for one table was read through another.
    #[error("query targets table '{actual}', expected '{expected}'")]
    TableMismatch { expected: String, actual: String },
}

/// Convenience alias for results with [`SyncError`].
pub type Result<T> = std::result::Result<T, SyncError>;
