//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Failures reported by a storage backend.
///
/// A missing key is not an error; `get` reports it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend failed on {key}: {message}")]
    Backend { key: String, message: String },

    #[cfg(feature = "duckdb")]
    #[error("database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("storage lock poisoned")]
    Poisoned,
}
