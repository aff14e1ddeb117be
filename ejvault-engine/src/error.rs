//! Engine error types.

use ejvault_storage::StorageError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced to the host. Nothing in the engine retries.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unexpected input format: {0}")]
    InvalidInputFormat(String),

    #[error("no private key for recipient {public_key} ({context})")]
    UnknownRecipient { public_key: String, context: String },

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("fingerprinting failed: {0}")]
    HashingFailure(String),

    #[error("no value at {path}")]
    NotFound { path: String },
}
