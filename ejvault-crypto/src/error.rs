//! Crypto error types.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors raised by the document encryption primitive and the fingerprint KDF.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("public key not present in document")]
    MissingPublicKey,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid message format: {0}")]
    InvalidMessage(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
