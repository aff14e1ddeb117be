//! Document lifecycle and secret analysis for ejvault.
//!
//! The engine accepts EJSON documents whose secrets are already encrypted,
//! resolves their recipient through a storage-backed keyring and then:
//!
//! - persists the ciphertext next to a sanitized plaintext copy
//! - rotates documents to a fresh keypair or copies them to another recipient
//! - replaces every secret with a salted scrypt fingerprint for auditing
//!
//! # Example
//!
//! ```no_run
//! use ejvault_engine::{Engine, EngineConfig};
//! use ejvault_storage::MemoryStorage;
//! use std::sync::Arc;
//!
//! # async fn run(document: &str) -> ejvault_engine::EngineResult<()> {
//! let engine = Engine::new(Arc::new(MemoryStorage::new()), EngineConfig::default());
//! let public_key = engine.create_keypair().await?;
//! engine.put_document("app/production", document).await?;
//! let sanitized = engine.read_decrypted("app/production").await?;
//! # let _ = (public_key, sanitized);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod codec;
mod config;
pub mod documents;
mod engine;
mod error;
pub mod gateway;
pub mod keyring;
pub mod rotation;

pub use analysis::Analyzer;
pub use codec::{Document, DocumentInput};
pub use config::{DEFAULT_IDENTITY_SALT, EngineConfig, SaltSource};
pub use documents::DocumentStore;
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use gateway::CryptoGateway;
pub use keyring::Keyring;
pub use rotation::{Rotation, RotationWorkflow};
