//! Host-facing entry point.
//!
//! Each method takes already-parsed input and returns a payload or a typed
//! error. Transport, authentication and request routing belong to the host.

use crate::analysis::Analyzer;
use crate::codec::{self, Document, DocumentInput};
use crate::config::{DEFAULT_IDENTITY_SALT, EngineConfig, SaltSource};
use crate::documents::{DocumentStore, validate_path};
use crate::error::{EngineError, EngineResult};
use crate::gateway::CryptoGateway;
use crate::keyring::Keyring;
use crate::rotation::{Rotation, RotationWorkflow};
use ejvault_storage::Storage;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use zeroize::Zeroizing;

/// Document lifecycle and analysis over a single storage backend.
///
/// Holds no state besides the backend and configuration; concurrent calls
/// on the same path see whatever the backend guarantees.
#[derive(Clone)]
pub struct Engine {
    config: EngineConfig,
    keyring: Keyring,
    gateway: CryptoGateway,
    documents: DocumentStore,
    rotation: RotationWorkflow,
}

impl Engine {
    pub fn new(storage: Arc<dyn Storage>, config: EngineConfig) -> Self {
        let keyring = Keyring::new(Arc::clone(&storage));
        let gateway = CryptoGateway::new(keyring.clone());
        Self {
            config,
            rotation: RotationWorkflow::new(gateway.clone(), keyring.clone()),
            documents: DocumentStore::new(storage),
            gateway,
            keyring,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn keyring(&self) -> &Keyring {
        &self.keyring
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    // ── Documents ────────────────────────────────────────────────

    /// Decrypts `input` and persists its ciphertext and sanitized copies at
    /// `path`. Returns the submitted ciphertext document.
    ///
    /// Nothing is written unless decryption and sanitization succeed.
    pub async fn put_document(
        &self,
        path: &str,
        input: impl Into<DocumentInput>,
    ) -> EngineResult<Document> {
        validate_path(path)?;
        let document = input.into().into_document()?;
        let ciphertext = codec::encode(&document)?;

        let plaintext = self.gateway.decrypt(&ciphertext, path).await?;
        let sanitized = codec::sanitize(codec::decode(&plaintext)?)?;
        let sanitized = Zeroizing::new(codec::encode(&sanitized)?);

        self.documents.write(path, &ciphertext, &sanitized).await?;
        Ok(document)
    }

    /// The stored ciphertext document, or `None`.
    pub async fn read(&self, path: &str) -> EngineResult<Option<Document>> {
        self.documents.read(path).await
    }

    /// The stored sanitized document, or `None`.
    pub async fn read_decrypted(&self, path: &str) -> EngineResult<Option<Document>> {
        self.documents.read_decrypted(path).await
    }

    /// Like [`read`](Self::read), but a miss is `NotFound`.
    pub async fn read_required(&self, path: &str) -> EngineResult<Document> {
        self.read(path).await?.ok_or_else(|| EngineError::NotFound {
            path: path.to_string(),
        })
    }

    pub async fn delete(&self, path: &str) -> EngineResult<()> {
        self.documents.delete(path).await
    }

    pub async fn list(&self, prefix: &str) -> EngineResult<Vec<String>> {
        self.documents.list(prefix).await
    }

    pub async fn exists(&self, path: &str) -> EngineResult<bool> {
        self.documents.exists(path).await
    }

    /// Decrypts `input` without persisting or sanitizing it.
    pub async fn decrypt(&self, input: impl Into<DocumentInput>) -> EngineResult<Document> {
        self.decrypt_input(input.into(), "decrypt").await
    }

    // ── Rotation ─────────────────────────────────────────────────

    /// Re-encrypts `input` under a new keypair, which is persisted first.
    pub async fn rotate(&self, input: impl Into<DocumentInput>) -> EngineResult<Rotation> {
        let document = input.into().into_document()?;
        self.rotation.rotate(&document).await
    }

    /// Re-encrypts `input` for an existing recipient.
    pub async fn copy(
        &self,
        input: impl Into<DocumentInput>,
        target_public_key: &str,
    ) -> EngineResult<Document> {
        let document = input.into().into_document()?;
        self.rotation.copy(&document, target_public_key).await
    }

    // ── Analysis ─────────────────────────────────────────────────

    /// Decrypts `input` and replaces every scalar with an analysis token.
    pub async fn analyse(&self, input: impl Into<DocumentInput>) -> EngineResult<Document> {
        let plaintext = self.decrypt_input(input.into(), "analyse").await?;
        let analyzer = self.analyzer().await?;

        let analysed = run_blocking(move || analyzer.analyse(&Value::Object(plaintext))).await?;
        match analysed {
            Value::Object(map) => Ok(map),
            _ => Err(EngineError::HashingFailure(
                "analysis changed the document shape".to_string(),
            )),
        }
    }

    /// Fingerprint of a single plaintext under the resolved identity salt.
    pub async fn identity(&self, plaintext: &str) -> EngineResult<String> {
        let analyzer = self.analyzer().await?;
        let plaintext = Zeroizing::new(plaintext.as_bytes().to_vec());
        run_blocking(move || analyzer.identity(&plaintext)).await
    }

    // ── Keys ─────────────────────────────────────────────────────

    /// Generates and persists a keypair, returning its public half.
    pub async fn create_keypair(&self) -> EngineResult<String> {
        let keypair = self.gateway.generate_keypair();
        self.keyring.put(keypair.public(), keypair.private()).await?;
        info!("created keypair {}", keypair.public());
        Ok(keypair.public().to_string())
    }

    pub async fn put_key(&self, public_key: &str, private_key: &str) -> EngineResult<()> {
        self.keyring.put(public_key, private_key).await
    }

    pub async fn get_key(&self, public_key: &str) -> EngineResult<Option<Zeroizing<String>>> {
        self.keyring.get(public_key).await
    }

    pub async fn delete_key(&self, public_key: &str) -> EngineResult<()> {
        self.keyring.delete(public_key).await
    }

    pub async fn list_keys(&self, prefix: &str) -> EngineResult<Vec<String>> {
        self.keyring.list(prefix).await
    }

    pub async fn set_identity_salt(&self, salt: &[u8]) -> EngineResult<()> {
        self.keyring.set_identity_salt(salt).await
    }

    pub async fn delete_identity_salt(&self) -> EngineResult<()> {
        self.keyring.delete_identity_salt().await
    }

    /// Resolves the identity salt according to the configured source.
    pub async fn identity_salt(&self) -> EngineResult<Vec<u8>> {
        let stored = match &self.config.identity_salt {
            SaltSource::Explicit { salt } => return Ok(salt.clone()),
            SaltSource::Stored => self.keyring.identity_salt().await?,
            SaltSource::UseDefault => None,
        };
        Ok(stored.unwrap_or_else(|| {
            warn!("no identity salt set, using the well-known insecure default");
            DEFAULT_IDENTITY_SALT.to_vec()
        }))
    }

    async fn analyzer(&self) -> EngineResult<Analyzer> {
        Ok(Analyzer::new(
            self.identity_salt().await?,
            self.config.fingerprint,
        ))
    }

    async fn decrypt_input(&self, input: DocumentInput, context: &str) -> EngineResult<Document> {
        let ciphertext = codec::encode(&input.into_document()?)?;
        let plaintext = self.gateway.decrypt(&ciphertext, context).await?;
        codec::decode(&plaintext)
    }
}

/// Runs scrypt work off the async executor.
async fn run_blocking<T, F>(f: F) -> EngineResult<T>
where
    F: FnOnce() -> EngineResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| EngineError::HashingFailure(format!("fingerprint task failed: {e}")))?
}
