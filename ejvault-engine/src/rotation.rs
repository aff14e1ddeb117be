//! Re-encrypting documents for a different recipient.
//!
//! Rotation commits the freshly generated keypair to the keyring before the
//! document is re-encrypted, so a crash never leaves a document sealed to a
//! key nobody holds. It may leave an unused keypair behind instead. Neither
//! workflow persists the resulting document.

use crate::codec::{self, Document};
use crate::error::EngineResult;
use crate::gateway::CryptoGateway;
use crate::keyring::Keyring;
use ejvault_crypto::PUBLIC_KEY_FIELD;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

/// Outcome of a rotation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Rotation {
    pub old_public_key: String,
    pub new_public_key: String,
    /// The document encrypted for `new_public_key`.
    pub document: Document,
}

#[derive(Clone)]
pub struct RotationWorkflow {
    gateway: CryptoGateway,
    keyring: Keyring,
}

impl RotationWorkflow {
    pub fn new(gateway: CryptoGateway, keyring: Keyring) -> Self {
        Self { gateway, keyring }
    }

    /// Re-encrypts `document` under a newly generated keypair.
    pub async fn rotate(&self, document: &Document) -> EngineResult<Rotation> {
        let mut plaintext = self.decrypt(document, "rotate").await?;
        let old_public_key = codec::public_key_of(&plaintext)?;

        let keypair = self.gateway.generate_keypair();
        self.keyring.put(keypair.public(), keypair.private()).await?;
        info!("rotating document from {old_public_key} to {}", keypair.public());

        plaintext.insert(
            PUBLIC_KEY_FIELD.to_string(),
            Value::String(keypair.public().to_string()),
        );
        let document = self.encrypt(&plaintext)?;
        Ok(Rotation {
            old_public_key,
            new_public_key: keypair.public().to_string(),
            document,
        })
    }

    /// Re-encrypts `document` for `target_public_key`, which must already be
    /// in the keyring.
    pub async fn copy(&self, document: &Document, target_public_key: &str) -> EngineResult<Document> {
        let mut plaintext = self.decrypt(document, "copy").await?;

        let target = target_public_key.to_ascii_lowercase();
        self.keyring.get_required(&target, "copy target").await?;
        info!("copying document to recipient {target}");

        plaintext.insert(PUBLIC_KEY_FIELD.to_string(), Value::String(target));
        self.encrypt(&plaintext)
    }

    async fn decrypt(&self, document: &Document, context: &str) -> EngineResult<Document> {
        let ciphertext = codec::encode(document)?;
        let plaintext = self.gateway.decrypt(&ciphertext, context).await?;
        codec::decode(&plaintext)
    }

    fn encrypt(&self, plaintext: &Document) -> EngineResult<Document> {
        let ciphertext = self.gateway.encrypt(&codec::encode(plaintext)?)?;
        codec::decode(&ciphertext)
    }
}
