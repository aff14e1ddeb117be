//! Bridges documents to the encryption primitive, resolving recipients
//! through the keyring.

use crate::error::{EngineError, EngineResult};
use crate::keyring::Keyring;
use ejvault_crypto::{
    CryptoError, Keypair, decrypt_document, encrypt_document, extract_public_key,
    generate_keypair,
};
use tracing::debug;

#[derive(Clone)]
pub struct CryptoGateway {
    keyring: Keyring,
}

impl CryptoGateway {
    pub fn new(keyring: Keyring) -> Self {
        Self { keyring }
    }

    /// Decrypts a ciphertext document with the private key of its embedded
    /// recipient. `context` names the path or operation for error reports.
    pub async fn decrypt(&self, ciphertext: &[u8], context: &str) -> EngineResult<Vec<u8>> {
        let recipient = extract_public_key(ciphertext).map_err(|e| {
            EngineError::InvalidInputFormat(format!("failed to extract public key: {e}"))
        })?;
        let public_key = hex::encode(recipient);
        debug!("decrypting {context} for recipient {public_key}");

        let private_key = self.keyring.get_required(&public_key, context).await?;
        decrypt_document(ciphertext, &private_key).map_err(|e| match e {
            CryptoError::Serialization(e) => {
                EngineError::InvalidInputFormat(format!("invalid document: {e}"))
            }
            other => EngineError::DecryptionFailed(other.to_string()),
        })
    }

    /// Encrypts a plaintext document for the recipient named in its public
    /// key field.
    pub fn encrypt(&self, plaintext: &[u8]) -> EngineResult<Vec<u8>> {
        encrypt_document(plaintext).map_err(|e| match e {
            CryptoError::MissingPublicKey | CryptoError::InvalidKey(_) => {
                EngineError::InvalidInputFormat(e.to_string())
            }
            other => EngineError::EncryptionFailed(other.to_string()),
        })
    }

    /// Generates a keypair without persisting it.
    pub fn generate_keypair(&self) -> Keypair {
        generate_keypair()
    }
}
