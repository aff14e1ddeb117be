//! Private keys addressed by their public half.
//!
//! Layout: `keys/<public hex>` holds the private hex string, and
//! `keys/__secret_salt` holds the optional identity salt. Writes are last
//! write wins; the keyring never detects overwrites.

use crate::error::{EngineError, EngineResult};
use ejvault_crypto::{Keypair, parse_key_hex};
use ejvault_storage::{Storage, StorageError};
use std::sync::Arc;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Storage prefix of the keyring namespace.
pub const KEYS_PREFIX: &str = "keys/";

/// Name of the identity salt entry inside the keyring namespace.
pub const SALT_ENTRY: &str = "__secret_salt";

/// Storage-backed keyring.
#[derive(Clone)]
pub struct Keyring {
    storage: Arc<dyn Storage>,
}

impl Keyring {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Stores the private half of a keypair under its public half.
    ///
    /// The public half must be the one derived from `private_key`.
    pub async fn put(&self, public_key: &str, private_key: &str) -> EngineResult<()> {
        let path = key_path(public_key)?;
        let derived = Keypair::from_private_hex(private_key)
            .map_err(|e| EngineError::InvalidInputFormat(format!("private key: {e}")))?;
        if !derived.public().eq_ignore_ascii_case(public_key) {
            return Err(EngineError::InvalidInputFormat(format!(
                "private key does not belong to public key {}",
                public_key.to_ascii_lowercase()
            )));
        }

        info!("storing private key at {path}");
        self.storage.put(&path, private_key.as_bytes()).await?;
        Ok(())
    }

    /// Returns the private key for `public_key`, or `None` if the keyring has
    /// no entry for it.
    pub async fn get(&self, public_key: &str) -> EngineResult<Option<Zeroizing<String>>> {
        let path = key_path(public_key)?;
        debug!("looking up private key at {path}");

        let Some(bytes) = self.storage.get(&path).await? else {
            return Ok(None);
        };
        let private = String::from_utf8(bytes).map_err(|_| StorageError::Backend {
            key: path,
            message: "private key is not valid UTF-8".to_string(),
        })?;
        Ok(Some(Zeroizing::new(private)))
    }

    /// Like [`get`](Self::get), but a miss is an `UnknownRecipient` error
    /// naming `context`.
    pub async fn get_required(
        &self,
        public_key: &str,
        context: &str,
    ) -> EngineResult<Zeroizing<String>> {
        self.get(public_key)
            .await?
            .ok_or_else(|| EngineError::UnknownRecipient {
                public_key: public_key.to_ascii_lowercase(),
                context: context.to_string(),
            })
    }

    /// Removes a keypair. Removing an unknown key succeeds.
    pub async fn delete(&self, public_key: &str) -> EngineResult<()> {
        let path = key_path(public_key)?;
        info!("deleting private key at {path}");
        self.storage.delete(&path).await?;
        Ok(())
    }

    /// Lists stored public keys starting with `prefix`, in lexicographic order.
    pub async fn list(&self, prefix: &str) -> EngineResult<Vec<String>> {
        let entries = self
            .storage
            .list(&format!("{KEYS_PREFIX}{prefix}"))
            .await?;
        Ok(entries
            .into_iter()
            .map(|entry| format!("{prefix}{entry}"))
            .filter(|entry| entry != SALT_ENTRY)
            .collect())
    }

    /// Returns the stored identity salt, if one was set.
    pub async fn identity_salt(&self) -> EngineResult<Option<Vec<u8>>> {
        Ok(self.storage.get(&salt_path()).await?)
    }

    /// Stores the identity salt used for fingerprints.
    pub async fn set_identity_salt(&self, salt: &[u8]) -> EngineResult<()> {
        if salt.is_empty() {
            return Err(EngineError::InvalidInputFormat(
                "identity salt must not be empty".to_string(),
            ));
        }
        let path = salt_path();
        info!("storing identity salt at {path}");
        self.storage.put(&path, salt).await?;
        Ok(())
    }

    /// Removes the identity salt, reverting to the configured fallback.
    pub async fn delete_identity_salt(&self) -> EngineResult<()> {
        let path = salt_path();
        info!("deleting identity salt at {path}");
        self.storage.delete(&path).await?;
        Ok(())
    }
}

fn key_path(public_key: &str) -> EngineResult<String> {
    parse_key_hex(public_key)
        .map_err(|e| EngineError::InvalidInputFormat(format!("public key: {e}")))?;
    Ok(format!("{KEYS_PREFIX}{}", public_key.to_ascii_lowercase()))
}

fn salt_path() -> String {
    format!("{KEYS_PREFIX}{SALT_ENTRY}")
}
