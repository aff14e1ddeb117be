//! Dual persistence of documents.
//!
//! Every logical path `P` owns two entries: `P` with the ciphertext document
//! and `P/decrypted` with its sanitized plaintext. The two entries are written
//! and deleted one after the other with no transaction between them. A crash
//! or a concurrent delete in between leaves only one of them behind, and reads
//! report whatever storage holds.

use crate::codec::{self, Document};
use crate::error::{EngineError, EngineResult};
use crate::keyring::KEYS_PREFIX;
use ejvault_storage::Storage;
use std::sync::Arc;
use tracing::{debug, info};

/// Path segment under which the sanitized copy of a document lives.
pub const DECRYPTED_SUFFIX: &str = "decrypted";

#[derive(Clone)]
pub struct DocumentStore {
    storage: Arc<dyn Storage>,
}

impl DocumentStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Writes both entries, ciphertext first.
    ///
    /// If the second write fails the ciphertext stays in place and the error
    /// is returned as is.
    pub async fn write(&self, path: &str, ciphertext: &[u8], sanitized: &[u8]) -> EngineResult<()> {
        self.write_encrypted(path, ciphertext).await?;
        self.write_decrypted(path, sanitized).await
    }

    /// First step of [`write`](Self::write): the ciphertext entry.
    pub async fn write_encrypted(&self, path: &str, ciphertext: &[u8]) -> EngineResult<()> {
        validate_path(path)?;
        info!("storing encrypted value at {path}");
        self.storage.put(path, ciphertext).await?;
        Ok(())
    }

    /// Second step of [`write`](Self::write): the sanitized entry.
    pub async fn write_decrypted(&self, path: &str, sanitized: &[u8]) -> EngineResult<()> {
        validate_path(path)?;
        let decrypted = decrypted_path(path);
        info!("storing decrypted value at {decrypted}");
        self.storage.put(&decrypted, sanitized).await?;
        Ok(())
    }

    /// Returns the stored ciphertext document.
    pub async fn read(&self, path: &str) -> EngineResult<Option<Document>> {
        validate_path(path)?;
        debug!("reading value at {path}");
        self.read_entry(path).await
    }

    /// Returns the stored sanitized document.
    pub async fn read_decrypted(&self, path: &str) -> EngineResult<Option<Document>> {
        validate_path(path)?;
        let decrypted = decrypted_path(path);
        debug!("reading value at {decrypted}");
        self.read_entry(&decrypted).await
    }

    /// Removes both entries, ciphertext first. Missing entries are fine.
    pub async fn delete(&self, path: &str) -> EngineResult<()> {
        validate_path(path)?;
        info!("deleting value at {path}");
        self.storage.delete(path).await?;

        let decrypted = decrypted_path(path);
        info!("deleting value at {decrypted}");
        self.storage.delete(&decrypted).await?;
        Ok(())
    }

    /// Lists the immediate children of `prefix` as storage reports them.
    pub async fn list(&self, prefix: &str) -> EngineResult<Vec<String>> {
        Ok(self.storage.list(prefix).await?)
    }

    /// Reports whether anything is stored at exactly `path`.
    pub async fn exists(&self, path: &str) -> EngineResult<bool> {
        validate_path(path)?;
        Ok(self.storage.get(path).await?.is_some())
    }

    async fn read_entry(&self, key: &str) -> EngineResult<Option<Document>> {
        match self.storage.get(key).await? {
            Some(bytes) => codec::decode(&bytes).map(Some),
            None => Ok(None),
        }
    }
}

/// Storage key of the sanitized copy of `path`.
pub fn decrypted_path(path: &str) -> String {
    format!("{path}/{DECRYPTED_SUFFIX}")
}

/// Rejects paths that would clash with the keyring or with another
/// document's sanitized copy.
pub fn validate_path(path: &str) -> EngineResult<()> {
    let reason = if path.is_empty() {
        "document path must not be empty"
    } else if path.starts_with(KEYS_PREFIX) || path == KEYS_PREFIX.trim_end_matches('/') {
        "document path must not be inside the keyring"
    } else if path == DECRYPTED_SUFFIX || path.ends_with(&format!("/{DECRYPTED_SUFFIX}")) {
        "document path must not end in the decrypted segment"
    } else if path.ends_with('/') {
        "document path must not end with a slash"
    } else {
        return Ok(());
    };
    Err(EngineError::InvalidInputFormat(format!("{reason}: {path:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ejvault_storage::{MemoryStorage, StorageError, StorageResult};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn store() -> DocumentStore {
        DocumentStore::new(Arc::new(MemoryStorage::new()))
    }

    /// Memory storage that refuses to write sanitized copies.
    struct FailingDecryptedWrites(MemoryStorage);

    #[async_trait]
    impl Storage for FailingDecryptedWrites {
        async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
            self.0.get(key).await
        }

        async fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
            if key.ends_with("/decrypted") {
                return Err(StorageError::Backend {
                    key: key.to_string(),
                    message: "disk full".to_string(),
                });
            }
            self.0.put(key, value).await
        }

        async fn delete(&self, key: &str) -> StorageResult<()> {
            self.0.delete(key).await
        }

        async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
            self.0.list(prefix).await
        }
    }

    #[tokio::test]
    async fn write_then_read_both_copies() {
        let store = store();
        store
            .write("app", br#"{"a":"EJ[...]"}"#, br#"{"a":"plain"}"#)
            .await
            .unwrap();

        assert_eq!(
            store.read("app").await.unwrap().map(Value::Object),
            Some(json!({"a": "EJ[...]"}))
        );
        assert_eq!(
            store.read_decrypted("app").await.unwrap().map(Value::Object),
            Some(json!({"a": "plain"}))
        );
        assert!(store.exists("app").await.unwrap());
    }

    #[tokio::test]
    async fn missing_paths_read_as_none() {
        let store = store();
        assert!(store.read("nope").await.unwrap().is_none());
        assert!(store.read_decrypted("nope").await.unwrap().is_none());
        assert!(!store.exists("nope").await.unwrap());
    }

    #[tokio::test]
    async fn delete_removes_both_copies() {
        let store = store();
        store.write("app", b"{}", b"{}").await.unwrap();
        store.delete("app").await.unwrap();

        assert!(store.read("app").await.unwrap().is_none());
        assert!(store.read_decrypted("app").await.unwrap().is_none());
        store.delete("app").await.unwrap();
    }

    #[tokio::test]
    async fn half_written_document_is_visible() {
        let store = store();
        store.write_encrypted("app", b"{}").await.unwrap();
        assert!(store.read("app").await.unwrap().is_some());
        assert!(store.read_decrypted("app").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_sanitized_write_keeps_ciphertext() {
        let store = DocumentStore::new(Arc::new(FailingDecryptedWrites(MemoryStorage::new())));
        let err = store
            .write("app", br#"{"a":"EJ[...]"}"#, br#"{"a":"plain"}"#)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Storage(StorageError::Backend { ref key, .. }) if key == "app/decrypted"
        ));

        assert_eq!(
            store.read("app").await.unwrap().map(Value::Object),
            Some(json!({"a": "EJ[...]"}))
        );
        assert!(store.read_decrypted("app").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reads_reject_invalid_paths() {
        let store = store();
        store.storage.put("keys/abc", b"secret").await.unwrap();

        for path in ["keys/abc", "", "app/decrypted"] {
            assert!(matches!(
                store.read(path).await,
                Err(EngineError::InvalidInputFormat(_))
            ));
            assert!(matches!(
                store.read_decrypted(path).await,
                Err(EngineError::InvalidInputFormat(_))
            ));
            assert!(matches!(
                store.exists(path).await,
                Err(EngineError::InvalidInputFormat(_))
            ));
        }
    }

    #[tokio::test]
    async fn list_reports_immediate_children() {
        let store = store();
        store.write("itsasecret", b"{}", b"{}").await.unwrap();
        assert_eq!(
            store.list("").await.unwrap(),
            vec!["itsasecret", "itsasecret/"]
        );
        assert_eq!(store.list("itsasecret/").await.unwrap(), vec!["decrypted"]);
    }

    #[test]
    fn validates_paths() {
        for bad in ["", "keys", "keys/abc", "app/decrypted", "decrypted", "app/"] {
            assert!(validate_path(bad).is_err(), "{bad:?} should be rejected");
        }
        for good in ["app", "team/app", "keysmith", "app/decrypted-notes"] {
            assert!(validate_path(good).is_ok(), "{good:?} should be accepted");
        }
    }
}
