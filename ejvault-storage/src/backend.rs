//! The key-value contract every backend implements.

use crate::error::StorageResult;
use async_trait::async_trait;

/// Opaque, durable key-value storage.
///
/// Backends guarantee read-after-write consistency for a single key and
/// nothing across keys. Dropping a returned future cancels the call.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Returns the value at `key`, or `None` if nothing is stored there.
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Stores `value` at `key`, replacing any previous value.
    async fn put(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Removes `key`. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Lists the immediate children of `prefix` in lexicographic order.
    ///
    /// Keys below a deeper `/` collapse into a single `name/` entry.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;
}

/// Collapses full keys into the immediate children of `prefix`.
///
/// `keys` must already be sorted; the output is sorted and deduplicated.
pub fn immediate_children<'a, I>(prefix: &str, keys: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut children: Vec<String> = Vec::new();
    for key in keys {
        let Some(rest) = key.strip_prefix(prefix) else {
            continue;
        };
        let child = match rest.find('/') {
            Some(idx) => &rest[..=idx],
            None => rest,
        };
        if child.is_empty() {
            continue;
        }
        if children.last().map(String::as_str) != Some(child) {
            children.push(child.to_string());
        }
    }
    children.sort();
    children.dedup();
    children
}
