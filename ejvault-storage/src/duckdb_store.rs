//! DuckDB-backed storage.
//!
//! All entries live in a single `kv_entries` table. The connection is shared
//! behind a mutex, and every statement runs on the blocking pool so a slow
//! query never stalls the async executor.

use crate::backend::{Storage, immediate_children};
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use duckdb::{Connection, params};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Persistent key-value storage in a DuckDB database file.
#[derive(Clone)]
pub struct DuckDbStorage {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbStorage {
    /// Opens or creates a store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = crate::open_duckdb_with_wal_recovery(path, "128MB", 1)?;
        initialize_schema(&conn)?;
        debug!("opened kv store at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the locked connection on the blocking pool.
    async fn run<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StorageError::Poisoned)?;
            f(&conn)
        })
        .await?
    }
}

#[async_trait]
impl Storage for DuckDbStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let key = key.to_string();
        self.run(move |conn| get_entry(conn, &key)).await
    }

    async fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let key = key.to_string();
        let value = value.to_vec();
        self.run(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO kv_entries (key, value) VALUES (?, ?)",
                params![key, value],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let key = key.to_string();
        self.run(move |conn| {
            conn.execute("DELETE FROM kv_entries WHERE key = ?", params![key])?;
            Ok(())
        })
        .await
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let prefix = prefix.to_string();
        self.run(move |conn| list_children(conn, &prefix)).await
    }
}

fn get_entry(conn: &Connection, key: &str) -> StorageResult<Option<Vec<u8>>> {
    let result = conn.query_row(
        "SELECT value FROM kv_entries WHERE key = ?",
        params![key],
        |row| row.get::<_, Vec<u8>>(0),
    );
    match result {
        Ok(value) => Ok(Some(value)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn list_children(conn: &Connection, prefix: &str) -> StorageResult<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT key FROM kv_entries WHERE starts_with(key, ?) ORDER BY key")?;
    let keys = stmt
        .query_map(params![prefix], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(immediate_children(prefix, keys.iter().map(String::as_str)))
}

fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS kv_entries (
            key VARCHAR PRIMARY KEY,
            value BLOB NOT NULL
        );
        "#,
    )?;
    Ok(())
}
