//! Storage layer for ejvault.
//!
//! Defines the opaque key-value contract the engine persists through and
//! ships two backends for it.
//!
//! # Backends
//!
//! - [`MemoryStorage`] keeps entries in a sorted in-process map
//! - `DuckDbStorage` persists entries in a single DuckDB table (requires the
//!   `duckdb` feature)
//!
//! Keys are `/`-separated paths. Listing a prefix returns its immediate
//! children, with deeper keys collapsed into `name/` entries.

mod backend;
#[cfg(feature = "duckdb")]
mod duckdb_store;
mod error;
mod memory;

pub use backend::{Storage, immediate_children};
#[cfg(feature = "duckdb")]
pub use duckdb_store::DuckDbStorage;
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStorage;

/// Open a DuckDB connection with stale WAL recovery and resource limits.
///
/// If the initial open fails and a `.wal` file exists alongside the database,
/// it is removed and the open is retried once.
#[cfg(feature = "duckdb")]
pub fn open_duckdb_with_wal_recovery(
    path: &std::path::Path,
    memory_limit: &str,
    threads: u32,
) -> StorageResult<duckdb::Connection> {
    let conn = match duckdb::Connection::open(path) {
        Ok(c) => c,
        Err(first_err) => {
            let wal_path = path.with_extension(
                path.extension()
                    .map(|ext| format!("{}.wal", ext.to_string_lossy()))
                    .unwrap_or_else(|| "wal".to_string()),
            );
            if !wal_path.exists() {
                return Err(first_err.into());
            }
            tracing::warn!(
                "kv store open failed, removing stale WAL and retrying: {}",
                wal_path.display()
            );
            std::fs::remove_file(&wal_path).map_err(|e| StorageError::Backend {
                key: wal_path.display().to_string(),
                message: e.to_string(),
            })?;
            duckdb::Connection::open(path)?
        }
    };
    apply_resource_limits(&conn, memory_limit, threads)?;
    Ok(conn)
}

#[cfg(feature = "duckdb")]
fn apply_resource_limits(
    conn: &duckdb::Connection,
    memory_limit: &str,
    threads: u32,
) -> StorageResult<()> {
    conn.execute_batch(&format!(
        "PRAGMA memory_limit='{memory_limit}'; PRAGMA threads={threads};"
    ))?;
    Ok(())
}
