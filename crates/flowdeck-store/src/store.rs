use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

use flowdeck_core::error::{FlowdeckError, Result};
use flowdeck_core::traits::WorkflowStore;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );";

/// A key with its last write time.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub key: String,
    pub updated_at: DateTime<Utc>,
}

/// SQLite-backed key-value store for workflow documents.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn db_err(e: impl std::fmt::Display) -> FlowdeckError {
    FlowdeckError::Database(e.to_string())
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        // Create parent directories
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                FlowdeckError::Database(format!("Failed to create db directory: {}", e))
            })?;
        }

        let conn = Connection::open(path).map_err(db_err)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        debug!(path = %path.display(), "SQLite store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Keys under `prefix` with their write times, most recent first.
    pub fn entries(&self, prefix: &str) -> Result<Vec<StoredEntry>> {
        let conn = self.conn.lock().map_err(db_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT key, updated_at FROM kv
                 WHERE substr(key, 1, length(?1)) = ?1
                 ORDER BY updated_at DESC, key ASC",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![prefix], |row| {
                let key: String = row.get(0)?;
                let ts_str: String = row.get(1)?;
                Ok((key, ts_str))
            })
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            let (key, ts_str) = row.map_err(db_err)?;
            let updated_at = DateTime::parse_from_rfc3339(&ts_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            entries.push(StoredEntry { key, updated_at });
        }
        Ok(entries)
    }
}

impl WorkflowStore for SqliteStore {
    fn put(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().map_err(db_err)?;
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )
        .map_err(db_err)?;
        debug!(key, bytes = value.len(), "Stored value");
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().map_err(db_err)?;
        conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()
        .map_err(db_err)
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let conn = self.conn.lock().map_err(db_err)?;
        let changed = conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(db_err)?;
        Ok(changed > 0)
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().map_err(db_err)?;
        let mut stmt = conn
            .prepare("SELECT key FROM kv WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key")
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![prefix], |row| row.get::<_, String>(0))
            .map_err(db_err)?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row.map_err(db_err)?);
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_overwrite() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.get("workflow_a").unwrap(), None);

        store.put("workflow_a", "{}").unwrap();
        assert_eq!(store.get("workflow_a").unwrap().as_deref(), Some("{}"));

        store.put("workflow_a", "{\"v\": 2}").unwrap();
        assert_eq!(store.get("workflow_a").unwrap().as_deref(), Some("{\"v\": 2}"));
    }

    #[test]
    fn test_keys_filter_by_prefix() {
        let store = SqliteStore::in_memory().unwrap();
        store.put("workflow_b", "1").unwrap();
        store.put("workflow_a", "2").unwrap();
        store.put("other_x", "3").unwrap();

        assert_eq!(store.keys("workflow_").unwrap(), vec!["workflow_a", "workflow_b"]);
        assert_eq!(store.entries("workflow_").unwrap().len(), 2);
    }

    #[test]
    fn test_prefix_with_like_wildcards_is_literal() {
        let store = SqliteStore::in_memory().unwrap();
        store.put("workflow_1", "x").unwrap();
        store.put("workflowX1", "y").unwrap();
        assert_eq!(store.keys("workflow_").unwrap(), vec!["workflow_1"]);
    }

    #[test]
    fn test_remove() {
        let store = SqliteStore::in_memory().unwrap();
        store.put("workflow_a", "1").unwrap();
        assert!(store.remove("workflow_a").unwrap());
        assert!(!store.remove("workflow_a").unwrap());
        assert!(store.get("workflow_a").unwrap().is_none());
    }

    #[test]
    fn test_open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("workflows.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.put("workflow_disk", "saved").unwrap();
        }
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.get("workflow_disk").unwrap().as_deref(), Some("saved"));
    }
}
