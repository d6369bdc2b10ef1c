pub mod memory;
pub mod models;

pub use memory::MemoryStorage;

use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};

// ── Storage keys ──

pub const ENTRIES_KEY: &str = "dealMindEntries";
pub const SESSIONS_KEY: &str = "dealMindSessions";
pub const TABLE_DATA_KEY: &str = "dealMindTableData";
pub const MODEL_CONFIGS_KEY: &str = "dealMindModelConfigs";
pub const PROMPT_VERSIONS_KEY: &str = "dealMindPromptVersions";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Durable key/value blob storage. Every value is a UTF-8 JSON document.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Reads and decodes the blob under `key`. Missing keys, read failures and
/// corrupt JSON all fall back to `None`.
pub fn load_json<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Option<T> {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, error = %e, "storage read failed, using empty value");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "stored JSON is corrupt, using empty value");
            None
        }
    }
}

pub fn save_json<T: Serialize + ?Sized>(
    storage: &dyn Storage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    storage.set(key, &raw)?;
    tracing::debug!(key, bytes = raw.len(), "flushed to storage");
    Ok(())
}

/// SQLite-backed storage: one row per logical key.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(app_dir: &std::path::Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(app_dir)
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        let db_path = app_dir.join("dealmind.db");
        let conn = Connection::open(db_path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let db = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        db.migrate()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
        )?;
        Ok(())
    }

    pub fn keys(&self) -> Result<Vec<String>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key FROM kv_store ORDER BY key ASC")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<String>, _>>()?)
    }
}

impl Storage for Database {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.lock()?;
        let result = conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![key],
            |row| row.get(0),
        );
        match result {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_set_get_remove() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get("k").unwrap(), None);
        db.set("k", "[1,2]").unwrap();
        db.set("k", "[3]").unwrap();
        assert_eq!(db.get("k").unwrap().as_deref(), Some("[3]"));
        assert_eq!(db.keys().unwrap(), vec!["k".to_string()]);
        db.remove("k").unwrap();
        assert_eq!(db.get("k").unwrap(), None);
    }

    #[test]
    fn database_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let db = Database::new(dir.path()).expect("db");
            db.set(ENTRIES_KEY, "[]").unwrap();
        }
        let db = Database::new(dir.path()).expect("reopen");
        assert_eq!(db.get(ENTRIES_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn load_json_falls_back_on_corrupt_blob() {
        let storage = MemoryStorage::new();
        storage.seed(ENTRIES_KEY, "{not json");
        let loaded: Option<Vec<String>> = load_json(&storage, ENTRIES_KEY);
        assert!(loaded.is_none());
    }

    #[test]
    fn save_then_load_json() {
        let db = Database::open_in_memory().unwrap();
        save_json(&db, SESSIONS_KEY, &vec!["a", "b"]).unwrap();
        let loaded: Vec<String> = load_json(&db, SESSIONS_KEY).unwrap();
        assert_eq!(loaded, vec!["a", "b"]);
    }
}
