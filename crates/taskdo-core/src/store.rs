//! Synced key-value store.
//!
//! Mirrors a browser synced storage area: JSON values addressed by string
//! keys. In-memory application state is the source of truth; this store is
//! a best-effort persistence side channel.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::StorageError;

/// Well-known storage keys.
pub mod keys {
    pub const ACCOUNTS: &str = "accounts";
    pub const SETTINGS: &str = "settings";
    pub const SAVED_ACCOUNT_ID: &str = "savedAccountId";
    pub const SAVED_TASK_LIST_ID: &str = "savedTaskListId";
    pub const LANGUAGE: &str = "language";
}

/// Key-value storage of JSON values.
pub trait SyncStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Typed helpers over any `SyncStore`.
pub trait SyncStoreExt: SyncStore {
    /// Read and deserialize a value. Missing keys yield `None`.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.get(key)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StorageError::Malformed {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let value = serde_json::to_value(value).map_err(|e| StorageError::Malformed {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.set(key, value)
    }
}

impl<S: SyncStore + ?Sized> SyncStoreExt for S {}

/// SQLite-backed store, one row per key.
pub struct SqliteSyncStore {
    conn: Mutex<Connection>,
}

impl SqliteSyncStore {
    /// Open (or create) a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        self.conn.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl SyncStore for SqliteSyncStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let raw: Option<String> = self
            .conn
            .lock()
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;

        raw.map(|text| {
            serde_json::from_str(&text).map_err(|e| StorageError::Malformed {
                key: key.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();

        self.conn.lock().execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value.to_string(), now],
        )?;
        tracing::debug!("Stored key: {}", key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.conn
            .lock()
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// Store held entirely in memory.
#[derive(Default)]
pub struct MemorySyncStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemorySyncStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SyncStore for MemorySyncStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Sample {
        sort_by: String,
        limit: u32,
    }

    #[test]
    fn test_sqlite_roundtrip_and_overwrite() {
        let store = SqliteSyncStore::in_memory().unwrap();
        store.set(keys::SAVED_ACCOUNT_ID, Value::from("ALL")).unwrap();
        store
            .set(keys::SAVED_ACCOUNT_ID, Value::from("a@example.com"))
            .unwrap();

        assert_eq!(
            store.get(keys::SAVED_ACCOUNT_ID).unwrap(),
            Some(Value::from("a@example.com"))
        );
    }

    #[test]
    fn test_missing_key_is_none() {
        let store = SqliteSyncStore::in_memory().unwrap();
        assert!(store.get("nothing").unwrap().is_none());
        let typed: Option<Sample> = store.get_json("nothing").unwrap();
        assert!(typed.is_none());
    }

    #[test]
    fn test_typed_helpers_use_camel_case_json() {
        let store = MemorySyncStore::new();
        let sample = Sample {
            sort_by: "date".into(),
            limit: 20,
        };
        store.set_json(keys::SETTINGS, &sample).unwrap();

        let raw = store.get(keys::SETTINGS).unwrap().unwrap();
        assert_eq!(raw["sortBy"], "date");
        assert_eq!(store.get_json::<Sample>(keys::SETTINGS).unwrap(), Some(sample));
    }

    #[test]
    fn test_malformed_value_reports_key() {
        let store = MemorySyncStore::new();
        store.set(keys::SETTINGS, Value::from(42)).unwrap();
        let err = store.get_json::<Sample>(keys::SETTINGS).unwrap_err();
        assert!(matches!(err, StorageError::Malformed { ref key, .. } if key == "settings"));
    }

    #[test]
    fn test_remove() {
        let store = SqliteSyncStore::in_memory().unwrap();
        store.set(keys::LANGUAGE, Value::from("de")).unwrap();
        store.remove(keys::LANGUAGE).unwrap();
        assert!(store.get(keys::LANGUAGE).unwrap().is_none());
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.db");

        {
            let store = SqliteSyncStore::open(&path).unwrap();
            store.set(keys::SAVED_TASK_LIST_ID, Value::from("list-1")).unwrap();
        }

        let reopened = SqliteSyncStore::open(&path).unwrap();
        assert_eq!(
            reopened.get(keys::SAVED_TASK_LIST_ID).unwrap(),
            Some(Value::from("list-1"))
        );
    }
}
