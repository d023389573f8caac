//! SQLite-backed dataset store.
//!
//! One database file holds all four tables. `rusqlite` with the bundled
//! SQLite, so there is no system dependency. Connections are not `Send`;
//! the orchestrator is single-threaded, which is the supported model.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;
use crate::pipeline::hash::ContentHash;

use super::{DatasetStore, ManualEdit};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS prediction_cache (
    file_hash  BLOB NOT NULL,
    model      TEXT NOT NULL,
    folder     TEXT NOT NULL,
    data       BLOB NOT NULL,
    PRIMARY KEY (file_hash, model)
);
CREATE TABLE IF NOT EXISTS dataset_settings (
    folder     TEXT NOT NULL,
    key        TEXT NOT NULL,
    value      TEXT NOT NULL,
    PRIMARY KEY (folder, key)
);
CREATE TABLE IF NOT EXISTS manual_edits (
    folder     TEXT NOT NULL,
    file_hash  BLOB NOT NULL,
    previous   TEXT NOT NULL,
    edited     TEXT NOT NULL,
    PRIMARY KEY (folder, file_hash)
);
CREATE TABLE IF NOT EXISTS recent_folders (
    folder     TEXT PRIMARY KEY,
    last_used  INTEGER NOT NULL
);
";

/// SQLite implementation of [`DatasetStore`].
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    /// Open (creating if needed) the store at the given database path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Open {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        }
        let conn = Connection::open(path).map_err(|e| StoreError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::init(conn, path.to_path_buf())
    }

    /// Open an in-memory store (tests).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Open {
            path: PathBuf::from(":memory:"),
            message: e.to_string(),
        })?;
        Self::init(conn, PathBuf::from(":memory:"))
    }

    fn init(conn: Connection, path: PathBuf) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        tracing::debug!("Dataset store ready at {:?}", path);
        Ok(Self { conn, path })
    }

    /// Path of the underlying database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatasetStore for SqliteStore {
    fn get_cache(&self, hash: &ContentHash, model: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let data = self
            .conn
            .query_row(
                "SELECT data FROM prediction_cache WHERE file_hash = ?1 AND model = ?2",
                params![hash.as_bytes(), model],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(data)
    }

    fn put_cache(
        &self,
        hash: &ContentHash,
        model: &str,
        folder: &str,
        data: &[u8],
    ) -> Result<(), StoreError> {
        // REPLACE keeps put idempotent and lets a recompute overwrite a
        // corrupt entry.
        self.conn.execute(
            "INSERT OR REPLACE INTO prediction_cache (file_hash, model, folder, data)
             VALUES (?1, ?2, ?3, ?4)",
            params![hash.as_bytes(), model, folder, data],
        )?;
        Ok(())
    }

    fn get_setting(&self, folder: &str, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM dataset_settings WHERE folder = ?1 AND key = ?2",
                params![folder, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_setting(&self, folder: &str, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO dataset_settings (folder, key, value) VALUES (?1, ?2, ?3)",
            params![folder, key, value],
        )?;
        Ok(())
    }

    fn get_edit(&self, folder: &str, hash: &ContentHash) -> Result<Option<ManualEdit>, StoreError> {
        let edit = self
            .conn
            .query_row(
                "SELECT previous, edited FROM manual_edits WHERE folder = ?1 AND file_hash = ?2",
                params![folder, hash.as_bytes()],
                |row| {
                    Ok(ManualEdit {
                        previous: row.get(0)?,
                        edited: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(edit)
    }

    fn set_edit(
        &self,
        folder: &str,
        hash: &ContentHash,
        previous: &str,
        edited: &str,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO manual_edits (folder, file_hash, previous, edited)
             VALUES (?1, ?2, ?3, ?4)",
            params![folder, hash.as_bytes(), previous, edited],
        )?;
        Ok(())
    }

    fn clear_edit(&self, folder: &str, hash: &ContentHash) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM manual_edits WHERE folder = ?1 AND file_hash = ?2",
            params![folder, hash.as_bytes()],
        )?;
        Ok(())
    }

    fn recent_folders(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT folder FROM recent_folders ORDER BY last_used DESC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut folders = Vec::new();
        for row in rows {
            folders.push(row?);
        }
        Ok(folders)
    }

    fn record_recent(&self, folder: &str) -> Result<(), StoreError> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or(0);
        self.conn.execute(
            "INSERT OR REPLACE INTO recent_folders (folder, last_used) VALUES (?1, ?2)",
            params![folder, now],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(byte: u8) -> ContentHash {
        ContentHash::from_bytes([byte; 32])
    }

    #[test]
    fn cache_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let h = hash(1);

        assert!(store.get_cache(&h, "model-a").unwrap().is_none());
        store.put_cache(&h, "model-a", "/data", b"payload").unwrap();
        assert_eq!(
            store.get_cache(&h, "model-a").unwrap().as_deref(),
            Some(&b"payload"[..])
        );
        // Different model identity is a different key.
        assert!(store.get_cache(&h, "model-b").unwrap().is_none());
    }

    #[test]
    fn cache_put_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let h = hash(2);
        store.put_cache(&h, "m", "/data", b"same").unwrap();
        store.put_cache(&h, "m", "/data", b"same").unwrap();

        let count: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM prediction_cache", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn settings_round_trip_and_overwrite() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.get_setting("/data", "model").unwrap().is_none());

        store.set_setting("/data", "model", "a").unwrap();
        store.set_setting("/data", "model", "b").unwrap();
        assert_eq!(store.get_setting("/data", "model").unwrap().as_deref(), Some("b"));

        // Settings are scoped per folder.
        assert!(store.get_setting("/other", "model").unwrap().is_none());
    }

    #[test]
    fn edit_round_trip_and_clear() {
        let store = SqliteStore::open_in_memory().unwrap();
        let h = hash(3);

        assert!(store.get_edit("/data", &h).unwrap().is_none());
        store.set_edit("/data", &h, "auto caption", "edited caption").unwrap();

        let edit = store.get_edit("/data", &h).unwrap().unwrap();
        assert_eq!(edit.previous, "auto caption");
        assert_eq!(edit.edited, "edited caption");

        store.clear_edit("/data", &h).unwrap();
        assert!(store.get_edit("/data", &h).unwrap().is_none());
    }

    #[test]
    fn recent_folders_most_recent_first_with_dedup() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.record_recent("/a").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        store.record_recent("/b").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        store.record_recent("/a").unwrap();

        assert_eq!(store.recent_folders().unwrap(), vec!["/a", "/b"]);
    }
}
