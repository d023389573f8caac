//! Dataset store contract: prediction cache entries, per-folder settings,
//! manual caption edits, and the recent-folders list.
//!
//! The store is a shared, folder/image-keyed, single-writer resource. The
//! batch orchestrator is the sole mutator during a run; concurrent runs
//! against the same folder are not a supported configuration and no
//! cross-process locking is attempted.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::pipeline::hash::ContentHash;

/// A stored manual edit: the auto caption as it looked when the operator
/// started editing, and what they saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualEdit {
    pub previous: String,
    pub edited: String,
}

/// Keyed access to everything Tagyard persists for a dataset.
///
/// Settings values are plain strings; type coercion is the caller's job
/// (see `settings::DatasetSettings`). Cache values are opaque bytes; the
/// codec lives in `cache`.
pub trait DatasetStore {
    /// Fetch a cached raw-prediction blob for (content hash, model identity).
    fn get_cache(&self, hash: &ContentHash, model: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store a raw-prediction blob. Overwriting an existing key with the
    /// same bytes is a no-op; overwriting with different bytes only happens
    /// when recovering from a corrupt entry.
    fn put_cache(
        &self,
        hash: &ContentHash,
        model: &str,
        folder: &str,
        data: &[u8],
    ) -> Result<(), StoreError>;

    /// Read one setting for a folder, if present.
    fn get_setting(&self, folder: &str, key: &str) -> Result<Option<String>, StoreError>;

    /// Write one setting for a folder.
    fn set_setting(&self, folder: &str, key: &str, value: &str) -> Result<(), StoreError>;

    /// Fetch the manual edit recorded for (folder, content hash).
    fn get_edit(&self, folder: &str, hash: &ContentHash) -> Result<Option<ManualEdit>, StoreError>;

    /// Record (or replace) the manual edit for (folder, content hash).
    fn set_edit(
        &self,
        folder: &str,
        hash: &ContentHash,
        previous: &str,
        edited: &str,
    ) -> Result<(), StoreError>;

    /// Remove the manual edit for (folder, content hash), if any.
    fn clear_edit(&self, folder: &str, hash: &ContentHash) -> Result<(), StoreError>;

    /// Recently used dataset folders, most recent first, deduplicated.
    fn recent_folders(&self) -> Result<Vec<String>, StoreError>;

    /// Mark a folder as the most recently used.
    fn record_recent(&self, folder: &str) -> Result<(), StoreError>;
}
