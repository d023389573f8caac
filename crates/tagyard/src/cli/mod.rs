//! Command implementations for the Tagyard CLI.

pub mod config;
pub mod edit;
pub mod models;
pub mod predict;
pub mod recent;
pub mod run;
pub mod settings;

use std::path::Path;

use tagyard_core::{Config, SqliteStore};

/// Open the dataset store at the configured location.
pub(crate) fn open_store(config: &Config) -> anyhow::Result<SqliteStore> {
    Ok(SqliteStore::open(&config.store_path())?)
}

/// The store key for a dataset folder: the canonical absolute path when it
/// resolves, otherwise the path as given.
pub(crate) fn folder_key(folder: &Path) -> String {
    folder
        .canonicalize()
        .unwrap_or_else(|_| folder.to_path_buf())
        .to_string_lossy()
        .to_string()
}
