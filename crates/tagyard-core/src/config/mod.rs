//! Configuration management for Tagyard.
//!
//! Configuration is loaded from the platform config directory (for example
//! `~/.config/tagyard/config.toml` on Linux) with sensible defaults. It holds
//! the machine-level knobs: directories, default dataset settings, logging.
//! Per-dataset knobs live in the dataset store, not here.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use crate::settings::DatasetSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Tagyard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Defaults applied to datasets without stored settings
    pub defaults: DefaultsConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories, falling back to
    /// `~/.tagyard/config.toml` if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "tagyard", "tagyard")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".tagyard").join("config.toml")
            })
    }

    /// Get the resolved model directory path (with ~ expansion).
    pub fn model_dir(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.general.model_dir);
        PathBuf::from(expanded.into_owned())
    }

    /// Get the resolved data directory path (with ~ expansion).
    pub fn data_dir(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.general.data_dir);
        PathBuf::from(expanded.into_owned())
    }

    /// Path of the dataset store database.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir().join("datasets.db")
    }

    /// Dataset settings used for folders without stored values.
    pub fn dataset_defaults(&self) -> DatasetSettings {
        DatasetSettings {
            model: self.defaults.model.clone(),
            general_threshold: self.defaults.general_threshold,
            general_mcut: self.defaults.general_mcut,
            character_threshold: self.defaults.character_threshold,
            character_mcut: self.defaults.character_mcut,
            ..DatasetSettings::default()
        }
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
