//! Sub-configuration structs with their defaults.

use crate::settings::DEFAULT_MODEL;
use serde::{Deserialize, Serialize};

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where downloaded models are stored
    pub model_dir: String,

    /// Directory holding the dataset store database
    pub data_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: "~/.tagyard/models".to_string(),
            data_dir: "~/.tagyard".to_string(),
        }
    }
}

/// Defaults applied to dataset folders without stored settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Default tagging model identity
    pub model: String,

    /// General tag confidence threshold
    pub general_threshold: f32,

    /// Use adaptive (MCut) thresholding for general tags
    pub general_mcut: bool,

    /// Character tag confidence threshold
    pub character_threshold: f32,

    /// Use adaptive (MCut) thresholding for character tags
    pub character_mcut: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            general_threshold: 0.35,
            general_mcut: false,
            character_threshold: 0.85,
            character_mcut: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
