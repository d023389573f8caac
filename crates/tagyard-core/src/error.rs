//! Error types for the Tagyard captioning pipeline.
//!
//! Errors are organized by stage so callers can tell a bad request
//! (`PipelineError::Input`) from a broken model (`ModelError`) from a broken
//! store (`StoreError`), and react accordingly.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Tagyard operations.
#[derive(Error, Debug)]
pub enum TagyardError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Dataset store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Model loading/prediction errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Dataset store errors (cache, settings, manual edits, recent folders).
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open or create the database file
    #[error("Failed to open dataset store at {path}: {message}")]
    Open { path: PathBuf, message: String },

    /// A query against the store failed
    #[error("Store query failed: {0}")]
    Query(#[from] rusqlite::Error),
}

/// Classifier model errors.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Identity matched no registered backend and is not a local path
    #[error("Model is not supported: {0}")]
    Unrecognized(String),

    /// A backend recognized the identity but failed to load it
    #[error("Failed to load model {identity}: {message}")]
    Load { identity: String, message: String },

    /// Inference failed on a loaded model
    #[error("Prediction failed with model {identity}: {message}")]
    Predict { identity: String, message: String },

    /// predict() called before load()
    #[error("No model loaded")]
    NotLoaded,
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Bad request from the caller (missing folder, no image selected)
    #[error("Invalid input: {0}")]
    Input(String),

    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Sidecar caption file could not be written
    #[error("Failed to write sidecar for {path}: {message}")]
    Sidecar { path: PathBuf, message: String },
}

/// Convenience type alias for Tagyard results.
pub type Result<T> = std::result::Result<T, TagyardError>;
