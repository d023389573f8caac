//! Tagging model abstraction and backend dispatch.
//!
//! A [`Tagger`] turns a decoded image into a [`RawPrediction`] holding the
//! full score maps for every label the model knows. Thresholding happens
//! later, downstream of the cache, so re-running with different thresholds
//! never re-runs inference.

pub mod wd;

pub use wd::WdTagger;

use std::path::Path;

use image::DynamicImage;

use crate::error::ModelError;
use crate::types::RawPrediction;

/// Model identities with a known backend, in display order.
pub const KNOWN_MODELS: &[&str] = &[
    "SmilingWolf/wd-eva02-large-tagger-v3",
    "SmilingWolf/wd-vit-large-tagger-v3",
    "SmilingWolf/wd-vit-tagger-v3",
    "SmilingWolf/wd-convnext-tagger-v3",
    "SmilingWolf/wd-swinv2-tagger-v3",
];

/// A loaded tagging model.
pub trait Tagger: std::fmt::Debug {
    /// The identity this model was loaded as. Part of the cache key.
    fn identity(&self) -> &str;

    /// Run inference and return full per-category score maps.
    fn predict(&self, image: &DynamicImage) -> Result<RawPrediction, ModelError>;
}

/// Dispatch a model identity to its backend and load it.
///
/// The backend is chosen by identity prefix. Model files are expected under
/// `model_dir/<identity>` (the identity's slash becomes a path separator).
/// An identity that matches no prefix but names an existing local directory
/// is loaded from that directory with the WD backend.
pub fn load_tagger(identity: &str, model_dir: &Path) -> Result<Box<dyn Tagger>, ModelError> {
    if identity.starts_with("SmilingWolf/") {
        let tagger = WdTagger::load(identity, &model_dir.join(identity))?;
        return Ok(Box::new(tagger));
    }
    let local = Path::new(identity);
    if local.is_dir() {
        let tagger = WdTagger::load(identity, local)?;
        return Ok(Box::new(tagger));
    }
    Err(ModelError::Unrecognized(identity.to_string()))
}

/// Holds at most one loaded model and swaps it on demand.
///
/// Loading the identity that is already resident is a no-op, so a batch run
/// can call [`TaggerSession::ensure_loaded`] per file without paying for
/// repeated session construction.
#[derive(Default)]
pub struct TaggerSession {
    current: Option<Box<dyn Tagger>>,
}

impl TaggerSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity of the resident model, if any.
    pub fn loaded_identity(&self) -> Option<&str> {
        self.current.as_deref().map(|t| t.identity())
    }

    /// Make `identity` the resident model, loading it if needed.
    pub fn ensure_loaded(&mut self, identity: &str, model_dir: &Path) -> Result<(), ModelError> {
        if self.loaded_identity() == Some(identity) {
            return Ok(());
        }
        tracing::info!("Loading model {identity}");
        self.current = Some(load_tagger(identity, model_dir)?);
        Ok(())
    }

    /// Replace the resident model with an already-constructed tagger.
    /// Used by tests to install a mock backend.
    pub fn install(&mut self, tagger: Box<dyn Tagger>) {
        self.current = Some(tagger);
    }

    /// Run inference with the resident model.
    pub fn predict(&self, image: &DynamicImage) -> Result<RawPrediction, ModelError> {
        match &self.current {
            Some(tagger) => tagger.predict(image),
            None => Err(ModelError::NotLoaded),
        }
    }
}
