//! Tagyard Core - Embeddable dataset tagging library.
//!
//! Tagyard batch-captions image training datasets: every image in a folder
//! is run through a tagging classifier, the raw scores are cached by content
//! hash, and the selected tags are transformed into a caption sidecar file.
//!
//! # Architecture
//!
//! ```text
//! Folder → Hash → Cache / Predict (ONNX) → Threshold → Transform → Reconcile → Sidecar
//! ```
//!
//! Raw predictions are cached before thresholding, so changing thresholds or
//! transform rules never re-runs inference. Manual caption edits are stored
//! as (previous, edited) pairs and replayed onto fresh output at tag level.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::path::Path;
//! use tagyard_core::{BatchRunner, Config, DatasetSettings, SqliteStore, TaggerSession};
//!
//! fn main() -> tagyard_core::Result<()> {
//!     let config = Config::load()?;
//!     let store = SqliteStore::open(&config.store_path())?;
//!     let mut session = TaggerSession::new();
//!
//!     let folder = Path::new("./dataset");
//!     let settings = DatasetSettings::load(&store, "./dataset", &config.dataset_defaults())?;
//!     let mut runner = BatchRunner::new(&store, &mut session, &config.model_dir());
//!     let report = runner.run(folder, &settings, |_| true)?;
//!     println!("{} files captioned", report.succeeded());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod cache;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod reconcile;
pub mod settings;
pub mod store;
pub mod tagger;
pub mod threshold;
pub mod transform;
pub mod types;

// Re-exports for convenient access
pub use cache::PredictionCache;
pub use config::Config;
pub use error::{ConfigError, ModelError, PipelineError, Result, StoreError, TagyardError};
pub use pipeline::{BatchProgress, BatchRunner, ContentHash};
pub use reconcile::reconcile;
pub use settings::{DatasetSettings, DEFAULT_MODEL};
pub use store::{DatasetStore, ManualEdit, SqliteStore};
pub use tagger::{load_tagger, Tagger, TaggerSession, KNOWN_MODELS};
pub use threshold::{select_tags, ThresholdOptions};
pub use transform::{process_prediction, TagRules, PREFIX_SEPARATOR};
pub use types::{BatchReport, Caption, ProcessedFile, RawPrediction, ScoreMap, TagOutput};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
