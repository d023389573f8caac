//! Core data types for the Tagyard captioning pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Label -> confidence mapping.
///
/// A `BTreeMap` rather than a `HashMap`: iteration order is deterministic,
/// which keeps threshold tie-breaking stable and makes the cache encoding of
/// a given prediction byte-identical across runs.
pub type ScoreMap = BTreeMap<String, f32>;

/// Raw classifier output for one (image, model) evaluation.
///
/// Immutable once produced. Rating buckets are mutually exclusive and sum to
/// roughly 1.0; general and character maps are unordered tag -> confidence.
/// Thresholds and transforms are never applied here — this is exactly what
/// the cache stores, so changing thresholds never invalidates cache entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawPrediction {
    pub rating: ScoreMap,
    pub general: ScoreMap,
    pub character: ScoreMap,
}

/// An ordered sequence of caption tags.
///
/// Treated as an immutable value: the transform pipeline and the reconciler
/// both produce new `Caption`s rather than mutating in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Caption(Vec<String>);

/// Separator between caption tags in the sidecar text form.
pub const TAG_SEPARATOR: &str = ", ";

impl Caption {
    /// Build a caption from an ordered tag list.
    pub fn from_tags(tags: Vec<String>) -> Self {
        Self(tags)
    }

    /// Parse a comma-delimited caption string, trimming whitespace and
    /// dropping empty segments.
    pub fn parse(text: &str) -> Self {
        Self(
            text.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    /// The ordered tag sequence.
    pub fn tags(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_tags(self) -> Vec<String> {
        self.0
    }
}

impl fmt::Display for Caption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(TAG_SEPARATOR))
    }
}

/// Output of the tag transform pipeline for one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagOutput {
    /// The auto caption (no manual intervention applied).
    pub caption: Caption,

    /// Rating buckets, untouched by thresholds.
    pub rating: ScoreMap,

    /// General tags that survived thresholding (for display aggregation).
    pub general: ScoreMap,

    /// Character tags that survived thresholding.
    pub character: ScoreMap,
}

/// One successfully processed file in a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedFile {
    /// Absolute path to the source image
    pub path: PathBuf,

    /// Hex-encoded blake3 content hash
    pub content_hash: String,

    /// Pipeline output before manual-edit reconciliation
    pub auto_caption: Caption,

    /// Caption actually persisted to the sidecar (reconciled if a manual
    /// edit exists, otherwise identical to `auto_caption`)
    pub effective_caption: Caption,

    /// Whether the raw prediction came from the cache
    pub from_cache: bool,
}

/// Aggregate statistics for a batch run.
///
/// All averages and frequencies divide by the number of *successfully*
/// processed files, not by the total file count.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BatchReport {
    /// Per-file results, in processing order
    pub files: Vec<ProcessedFile>,

    /// Files that failed (unreadable or undecodable) and were skipped
    pub failed: usize,

    /// Raw predictions served from the cache
    pub cache_hits: usize,

    /// Sidecar files actually written
    pub sidecars_written: usize,

    /// Mean confidence per rating bucket across successful files
    pub rating_average: BTreeMap<String, f64>,

    /// Fraction of successful files in which each general tag was selected
    pub general_frequency: BTreeMap<String, f64>,

    /// Fraction of successful files in which each character tag was selected
    pub character_frequency: BTreeMap<String, f64>,

    /// Wall-clock duration of the run in seconds
    pub elapsed_seconds: f64,
}

impl BatchReport {
    /// Number of successfully processed files.
    pub fn succeeded(&self) -> usize {
        self.files.len()
    }
}
