//! Prediction cache: compressed binary codec over the dataset store.
//!
//! Values are bincode-encoded [`RawPrediction`]s behind gzip. `ScoreMap` is
//! an ordered map, so encoding the same prediction twice yields identical
//! bytes and re-puts are no-ops at the store level.
//!
//! Corruption policy: a cache entry that fails to decompress or decode is
//! treated as a miss and logged at warn level. The subsequent put for the
//! same key overwrites the bad entry.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::error::StoreError;
use crate::pipeline::hash::ContentHash;
use crate::store::DatasetStore;
use crate::types::RawPrediction;

/// A cache value that could not be produced or understood.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode prediction: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode prediction: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("compression failed: {0}")]
    Compression(#[from] std::io::Error),
}

/// Encode a prediction to its stored byte form.
pub fn encode_prediction(prediction: &RawPrediction) -> Result<Vec<u8>, CodecError> {
    let raw = bincode::serde::encode_to_vec(prediction, bincode::config::standard())?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw)?;
    Ok(encoder.finish()?)
}

/// Decode a stored byte form back to a prediction.
pub fn decode_prediction(data: &[u8]) -> Result<RawPrediction, CodecError> {
    let mut decoder = GzDecoder::new(data);
    let mut raw = Vec::new();
    decoder.read_to_end(&mut raw)?;
    let (prediction, _) = bincode::serde::decode_from_slice(&raw, bincode::config::standard())?;
    Ok(prediction)
}

/// Content-addressed prediction cache over a [`DatasetStore`].
///
/// Keys are (content hash, model identity). The folder is recorded for
/// bookkeeping but never consulted on lookup, so a file copied between
/// datasets hits the same entry.
pub struct PredictionCache<'a> {
    store: &'a dyn DatasetStore,
    model: String,
}

impl<'a> PredictionCache<'a> {
    pub fn new(store: &'a dyn DatasetStore, model: impl Into<String>) -> Self {
        Self {
            store,
            model: model.into(),
        }
    }

    /// Model identity this cache reads and writes under.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Look up a prediction. Corrupt entries decode as misses.
    pub fn get(&self, hash: &ContentHash) -> Result<Option<RawPrediction>, StoreError> {
        let Some(data) = self.store.get_cache(hash, &self.model)? else {
            return Ok(None);
        };
        match decode_prediction(&data) {
            Ok(prediction) => Ok(Some(prediction)),
            Err(e) => {
                tracing::warn!("Discarding corrupt cache entry for {hash}: {e}");
                Ok(None)
            }
        }
    }

    /// Store a prediction under (hash, model).
    pub fn put(
        &self,
        hash: &ContentHash,
        folder: &str,
        prediction: &RawPrediction,
    ) -> Result<(), StoreError> {
        match encode_prediction(prediction) {
            Ok(data) => self.store.put_cache(hash, &self.model, folder, &data),
            Err(e) => {
                // An unencodable prediction is a bug, not an I/O condition.
                // Skip the write rather than poison the cache.
                tracing::warn!("Skipping cache write for {hash}: {e}");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::types::ScoreMap;

    fn sample() -> RawPrediction {
        RawPrediction {
            rating: [("general".to_string(), 0.92), ("sensitive".to_string(), 0.05)]
                .into_iter()
                .collect(),
            general: [("1girl".to_string(), 0.98), ("solo".to_string(), 0.95)]
                .into_iter()
                .collect(),
            character: [("alice".to_string(), 0.7)].into_iter().collect(),
        }
    }

    #[test]
    fn codec_round_trip() {
        let p = sample();
        let encoded = encode_prediction(&p).unwrap();
        assert_eq!(decode_prediction(&encoded).unwrap(), p);
    }

    #[test]
    fn codec_round_trip_empty_maps() {
        let p = RawPrediction {
            rating: ScoreMap::new(),
            general: ScoreMap::new(),
            character: ScoreMap::new(),
        };
        let encoded = encode_prediction(&p).unwrap();
        assert_eq!(decode_prediction(&encoded).unwrap(), p);
    }

    #[test]
    fn encoding_is_deterministic() {
        // Ordered maps make the byte form stable, which keeps re-puts
        // idempotent at the store level.
        let a = encode_prediction(&sample()).unwrap();
        let b = encode_prediction(&sample()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_prediction(b"definitely not gzip").is_err());
    }

    #[test]
    fn cache_round_trip_through_store() {
        let store = SqliteStore::open_in_memory().unwrap();
        let cache = PredictionCache::new(&store, "model-a");
        let h = ContentHash::of_bytes(b"image bytes");

        assert!(cache.get(&h).unwrap().is_none());
        cache.put(&h, "/data", &sample()).unwrap();
        assert_eq!(cache.get(&h).unwrap(), Some(sample()));
    }

    #[test]
    fn cache_is_scoped_by_model_identity() {
        let store = SqliteStore::open_in_memory().unwrap();
        let h = ContentHash::of_bytes(b"image bytes");

        PredictionCache::new(&store, "model-a")
            .put(&h, "/data", &sample())
            .unwrap();
        assert!(PredictionCache::new(&store, "model-b")
            .get(&h)
            .unwrap()
            .is_none());
    }

    #[test]
    fn corrupt_entry_reads_as_miss() {
        let store = SqliteStore::open_in_memory().unwrap();
        let h = ContentHash::of_bytes(b"image bytes");
        store.put_cache(&h, "model-a", "/data", b"corrupt").unwrap();

        let cache = PredictionCache::new(&store, "model-a");
        assert!(cache.get(&h).unwrap().is_none());

        // The next put repairs the entry.
        cache.put(&h, "/data", &sample()).unwrap();
        assert_eq!(cache.get(&h).unwrap(), Some(sample()));
    }
}
