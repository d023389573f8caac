//! Batch orchestration: one sequential pass over a dataset folder.
//!
//! Per file: hash, cache lookup, inference on miss, transform, manual-edit
//! reconciliation, sidecar write, aggregation. A file that cannot be read,
//! decoded or predicted is skipped with a warning; the run continues. Store
//! and model-load failures abort the run, since every remaining file would
//! hit them too.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use crate::cache::PredictionCache;
use crate::error::{Result, TagyardError};
use crate::reconcile::reconcile;
use crate::settings::DatasetSettings;
use crate::store::DatasetStore;
use crate::tagger::TaggerSession;
use crate::transform::process_prediction;
use crate::types::{BatchReport, Caption, ProcessedFile, RawPrediction};

use super::discovery::discover_images;
use super::hash::ContentHash;
use super::sidecar::write_caption;

/// Progress report for one file about to be processed.
#[derive(Debug, Clone, Copy)]
pub struct BatchProgress<'a> {
    /// Zero-based index of the current file.
    pub index: usize,
    /// Total number of candidate files.
    pub total: usize,
    /// Path of the current file.
    pub path: &'a Path,
}

/// Runs batch passes over dataset folders.
pub struct BatchRunner<'a> {
    store: &'a dyn DatasetStore,
    session: &'a mut TaggerSession,
    model_dir: &'a Path,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        store: &'a dyn DatasetStore,
        session: &'a mut TaggerSession,
        model_dir: &'a Path,
    ) -> Self {
        Self {
            store,
            session,
            model_dir,
        }
    }

    /// Process every image in `folder` with the given settings.
    ///
    /// The progress callback runs before each file; returning `false`
    /// cancels the run and the report covers what was completed.
    pub fn run(
        &mut self,
        folder: &Path,
        settings: &DatasetSettings,
        mut progress: impl FnMut(BatchProgress<'_>) -> bool,
    ) -> Result<BatchReport> {
        let start = Instant::now();
        let folder_key = folder.to_string_lossy().to_string();

        self.store.record_recent(&folder_key)?;

        let files = discover_images(folder)?;
        tracing::info!("Processing {} files in {}", files.len(), folder.display());

        let cache = PredictionCache::new(self.store, settings.model.clone());
        let general_options = settings.general_options();
        let character_options = settings.character_options();
        let rules = settings.tag_rules();

        let mut report = BatchReport::default();
        let mut rating_sums: BTreeMap<String, f64> = BTreeMap::new();
        let mut general_counts: BTreeMap<String, f64> = BTreeMap::new();
        let mut character_counts: BTreeMap<String, f64> = BTreeMap::new();

        let total = files.len();
        for (index, path) in files.iter().enumerate() {
            if !progress(BatchProgress {
                index,
                total,
                path,
            }) {
                tracing::info!("Run cancelled after {} files", report.succeeded());
                break;
            }

            let hash = match ContentHash::of_file(path) {
                Ok(hash) => hash,
                Err(e) => {
                    tracing::warn!("Skipping unreadable file {:?}: {e}", path);
                    report.failed += 1;
                    continue;
                }
            };

            let (prediction, from_cache) = match cache.get(&hash)? {
                Some(prediction) => (prediction, true),
                None => match self.predict(path, settings)? {
                    Some(prediction) => {
                        cache.put(&hash, &folder_key, &prediction)?;
                        (prediction, false)
                    }
                    None => {
                        report.failed += 1;
                        continue;
                    }
                },
            };
            if from_cache {
                report.cache_hits += 1;
            }

            let output =
                process_prediction(&prediction, general_options, character_options, &rules);

            let effective = match self.store.get_edit(&folder_key, &hash)? {
                Some(edit) => reconcile(
                    &Caption::parse(&edit.previous),
                    &Caption::parse(&edit.edited),
                    &output.caption,
                ),
                None => output.caption.clone(),
            };

            match write_caption(path, &effective.to_string(), settings.overwrite_captions) {
                Ok(true) => report.sidecars_written += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Skipping {:?}: {e}", path);
                    report.failed += 1;
                    continue;
                }
            }

            for (bucket, &score) in &output.rating {
                *rating_sums.entry(bucket.clone()).or_default() += score as f64;
            }
            for tag in output.general.keys() {
                *general_counts.entry(tag.clone()).or_default() += 1.0;
            }
            for tag in output.character.keys() {
                *character_counts.entry(tag.clone()).or_default() += 1.0;
            }

            report.files.push(ProcessedFile {
                path: path.clone(),
                content_hash: hash.to_hex(),
                auto_caption: output.caption,
                effective_caption: effective,
                from_cache,
            });
        }

        let succeeded = report.succeeded();
        if succeeded > 0 {
            let divisor = succeeded as f64;
            report.rating_average = rating_sums
                .into_iter()
                .map(|(k, v)| (k, v / divisor))
                .collect();
            report.general_frequency = general_counts
                .into_iter()
                .map(|(k, v)| (k, v / divisor))
                .collect();
            report.character_frequency = character_counts
                .into_iter()
                .map(|(k, v)| (k, v / divisor))
                .collect();
        }

        report.elapsed_seconds = start.elapsed().as_secs_f64();
        tracing::info!(
            "Finished {}: {} ok, {} failed, {} cache hits in {:.1}s",
            folder.display(),
            succeeded,
            report.failed,
            report.cache_hits,
            report.elapsed_seconds
        );
        Ok(report)
    }

    /// Decode and predict one file. `Ok(None)` means the file was skipped.
    fn predict(
        &mut self,
        path: &Path,
        settings: &DatasetSettings,
    ) -> Result<Option<RawPrediction>> {
        let image = match image::open(path) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!("Skipping undecodable file {:?}: {e}", path);
                return Ok(None);
            }
        };

        // A model that cannot load would fail for every file, so this
        // error aborts the run.
        self.session.ensure_loaded(&settings.model, self.model_dir)?;

        match self.session.predict(&image) {
            Ok(prediction) => Ok(Some(prediction)),
            Err(crate::error::ModelError::NotLoaded) => {
                Err(TagyardError::from(crate::error::ModelError::NotLoaded))
            }
            Err(e) => {
                tracing::warn!("Inference failed for {:?}: {e}", path);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::pipeline::sidecar::{read_caption, sidecar_path};
    use crate::store::SqliteStore;
    use crate::tagger::Tagger;
    use crate::types::ScoreMap;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::cell::Cell;
    use std::fs;
    use std::path::PathBuf;
    use std::rc::Rc;

    #[derive(Debug)]
    struct MockTagger {
        identity: String,
        calls: Rc<Cell<usize>>,
        prediction: RawPrediction,
    }

    impl Tagger for MockTagger {
        fn identity(&self) -> &str {
            &self.identity
        }

        fn predict(&self, _image: &DynamicImage) -> std::result::Result<RawPrediction, ModelError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.prediction.clone())
        }
    }

    fn mock_prediction() -> RawPrediction {
        RawPrediction {
            rating: [("general".to_string(), 0.8), ("sensitive".to_string(), 0.2)]
                .into_iter()
                .collect(),
            general: [("1girl".to_string(), 0.9), ("solo".to_string(), 0.6)]
                .into_iter()
                .collect(),
            character: ScoreMap::new(),
        }
    }

    fn test_settings() -> DatasetSettings {
        DatasetSettings {
            model: "Mock/model".to_string(),
            ..DatasetSettings::default()
        }
    }

    fn session_with_mock(calls: &Rc<Cell<usize>>) -> TaggerSession {
        let mut session = TaggerSession::new();
        session.install(Box::new(MockTagger {
            identity: "Mock/model".to_string(),
            calls: Rc::clone(calls),
            prediction: mock_prediction(),
        }));
        session
    }

    fn write_png(dir: &Path, name: &str, shade: u8) -> PathBuf {
        let path = dir.join(name);
        let img = RgbImage::from_pixel(4, 4, Rgb([shade, 0, 0]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn processes_all_files_and_writes_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", 10);
        write_png(dir.path(), "b.png", 20);

        let store = SqliteStore::open_in_memory().unwrap();
        let calls = Rc::new(Cell::new(0));
        let mut session = session_with_mock(&calls);
        let mut runner = BatchRunner::new(&store, &mut session, Path::new("/models"));

        let report = runner.run(dir.path(), &test_settings(), |_| true).unwrap();

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed, 0);
        assert_eq!(report.cache_hits, 0);
        assert_eq!(report.sidecars_written, 2);
        assert_eq!(calls.get(), 2);

        let caption = read_caption(&dir.path().join("a.png")).unwrap().unwrap();
        assert_eq!(caption, "1girl, solo");
    }

    #[test]
    fn second_run_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", 10);

        let store = SqliteStore::open_in_memory().unwrap();
        let calls = Rc::new(Cell::new(0));
        let mut session = session_with_mock(&calls);
        let mut runner = BatchRunner::new(&store, &mut session, Path::new("/models"));

        runner.run(dir.path(), &test_settings(), |_| true).unwrap();
        let second = runner.run(dir.path(), &test_settings(), |_| true).unwrap();

        assert_eq!(second.cache_hits, 1);
        assert_eq!(calls.get(), 1, "second run must not re-run inference");
    }

    #[test]
    fn duplicate_content_predicts_once() {
        let dir = tempfile::tempdir().unwrap();
        // Identical pixel data, so identical content hashes.
        write_png(dir.path(), "a.png", 10);
        write_png(dir.path(), "copy.png", 10);

        let store = SqliteStore::open_in_memory().unwrap();
        let calls = Rc::new(Cell::new(0));
        let mut session = session_with_mock(&calls);
        let mut runner = BatchRunner::new(&store, &mut session, Path::new("/models"));

        let report = runner.run(dir.path(), &test_settings(), |_| true).unwrap();

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.cache_hits, 1);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn undecodable_file_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "good.png", 10);
        fs::write(dir.path().join("bad.png"), b"this is not a png").unwrap();

        let store = SqliteStore::open_in_memory().unwrap();
        let calls = Rc::new(Cell::new(0));
        let mut session = session_with_mock(&calls);
        let mut runner = BatchRunner::new(&store, &mut session, Path::new("/models"));

        let report = runner.run(dir.path(), &test_settings(), |_| true).unwrap();

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed, 1);
        assert!(!sidecar_path(&dir.path().join("bad.png")).exists());
    }

    #[test]
    fn manual_edit_is_reconciled_into_the_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_png(dir.path(), "a.png", 10);

        let store = SqliteStore::open_in_memory().unwrap();
        let hash = ContentHash::of_file(&image).unwrap();
        let folder_key = dir.path().to_string_lossy().to_string();
        // The operator removed "solo" and added "red dress".
        store
            .set_edit(&folder_key, &hash, "1girl, solo", "1girl, red dress")
            .unwrap();

        let calls = Rc::new(Cell::new(0));
        let mut session = session_with_mock(&calls);
        let mut runner = BatchRunner::new(&store, &mut session, Path::new("/models"));

        let settings = DatasetSettings {
            overwrite_captions: true,
            ..test_settings()
        };
        let report = runner.run(dir.path(), &settings, |_| true).unwrap();

        assert_eq!(report.files[0].auto_caption.to_string(), "1girl, solo");
        assert_eq!(
            report.files[0].effective_caption.to_string(),
            "1girl, red dress"
        );
        assert_eq!(read_caption(&image).unwrap().unwrap(), "1girl, red dress");
    }

    #[test]
    fn existing_sidecar_is_preserved_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_png(dir.path(), "a.png", 10);
        fs::write(sidecar_path(&image), "hand written").unwrap();

        let store = SqliteStore::open_in_memory().unwrap();
        let calls = Rc::new(Cell::new(0));
        let mut session = session_with_mock(&calls);
        let mut runner = BatchRunner::new(&store, &mut session, Path::new("/models"));

        let report = runner.run(dir.path(), &test_settings(), |_| true).unwrap();

        assert_eq!(report.sidecars_written, 0);
        assert_eq!(read_caption(&image).unwrap().unwrap(), "hand written");
    }

    #[test]
    fn aggregates_divide_by_successful_count_only() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", 10);
        write_png(dir.path(), "b.png", 20);
        fs::write(dir.path().join("bad.png"), b"garbage").unwrap();

        let store = SqliteStore::open_in_memory().unwrap();
        let calls = Rc::new(Cell::new(0));
        let mut session = session_with_mock(&calls);
        let mut runner = BatchRunner::new(&store, &mut session, Path::new("/models"));

        let report = runner.run(dir.path(), &test_settings(), |_| true).unwrap();

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed, 1);
        // Every successful file rated 0.8, so the average is 0.8 despite
        // the failed file.
        assert!((report.rating_average["general"] - 0.8).abs() < 1e-9);
        assert!((report.general_frequency["1girl"] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cancelled_run_reports_completed_files() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", 10);
        write_png(dir.path(), "b.png", 20);

        let store = SqliteStore::open_in_memory().unwrap();
        let calls = Rc::new(Cell::new(0));
        let mut session = session_with_mock(&calls);
        let mut runner = BatchRunner::new(&store, &mut session, Path::new("/models"));

        let report = runner
            .run(dir.path(), &test_settings(), |p| p.index == 0)
            .unwrap();

        assert_eq!(report.succeeded(), 1);
    }

    #[test]
    fn run_records_the_folder_as_recent() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", 10);

        let store = SqliteStore::open_in_memory().unwrap();
        let calls = Rc::new(Cell::new(0));
        let mut session = session_with_mock(&calls);
        let mut runner = BatchRunner::new(&store, &mut session, Path::new("/models"));

        runner.run(dir.path(), &test_settings(), |_| true).unwrap();

        let recent = store.recent_folders().unwrap();
        assert_eq!(recent, vec![dir.path().to_string_lossy().to_string()]);
    }

    #[test]
    fn missing_folder_is_a_fatal_input_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let calls = Rc::new(Cell::new(0));
        let mut session = session_with_mock(&calls);
        let mut runner = BatchRunner::new(&store, &mut session, Path::new("/models"));

        let result = runner.run(Path::new("/nonexistent/folder"), &test_settings(), |_| true);
        assert!(result.is_err());
    }
}
