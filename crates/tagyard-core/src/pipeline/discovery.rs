//! File discovery for dataset folders.
//!
//! Datasets are flat folders: one level of image files with their caption
//! sidecars next to them. Discovery is deliberately non-recursive so a
//! nested output or backup directory never leaks into a run.

use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Extensions that are never dataset images (sidecars and tool droppings).
const SKIP_EXTENSIONS: &[&str] = &["txt", "npz", "json"];

/// List candidate image files in a dataset folder, sorted by path.
///
/// Subdirectories and known non-image extensions are skipped. Anything else
/// is a candidate; files that fail to decode are handled per file by the
/// batch runner, not here.
pub fn discover_images(folder: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    if !folder.is_dir() {
        return Err(PipelineError::Input(format!(
            "{} is not a directory",
            folder.display()
        )));
    }

    let entries = std::fs::read_dir(folder).map_err(|e| {
        PipelineError::Input(format!("cannot read {}: {e}", folder.display()))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            PipelineError::Input(format!("cannot read {}: {e}", folder.display()))
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if is_skipped(&path) {
            continue;
        }
        files.push(path);
    }

    // Sort by path for deterministic ordering
    files.sort();
    Ok(files)
}

fn is_skipped(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            SKIP_EXTENSIONS.iter().any(|s| *s == ext)
        })
        .unwrap_or(false)
}
