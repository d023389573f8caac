//! Caption sidecar files.
//!
//! A caption for `image.png` lives in `image.txt` next to it. Existing
//! sidecars are left alone unless the overwrite flag is set, so hand-tuned
//! caption files survive a re-run by default.

use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// The sidecar path for an image: same stem, `.txt` extension.
pub fn sidecar_path(image: &Path) -> PathBuf {
    image.with_extension("txt")
}

/// Write a caption sidecar. Returns `true` if the file was written,
/// `false` if an existing sidecar was preserved.
pub fn write_caption(image: &Path, caption: &str, overwrite: bool) -> Result<bool, PipelineError> {
    let path = sidecar_path(image);
    if path.exists() && !overwrite {
        tracing::debug!("Keeping existing sidecar {:?}", path);
        return Ok(false);
    }
    std::fs::write(&path, caption).map_err(|e| PipelineError::Sidecar {
        path: path.clone(),
        message: e.to_string(),
    })?;
    Ok(true)
}

/// Read an existing caption sidecar, if present.
pub fn read_caption(image: &Path) -> Result<Option<String>, PipelineError> {
    let path = sidecar_path(image);
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path).map_err(|e| PipelineError::Sidecar {
        path: path.clone(),
        message: e.to_string(),
    })?;
    Ok(Some(text))
}
