//! Dataset processing pipeline: discovery, hashing, sidecars, batch runs.

pub mod batch;
pub mod discovery;
pub mod hash;
pub mod sidecar;

pub use batch::{BatchProgress, BatchRunner};
pub use discovery::discover_images;
pub use hash::ContentHash;
pub use sidecar::{read_caption, sidecar_path, write_caption};
