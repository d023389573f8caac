//! Content hashing for cache identity.
//!
//! The cache key is the BLAKE3 hash of the raw file bytes, so a renamed or
//! moved file keeps its cached prediction and a re-encoded one does not.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use blake3::Hasher as Blake3Hasher;

/// A 32-byte BLAKE3 digest of a file's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash a file by streaming its contents.
    ///
    /// Uses a 64KB buffer so large images never land in memory whole.
    pub fn of_file(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut hasher = Blake3Hasher::new();

        let mut buffer = [0u8; 65536];
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(Self(*hasher.finalize().as_bytes()))
    }

    /// Hash an in-memory byte buffer. Used when the file has already been
    /// read for decoding, to avoid a second pass over the disk.
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Reconstruct from raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes, used as the store key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form for display and sidecar-adjacent tooling.
    pub fn to_hex(&self) -> String {
        blake3::Hash::from_bytes(self.0).to_hex().to_string()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
