//! Content digests used as cache keys.
//!
//! A digest is the SHA-256 of a file's full byte content. Two files with the
//! same bytes always share a digest, whatever their path.

use anyhow::{Context, Result};
use memmap2::MmapOptions;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Files at or above this size are hashed through a memory map.
pub const MMAP_THRESHOLD: u64 = 1_048_576;

/// Number of hex characters of the digest used as the on-disk cache key.
pub const STORAGE_KEY_LEN: usize = 16;

/// SHA-256 digest of a file's byte content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Full lowercase hex form (64 characters).
    #[must_use]
    pub fn to_hex(&self) -> String {
        use std::fmt::Write;
        self.0.iter().fold(String::with_capacity(64), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
    }

    /// Truncated hex form used to name cache entries.
    ///
    /// Truncation to 64 bits leaves a nonzero collision probability; the full
    /// digest is stored inside each entry and checked on read.
    #[must_use]
    pub fn storage_key(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(STORAGE_KEY_LEN);
        hex
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Digest of an in-memory buffer.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> ContentDigest {
    ContentDigest(Sha256::digest(data).into())
}

/// Digest of a file's full content.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, mapped or read.
pub fn hash_file(path: &Path) -> Result<ContentDigest> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let len = file.metadata()?.len();

    if len == 0 {
        return Ok(hash_bytes(b""));
    }

    if len < MMAP_THRESHOLD {
        hash_file_streaming(path)
    } else {
        // SAFETY: the map is read-only and dropped before returning. A file
        // truncated underneath us can fault, the same as every mmap reader.
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        Ok(hash_bytes(&mmap))
    }
}

/// Digest of a file read in fixed-size chunks
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn hash_file_streaming(path: &Path) -> Result<ContentDigest> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 65536];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(ContentDigest(hasher.finalize().into()))
}
