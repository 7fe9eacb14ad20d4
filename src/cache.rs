//! Content-addressed store of analysis results.
//!
//! Entries are keyed by the digest of a file's bytes, never by its path, so
//! renaming, moving or copying a file with unchanged content is always a hit.
//! Each entry is one JSON file named after the truncated digest:
//!
//! ```text
//! <cache_dir>/
//!   3f1a9c0e5b7d2468.json   { "digest": "<64 hex>", "stored_at": "...", "payload": {...} }
//!   ...
//! ```
//!
//! The cache never fails a scan. Every I/O or decode error is logged and
//! treated as a miss (on read) or a no-op (on write).

use crate::utils::hash::{ContentDigest, hash_file};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Extension of entry files inside the cache directory
const ENTRY_EXTENSION: &str = "json";

/// One stored analysis result.
///
/// Written once per content digest and replaced wholesale on rewrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Full hex digest of the content this payload was computed from
    pub digest: String,
    /// When the entry was written
    pub stored_at: DateTime<Utc>,
    /// Analyzer output, opaque to the engine
    pub payload: Value,
}

/// How a single file's lookup went
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheOutcome {
    /// Result served from the cache
    Hit,
    /// Not cached; the analyzer ran
    Miss,
    /// Cache disabled or the file could not be hashed
    Bypassed,
}

/// Hit/miss counters for reporting
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that fell through to the analyzer
    pub misses: u64,
    /// `hits + misses`
    pub total_requests: u64,
    /// Hits as a percentage of all requests (0 when there were none)
    pub hit_rate: f64,
}

impl CacheStats {
    /// Derive the full stats block from raw counters
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_counts(hits: u64, misses: u64) -> Self {
        let total_requests = hits + misses;
        let hit_rate = if total_requests == 0 {
            0.0
        } else {
            hits as f64 / total_requests as f64 * 100.0
        };
        Self {
            hits,
            misses,
            total_requests,
            hit_rate,
        }
    }
}

/// Directory-backed content cache.
///
/// Lookups and writes take `&self` and are safe to call from many workers at
/// once: distinct contents never share an entry file, and two workers writing
/// the same content race benignly (last writer wins with an identical
/// payload). The hit/miss counters are only touched through `&mut self`,
/// either by [`ContentCache::get`] or by merging per-scan tallies with
/// [`ContentCache::record`].
#[derive(Debug)]
pub struct ContentCache {
    /// Directory holding one file per entry
    dir: PathBuf,
    /// Cumulative hits since creation or the last clear
    hits: u64,
    /// Cumulative misses since creation or the last clear
    misses: u64,
}

impl ContentCache {
    /// Open (creating if needed) a cache rooted at `dir`.
    ///
    /// A directory that cannot be created is logged; every later lookup then
    /// misses and every write is dropped.
    #[must_use]
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!(dir = %dir.display(), error = %e, "Cannot create cache directory");
        }
        info!(dir = %dir.display(), "Cache initialized");
        Self {
            dir,
            hits: 0,
            misses: 0,
        }
    }

    /// Directory holding the entries
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Look up the cached result for `file`'s current content, counting the
    /// hit or miss.
    ///
    /// Returns `None` when the file cannot be read; that does not count as a
    /// request.
    pub fn get(&mut self, file: &Path) -> Option<Value> {
        let digest = Self::digest_of(file)?;
        let found = self.load(&digest);
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    /// Store `payload` as the result for `file`'s current content.
    ///
    /// Returns `false` if the file could not be hashed or the entry could not
    /// be written.
    pub fn set(&self, file: &Path, payload: &Value) -> bool {
        Self::digest_of(file).is_some_and(|digest| self.store(&digest, payload))
    }

    /// Hash `file`, logging instead of failing
    pub(crate) fn digest_of(file: &Path) -> Option<ContentDigest> {
        match hash_file(file) {
            Ok(digest) => Some(digest),
            Err(e) => {
                warn!(path = %file.display(), error = %e, "Cannot hash file, bypassing cache");
                None
            }
        }
    }

    /// Fetch the payload stored for `digest` without touching counters.
    ///
    /// An entry whose recorded digest differs from `digest` (a truncated-key
    /// collision) is treated as a miss.
    #[must_use]
    pub fn load(&self, digest: &ContentDigest) -> Option<Value> {
        let path = self.entry_path(digest);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(key = %digest.storage_key(), "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cache read error");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&data) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt cache entry");
                return None;
            }
        };

        if entry.digest != digest.to_hex() {
            debug!(key = %digest.storage_key(), "Cache key collision, treating as miss");
            return None;
        }

        debug!(key = %digest.storage_key(), "Cache hit");
        Some(entry.payload)
    }

    /// Write `payload` under `digest`, replacing any previous entry.
    ///
    /// The entry is written to a temporary file and renamed into place, so a
    /// reader never observes a partial entry.
    pub fn store(&self, digest: &ContentDigest, payload: &Value) -> bool {
        match self.write_entry(digest, payload) {
            Ok(()) => {
                debug!(key = %digest.storage_key(), "Cached");
                true
            }
            Err(e) => {
                warn!(key = %digest.storage_key(), error = %e, "Cache write error");
                false
            }
        }
    }

    /// Fallible half of [`ContentCache::store`]
    fn write_entry(&self, digest: &ContentDigest, payload: &Value) -> Result<()> {
        let entry = CacheEntry {
            digest: digest.to_hex(),
            stored_at: Utc::now(),
            payload: payload.clone(),
        };

        let mut tmp = NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("Failed to create temp file in {}", self.dir.display()))?;
        serde_json::to_writer_pretty(&mut tmp, &entry).context("Failed to encode cache entry")?;
        tmp.flush()?;
        tmp.persist(self.entry_path(digest))
            .context("Failed to move cache entry into place")?;
        Ok(())
    }

    /// Remove every entry and reset the counters
    pub fn clear(&mut self) {
        if self.dir.exists()
            && let Err(e) = std::fs::remove_dir_all(&self.dir)
        {
            warn!(dir = %self.dir.display(), error = %e, "Failed to remove cache directory");
        }
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), error = %e, "Cannot recreate cache directory");
        }
        self.hits = 0;
        self.misses = 0;
        info!("Cache cleared");
    }

    /// Merge hits and misses observed elsewhere (e.g. by workers) into the
    /// cumulative counters
    pub fn record(&mut self, hits: u64, misses: u64) {
        self.hits += hits;
        self.misses += misses;
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats::from_counts(self.hits, self.misses)
    }

    /// Total bytes occupied by entry files
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return 0;
        };

        entries
            .filter_map(std::result::Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == ENTRY_EXTENSION))
            .filter_map(|e| e.metadata().ok())
            .map(|m| m.len())
            .sum()
    }

    /// Location of the entry for `digest`
    fn entry_path(&self, digest: &ContentDigest) -> PathBuf {
        self.dir
            .join(format!("{}.{ENTRY_EXTENSION}", digest.storage_key()))
    }
}
