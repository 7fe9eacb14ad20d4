//! Persisted record of the modification time last seen for each path.
//!
//! The document is a single JSON file:
//!
//! ```json
//! { "files": { "/abs/path/app.py": 1718000000.123456 } }
//! ```
//!
//! Loading never fails. A missing, unreadable or malformed document is the
//! empty state, which makes the next scan treat every file as changed.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Path → last observed modification time (fractional epoch seconds)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackedState {
    /// Tracked files keyed by their path string
    #[serde(default)]
    pub files: BTreeMap<String, f64>,
}

impl TrackedState {
    /// Create an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the document at `path`, falling back to the empty state
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No tracked state yet");
                return Self::new();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Error loading state");
                return Self::new();
            }
        };

        serde_json::from_slice(&data).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Malformed state document, starting fresh");
            Self::new()
        })
    }

    /// Write the document to `path`.
    ///
    /// Holds an exclusive lock on `<path>.lock` while writing, and replaces
    /// the document through a rename so readers see either the old or the
    /// new version in full.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock, the temporary file or the rename fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        let lock_path = lock_path_for(path);
        let lock = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;
        lock.lock_exclusive()
            .context("Failed to acquire exclusive lock on state file")?;

        let result = self.write_atomic(&dir, path);

        if let Err(e) = FileExt::unlock(&lock) {
            warn!(path = %lock_path.display(), error = %e, "Failed to unlock state file");
        }
        result
    }

    /// Serialize into a sibling temp file and rename it over `path`
    fn write_atomic(&self, dir: &Path, path: &Path) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        serde_json::to_writer_pretty(&mut tmp, self).context("Failed to serialize state")?;
        tmp.flush().context("Failed to flush state")?;
        tmp.persist(path)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;
        Ok(())
    }

    /// Recorded modification time for `key`
    #[must_use]
    pub fn mtime(&self, key: &str) -> Option<f64> {
        self.files.get(key).copied()
    }

    /// Record (or overwrite) the modification time for `key`
    pub fn record(&mut self, key: String, mtime: f64) {
        self.files.insert(key, mtime);
    }

    /// Number of tracked paths
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no paths are tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Lock file guarding writes to the document at `path`
#[must_use]
pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}
