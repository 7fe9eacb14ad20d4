//! File discovery for a scan.
//!
//! Walks a project root recursively and returns a [`FileRef`] for every
//! regular file whose name matches the scan pattern. Directories matching an
//! ignore pattern are pruned without being descended into, and so are
//! explicitly excluded paths such as the scanner's own cache and state.

use crate::error::ScanError;
use crate::utils::{should_ignore, system_time_to_secs};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A discovered file, fixed at discovery time for the rest of the scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Modification time in fractional seconds since the Unix epoch
    pub mtime: f64,
}

impl FileRef {
    /// Stat `path` and capture its size and modification time.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be read.
    pub fn from_path(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let metadata = std::fs::metadata(&path)?;
        Ok(Self {
            size: metadata.len(),
            mtime: metadata.modified().map(system_time_to_secs).unwrap_or(0.0),
            path,
        })
    }

    /// Key under which this file is recorded in tracked state
    #[must_use]
    pub fn state_key(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// Recursive file finder
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Patterns pruned during the walk
    ignore_patterns: Vec<String>,
    /// Resolved paths pruned during the walk
    excluded_paths: Vec<PathBuf>,
    /// Whether to follow symbolic links
    follow_symlinks: bool,
}

impl Discovery {
    /// Create a finder with the given ignore patterns and symlink policy
    #[must_use]
    pub const fn new(ignore_patterns: Vec<String>, follow_symlinks: bool) -> Self {
        Self {
            ignore_patterns,
            excluded_paths: Vec::new(),
            follow_symlinks,
        }
    }

    /// Also prune these files or directories wherever they fall under a root.
    ///
    /// Relative paths are resolved against the current directory now, so
    /// later walks compare them with canonical entry paths.
    #[must_use]
    pub fn exclude_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.excluded_paths
            .extend(paths.into_iter().map(|p| resolve_path(p.as_ref())));
        self
    }

    /// Find every file under `root` matching `pattern`.
    ///
    /// The pattern is a glob matched against the file name (`*.py`), or
    /// against the path relative to `root` when it contains a `/`
    /// (`src/**/*.rs`). Results are sorted by full path. Entries that cannot be
    /// read are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` does not exist or `pattern` is not a valid
    /// glob.
    pub fn discover(&self, root: &Path, pattern: &str) -> Result<Vec<FileRef>, ScanError> {
        if !root.exists() {
            return Err(ScanError::RootNotFound(root.to_path_buf()));
        }

        let matcher = Pattern::new(pattern).map_err(|e| ScanError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        let match_path = pattern.contains('/');

        let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        let mut files = Vec::new();

        let walker = WalkDir::new(&root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.should_skip(&root, e.path()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(&root).unwrap_or(entry.path());
            let matched = if match_path {
                matcher.matches_path(relative)
            } else {
                matcher.matches(&entry.file_name().to_string_lossy())
            };
            if !matched {
                continue;
            }

            match entry.metadata() {
                Ok(metadata) => files.push(FileRef {
                    path: entry.path().to_path_buf(),
                    size: metadata.len(),
                    mtime: metadata.modified().map(system_time_to_secs).unwrap_or(0.0),
                }),
                Err(e) => warn!(path = %entry.path().display(), error = %e, "Cannot stat file"),
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(root = %root.display(), pattern, count = files.len(), "Discovery finished");
        Ok(files)
    }

    /// Check whether a path below `root` is excluded
    fn should_skip(&self, root: &Path, path: &Path) -> bool {
        if self.excluded_paths.iter().any(|excluded| excluded == path) {
            return true;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        should_ignore(relative, &self.ignore_patterns)
    }
}

/// Canonical form of `path`, tolerating a final component that does not exist yet
fn resolve_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = std::fs::canonicalize(path) {
        return resolved;
    }
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let in_resolved_parent = absolute
        .parent()
        .zip(absolute.file_name())
        .and_then(|(parent, name)| std::fs::canonicalize(parent).ok().map(|p| p.join(name)));
    in_resolved_parent.unwrap_or(absolute)
}
