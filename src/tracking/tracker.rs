//! Modification-time change detection across scans.
//!
//! A path is unknown until [`ChangeTracker::update_state`] records it; from
//! then on it is reported as changed only when its modification time differs
//! from the recorded one, in either direction. Paths that disappear from the
//! candidates are left in the state untouched.

use super::state::TrackedState;
use crate::discovery::FileRef;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Classification of one candidate against the tracked state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChange {
    /// Never recorded
    New,
    /// Recorded with a different modification time
    Modified,
    /// Recorded with the same modification time
    Unchanged,
}

/// Tracker counters for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackerStats {
    /// Paths currently recorded
    pub tracked_files: usize,
}

/// Owner and single writer of the tracked state
#[derive(Debug)]
pub struct ChangeTracker {
    /// Where the state document lives
    state_file: PathBuf,
    /// In-memory copy of the document
    state: TrackedState,
}

impl ChangeTracker {
    /// Load the tracker state from `state_file` (empty if absent or corrupt)
    #[must_use]
    pub fn new(state_file: impl Into<PathBuf>) -> Self {
        let state_file = state_file.into();
        let state = TrackedState::load(&state_file);
        info!(tracked = state.len(), "Change tracker initialized");
        Self { state_file, state }
    }

    /// Location of the persisted document
    #[must_use]
    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    /// Classify a single candidate
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn classify(&self, file: &FileRef) -> FileChange {
        match self.state.mtime(&file.state_key()) {
            None => FileChange::New,
            // Exact comparison: any movement of the timestamp counts
            Some(recorded) if recorded != file.mtime => FileChange::Modified,
            Some(_) => FileChange::Unchanged,
        }
    }

    /// Candidates that are new or whose modification time moved.
    ///
    /// Duplicate paths in `candidates` are reported once; the input order is
    /// otherwise preserved.
    #[must_use]
    pub fn get_changed_files(&self, candidates: &[FileRef]) -> Vec<FileRef> {
        let mut seen = HashSet::with_capacity(candidates.len());
        let changed: Vec<FileRef> = candidates
            .iter()
            .filter(|file| seen.insert(file.path.as_path()))
            .filter(|file| match self.classify(file) {
                FileChange::New => {
                    debug!(path = %file.path.display(), "New file");
                    true
                }
                FileChange::Modified => {
                    debug!(path = %file.path.display(), "Modified file");
                    true
                }
                FileChange::Unchanged => false,
            })
            .cloned()
            .collect();

        info!(
            changed = changed.len(),
            total = candidates.len(),
            "Change detection finished"
        );
        changed
    }

    /// Record the modification time of every file and persist the state.
    ///
    /// The timestamp recorded is the one captured at discovery, so an edit
    /// made while the scan was running still shows up as a change next time.
    /// A failed write is logged; the next scan then re-analyzes more files
    /// than strictly needed, never fewer.
    pub fn update_state(&mut self, files: &[FileRef]) {
        for file in files {
            self.state.record(file.state_key(), file.mtime);
        }

        match self.state.save(&self.state_file) {
            Ok(()) => info!(files = files.len(), "State updated"),
            Err(e) => warn!(error = %e, "Error saving state"),
        }
    }

    /// Forget every tracked path, in memory and on disk
    pub fn reset(&mut self) {
        self.state = TrackedState::new();
        match std::fs::remove_file(&self.state_file) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.state_file.display(), error = %e, "Failed to remove state file"),
        }
        info!("State reset");
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> TrackerStats {
        TrackerStats {
            tracked_files: self.state.len(),
        }
    }

    /// Recorded modification time for `path`, if tracked
    #[must_use]
    pub fn tracked_mtime(&self, path: &Path) -> Option<f64> {
        self.state.mtime(&path.to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use filetime::{FileTime, set_file_mtime};
    use std::fs;
    use tempfile::TempDir;

    fn create_files(dir: &Path, count: usize) -> Result<Vec<FileRef>> {
        (0..count)
            .map(|i| -> Result<FileRef> {
                let path = dir.join(format!("test_{i}.py"));
                fs::write(&path, format!("# Test file {i}\ndef test():\n    pass\n"))?;
                Ok(FileRef::from_path(path)?)
            })
            .collect()
    }

    fn refresh(files: &[FileRef]) -> Result<Vec<FileRef>> {
        files
            .iter()
            .map(|f| -> Result<FileRef> { Ok(FileRef::from_path(&f.path)?) })
            .collect()
    }

    #[test]
    fn test_detects_new_files() -> Result<()> {
        let temp = TempDir::new()?;
        let files = create_files(temp.path(), 5)?;
        let tracker = ChangeTracker::new(temp.path().join("state.json"));

        assert_eq!(tracker.get_changed_files(&files).len(), 5);
        Ok(())
    }

    #[test]
    fn test_unchanged_after_update() -> Result<()> {
        let temp = TempDir::new()?;
        let files = create_files(temp.path(), 5)?;
        let mut tracker = ChangeTracker::new(temp.path().join("state.json"));

        tracker.update_state(&files);
        assert!(tracker.get_changed_files(&refresh(&files)?).is_empty());
        assert_eq!(tracker.stats().tracked_files, 5);
        Ok(())
    }

    #[test]
    fn test_detects_modified_file() -> Result<()> {
        let temp = TempDir::new()?;
        let files = create_files(temp.path(), 5)?;
        let mut tracker = ChangeTracker::new(temp.path().join("state.json"));
        tracker.update_state(&files);

        set_file_mtime(&files[2].path, FileTime::from_unix_time(2_000_000_000, 0))?;

        let changed = tracker.get_changed_files(&refresh(&files)?);
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].path, files[2].path);
        assert_eq!(tracker.classify(&changed[0]), FileChange::Modified);
        Ok(())
    }

    #[test]
    fn test_older_mtime_counts_as_change() -> Result<()> {
        let temp = TempDir::new()?;
        let files = create_files(temp.path(), 1)?;
        let mut tracker = ChangeTracker::new(temp.path().join("state.json"));
        tracker.update_state(&files);

        set_file_mtime(&files[0].path, FileTime::from_unix_time(1_000, 0))?;
        assert_eq!(tracker.get_changed_files(&refresh(&files)?).len(), 1);
        Ok(())
    }

    #[test]
    fn test_state_survives_reload() -> Result<()> {
        let temp = TempDir::new()?;
        let state_file = temp.path().join("state.json");
        let files = create_files(temp.path(), 3)?;

        ChangeTracker::new(&state_file).update_state(&files);

        let reloaded = ChangeTracker::new(&state_file);
        assert_eq!(reloaded.stats().tracked_files, 3);
        assert!(reloaded.get_changed_files(&refresh(&files)?).is_empty());
        assert_eq!(reloaded.tracked_mtime(&files[0].path), Some(files[0].mtime));
        Ok(())
    }

    #[test]
    fn test_reset_reports_everything_again() -> Result<()> {
        let temp = TempDir::new()?;
        let state_file = temp.path().join("state.json");
        let files = create_files(temp.path(), 4)?;
        let mut tracker = ChangeTracker::new(&state_file);
        tracker.update_state(&files);

        tracker.reset();
        assert!(!state_file.exists());
        assert_eq!(tracker.get_changed_files(&files).len(), 4);
        assert_eq!(ChangeTracker::new(&state_file).stats().tracked_files, 0);
        Ok(())
    }

    #[test]
    fn test_corrupt_state_means_everything_changed() -> Result<()> {
        let temp = TempDir::new()?;
        let state_file = temp.path().join("state.json");
        fs::write(&state_file, "garbage")?;
        let files = create_files(temp.path(), 3)?;

        let tracker = ChangeTracker::new(&state_file);
        assert_eq!(tracker.get_changed_files(&files).len(), 3);
        Ok(())
    }

    #[test]
    fn test_duplicates_reported_once() -> Result<()> {
        let temp = TempDir::new()?;
        let files = create_files(temp.path(), 1)?;
        let doubled = vec![files[0].clone(), files[0].clone()];

        let tracker = ChangeTracker::new(temp.path().join("state.json"));
        assert_eq!(tracker.get_changed_files(&doubled).len(), 1);
        Ok(())
    }

    #[test]
    fn test_absent_candidates_stay_tracked() -> Result<()> {
        let temp = TempDir::new()?;
        let files = create_files(temp.path(), 3)?;
        let mut tracker = ChangeTracker::new(temp.path().join("state.json"));
        tracker.update_state(&files);

        assert!(tracker.get_changed_files(&files[..1]).is_empty());
        assert_eq!(tracker.stats().tracked_files, 3);
        Ok(())
    }

    #[test]
    fn test_failed_save_keeps_memory_state() -> Result<()> {
        let temp = TempDir::new()?;
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "file, not dir")?;
        let files = create_files(temp.path(), 2)?;

        let mut tracker = ChangeTracker::new(blocker.join("state.json"));
        tracker.update_state(&files);
        assert_eq!(tracker.stats().tracked_files, 2);
        assert_eq!(
            ChangeTracker::new(blocker.join("state.json")).stats().tracked_files,
            0
        );
        Ok(())
    }
}
