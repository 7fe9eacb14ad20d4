//! Incremental scanning: remembering what was already analyzed.
//!
//! Two pieces cooperate:
//!
//! - [`crate::tracking::TrackedState`] - the persisted path → mtime document
//! - [`crate::tracking::ChangeTracker`] - classifies candidates against it and
//!   re-baselines it after each scan
//!
//! # Usage
//!
//! ```no_run
//! use codepulse::discovery::Discovery;
//! use codepulse::tracking::ChangeTracker;
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let files = Discovery::default().discover(Path::new("./src"), "*.rs")?;
//!
//! let mut tracker = ChangeTracker::new(".codepulse_state.json");
//! let changed = tracker.get_changed_files(&files);
//! println!("{} of {} files changed", changed.len(), files.len());
//!
//! // ... analyze `changed` ...
//! tracker.update_state(&files);
//! # Ok(())
//! # }
//! ```

pub mod state;
pub mod tracker;

pub use state::TrackedState;
pub use tracker::{ChangeTracker, FileChange, TrackerStats};
