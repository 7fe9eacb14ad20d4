use std::fmt;
use std::path::PathBuf;

/// Failures that abort a scan before any work is distributed.
///
/// Everything past discovery (cache I/O, tracked-state persistence, individual
/// analyzer failures) is recovered locally and never surfaces here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// The project root does not exist
    RootNotFound(PathBuf),
    /// The file match pattern is not a valid glob
    InvalidPattern {
        /// Pattern as given by the caller
        pattern: String,
        /// Parser message
        reason: String,
    },
    /// The worker thread pool could not be created
    ThreadPool(String),
}

impl ScanError {
    /// Short hint on how to fix the error, if one applies
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::RootNotFound(_) => Some("Check the project path and try again"),
            Self::InvalidPattern { .. } => {
                Some("Use a glob matched against file names, e.g. '*.py' or 'test_*'")
            }
            Self::ThreadPool(_) => Some("Lower the worker count with --workers"),
        }
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotFound(path) => {
                write!(f, "Project path does not exist: {}", path.display())
            }
            Self::InvalidPattern { pattern, reason } => {
                write!(f, "Invalid file pattern '{pattern}': {reason}")
            }
            Self::ThreadPool(reason) => write!(f, "Failed to start worker pool: {reason}"),
        }
    }
}

impl std::error::Error for ScanError {}
