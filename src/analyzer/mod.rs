//! Per-file analyzers.
//!
//! The engine only knows the [`Analyzer`] capability: give it a path, get back
//! an opaque JSON document or an error. Anything implementing it can be
//! plugged into [`crate::coordinator::ScanCoordinator`], including plain
//! closures.
//!
//! ```
//! use codepulse::analyzer::Analyzer;
//! use serde_json::json;
//! use std::path::Path;
//!
//! let line_counter = |path: &Path| -> anyhow::Result<serde_json::Value> {
//!     let text = std::fs::read_to_string(path)?;
//!     Ok(json!({ "lines": text.lines().count() }))
//! };
//! assert!(line_counter.analyze(Path::new("/no/such/file")).is_err());
//! ```

/// Built-in language/metrics analyzer
pub mod metrics;

pub use metrics::FileMetricsAnalyzer;

use anyhow::Result;
use serde_json::Value;
use std::path::Path;

/// Something that turns one file into an analysis document.
///
/// Implementations are shared across worker threads and must not rely on
/// call order. Returning `Err` marks that file as failed without affecting
/// any other file; panics are caught by the pool and treated the same way.
pub trait Analyzer: Send + Sync {
    /// Analyze the file at `path`
    ///
    /// # Errors
    ///
    /// Any error is recorded as this file's failure reason.
    fn analyze(&self, path: &Path) -> Result<Value>;
}

impl<F> Analyzer for F
where
    F: Fn(&Path) -> Result<Value> + Send + Sync,
{
    fn analyze(&self, path: &Path) -> Result<Value> {
        self(path)
    }
}
