//! Bounded fan-out of per-file work across a thread pool.
//!
//! Every submitted file produces exactly one [`WorkResult`], whatever
//! happens inside the analyzer: an `Err` or a panic is captured as a
//! `failed` result for that file only. Results arrive in completion order,
//! not submission order.
//!
//! Workers pull the next file from a shared cursor and push results into a
//! bounded channel (`workers * QUEUE_FACTOR` slots), so at most one file per
//! worker is in flight and a slow consumer stalls the workers instead of
//! growing an unbounded buffer.

use crate::cache::CacheOutcome;
use crate::discovery::FileRef;
use crate::error::ScanError;
use crate::utils::thread_pool::{build_pool, default_workers};
use anyhow::anyhow;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use tracing::{Level, debug, info, span, warn};

/// Result channel capacity per worker
pub const QUEUE_FACTOR: usize = 2;

/// Outcome of one file's analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WorkStatus {
    /// The analyzer produced a document
    Success {
        /// Analyzer output
        result: Value,
    },
    /// The analyzer returned an error or panicked
    Failed {
        /// Human-readable failure reason
        error: String,
    },
}

/// One file's result, owned by the worker that produced it until handed to
/// the consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkResult {
    /// File the result belongs to
    pub file: PathBuf,
    /// Success payload or failure reason
    #[serde(flatten)]
    pub status: WorkStatus,
    /// How the content cache was involved
    pub cache: CacheOutcome,
}

impl WorkResult {
    /// Whether the analysis succeeded
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, WorkStatus::Success { .. })
    }

    /// Whether the analysis failed
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        !self.is_success()
    }

    /// The analyzer payload, if any
    #[must_use]
    pub const fn payload(&self) -> Option<&Value> {
        match &self.status {
            WorkStatus::Success { result } => Some(result),
            WorkStatus::Failed { .. } => None,
        }
    }

    /// The failure reason, if any
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            WorkStatus::Success { .. } => None,
            WorkStatus::Failed { error } => Some(error),
        }
    }
}

/// What a unit of work hands back to the pool
#[derive(Debug)]
pub struct Analysis {
    /// Analyzer output or error
    pub outcome: anyhow::Result<Value>,
    /// How the cache was involved in producing it
    pub cache: CacheOutcome,
}

impl From<anyhow::Result<Value>> for Analysis {
    fn from(outcome: anyhow::Result<Value>) -> Self {
        Self {
            outcome,
            cache: CacheOutcome::Bypassed,
        }
    }
}

/// Fixed-size pool executing per-file work
#[derive(Debug)]
pub struct WorkerPool {
    /// Dedicated rayon pool
    pool: ThreadPool,
    /// Number of worker threads
    workers: usize,
}

impl WorkerPool {
    /// Create a pool with `workers` threads (at least one)
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::ThreadPool`] if the threads cannot be spawned.
    pub fn new(workers: usize) -> Result<Self, ScanError> {
        let workers = workers.max(1);
        let pool = build_pool(workers).map_err(|e| ScanError::ThreadPool(e.to_string()))?;
        info!(workers, "Initialized worker pool");
        Ok(Self { pool, workers })
    }

    /// Create a pool sized to the host's available parallelism
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::ThreadPool`] if the threads cannot be spawned.
    pub fn with_default_workers() -> Result<Self, ScanError> {
        Self::new(default_workers())
    }

    /// Number of worker threads
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Run `analyze` over every file and collect the results.
    ///
    /// The returned vector has exactly `files.len()` entries, in completion
    /// order.
    pub fn scan_files<F, R>(&self, files: &[FileRef], analyze: F) -> Vec<WorkResult>
    where
        F: Fn(&FileRef) -> R + Sync,
        R: Into<Analysis>,
    {
        let mut results = Vec::with_capacity(files.len());
        self.for_each_result(files, analyze, |result| results.push(result));
        results
    }

    /// Run `analyze` over every file, handing each result to `sink` on the
    /// calling thread as soon as it completes.
    ///
    /// Returns once every file has been accounted for.
    pub fn for_each_result<F, R, S>(&self, files: &[FileRef], analyze: F, mut sink: S)
    where
        F: Fn(&FileRef) -> R + Sync,
        R: Into<Analysis>,
        S: FnMut(WorkResult),
    {
        let span = span!(Level::DEBUG, "scan_files", files = files.len(), workers = self.workers);
        let _guard = span.enter();

        let total = files.len();
        if total == 0 {
            return;
        }
        info!(total, workers = self.workers, "Scanning files");

        let cursor = AtomicUsize::new(0);
        let (tx, rx) = mpsc::sync_channel::<WorkResult>(self.workers * QUEUE_FACTOR);
        let analyze = &analyze;
        let cursor = &cursor;

        self.pool.in_place_scope(|scope| {
            for _ in 0..self.workers.min(total) {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    loop {
                        let Some(file) = files.get(cursor.fetch_add(1, Ordering::Relaxed)) else {
                            break;
                        };
                        if tx.send(run_one(file, analyze)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            let mut completed = 0usize;
            for result in rx {
                completed += 1;
                if completed % 10 == 0 || completed == total {
                    debug!(completed, total, "Progress");
                }
                sink(result);
            }
        });

        info!(total, "Completed scanning files");
    }
}

/// Analyze one file, turning errors and panics into a failed result
fn run_one<F, R>(file: &FileRef, analyze: &F) -> WorkResult
where
    F: Fn(&FileRef) -> R,
    R: Into<Analysis>,
{
    let analysis = catch_unwind(AssertUnwindSafe(|| -> Analysis { analyze(file).into() }))
        .unwrap_or_else(|panic| {
            Analysis::from(Err(anyhow!(
                "analyzer panicked: {}",
                panic_message(panic.as_ref())
            )))
        });

    let status = match analysis.outcome {
        Ok(result) => WorkStatus::Success { result },
        Err(e) => {
            warn!(path = %file.path.display(), error = %e, "Error analyzing file");
            WorkStatus::Failed {
                error: format!("{e:#}"),
            }
        }
    };

    WorkResult {
        file: file.path.clone(),
        status,
        cache: analysis.cache,
    }
}

/// Best-effort text of a panic payload
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};
    use serde_json::json;
    use std::collections::HashSet;
    use std::path::Path;
    use std::time::{Duration, Instant};

    fn fake_files(count: usize) -> Vec<FileRef> {
        (0..count)
            .map(|i| FileRef {
                path: PathBuf::from(format!("/project/test_{i}.py")),
                size: 0,
                mtime: 0.0,
            })
            .collect()
    }

    fn name_of(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    #[test]
    fn test_one_result_per_file() -> Result<()> {
        let pool = WorkerPool::new(4)?;
        let files = fake_files(37);

        let results = pool.scan_files(&files, |f| -> Result<Value> {
            Ok(json!({"name": name_of(&f.path)}))
        });

        assert_eq!(results.len(), files.len());
        let paths: HashSet<_> = results.iter().map(|r| r.file.clone()).collect();
        assert_eq!(paths.len(), files.len());
        assert!(results.iter().all(WorkResult::is_success));
        Ok(())
    }

    #[test]
    fn test_handles_errors_gracefully() -> Result<()> {
        let pool = WorkerPool::new(2)?;
        let files = fake_files(5);

        let results = pool.scan_files(&files, |f| -> Result<Value> {
            if name_of(&f.path) == "test_2.py" {
                bail!("Test error");
            }
            Ok(json!({"result": "ok"}))
        });

        assert_eq!(results.len(), 5);
        let failed: Vec<_> = results.iter().filter(|r| r.is_failed()).collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].file.ends_with("test_2.py"));
        assert_eq!(failed[0].error(), Some("Test error"));
        Ok(())
    }

    #[test]
    fn test_panics_are_isolated() -> Result<()> {
        let pool = WorkerPool::new(3)?;
        let files = fake_files(8);

        let results = pool.scan_files(&files, |f| -> Result<Value> {
            assert!(name_of(&f.path) != "test_5.py", "boom");
            Ok(json!(1))
        });

        assert_eq!(results.len(), 8);
        let failed: Vec<_> = results.iter().filter(|r| r.is_failed()).collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].error().is_some_and(|e| e.contains("panicked")));
        Ok(())
    }

    #[test]
    fn test_empty_batch() -> Result<()> {
        let pool = WorkerPool::new(2)?;
        let calls = AtomicUsize::new(0);
        let results = pool.scan_files(&[], |_| -> Result<Value> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        });
        assert!(results.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[test]
    fn test_runs_in_parallel() -> Result<()> {
        let pool = WorkerPool::new(4)?;
        let files = fake_files(8);

        let start = Instant::now();
        let results = pool.scan_files(&files, |_| -> Result<Value> {
            std::thread::sleep(Duration::from_millis(100));
            Ok(json!("ok"))
        });

        assert_eq!(results.len(), 8);
        // Sequential would take 800ms
        assert!(start.elapsed() < Duration::from_millis(600));
        Ok(())
    }

    #[test]
    fn test_in_flight_bounded_by_workers() -> Result<()> {
        let pool = WorkerPool::new(2)?;
        let files = fake_files(20);
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        pool.for_each_result(
            &files,
            |_| -> Result<Value> {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(5));
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(Value::Null)
            },
            |_| {},
        );

        assert!(peak.load(Ordering::SeqCst) <= 2);
        Ok(())
    }

    #[test]
    fn test_streaming_sink_sees_every_result() -> Result<()> {
        let pool = WorkerPool::new(3)?;
        let files = fake_files(15);
        let mut seen = 0;

        pool.for_each_result(&files, |_| -> Result<Value> { Ok(Value::Null) }, |_| seen += 1);
        assert_eq!(seen, 15);
        Ok(())
    }

    #[test]
    fn test_cache_outcome_carried_through() -> Result<()> {
        let pool = WorkerPool::new(2)?;
        let files = fake_files(3);

        let results = pool.scan_files(&files, |_| Analysis {
            outcome: Ok(json!({})),
            cache: CacheOutcome::Hit,
        });
        assert!(results.iter().all(|r| r.cache == CacheOutcome::Hit));
        Ok(())
    }

    #[test]
    fn test_result_serialization_shape() {
        let ok = WorkResult {
            file: PathBuf::from("/p/a.py"),
            status: WorkStatus::Success {
                result: json!({"lines": 3}),
            },
            cache: CacheOutcome::Miss,
        };
        assert_eq!(
            serde_json::to_value(&ok).ok(),
            Some(json!({"file": "/p/a.py", "status": "success", "result": {"lines": 3}, "cache": "miss"}))
        );

        let failed = WorkResult {
            file: PathBuf::from("/p/b.py"),
            status: WorkStatus::Failed {
                error: "boom".to_string(),
            },
            cache: CacheOutcome::Bypassed,
        };
        let value = serde_json::to_value(&failed).ok();
        assert_eq!(
            value.as_ref().and_then(|v| v.get("status")),
            Some(&json!("failed"))
        );
    }
}
