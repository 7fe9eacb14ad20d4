//! One scan, end to end.
//!
//! [`ScanCoordinator`] composes discovery, change detection, the content
//! cache and the worker pool:
//!
//! 1. discover files under the root matching the pattern
//! 2. narrow them to the changed set when incremental mode is on
//! 3. fan the selection out to the pool, consulting the cache per file
//! 4. re-baseline the tracked state with everything discovered
//!
//! Only steps 1 and pool start-up can fail; everything else degrades to doing
//! more work.

use crate::analyzer::Analyzer;
use crate::cache::{CacheOutcome, CacheStats, ContentCache};
use crate::config::Config;
use crate::discovery::{Discovery, FileRef};
use crate::error::ScanError;
use crate::pool::{Analysis, WorkResult, WorkerPool};
use crate::tracking::{ChangeTracker, TrackerStats};
use crate::utils::thread_pool::resolve_workers;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{Level, info, span};

/// Aggregate counters for one run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Files discovered under the root
    pub total_files: usize,
    /// Files handed to the pool
    pub analyzed_files: usize,
    /// Files skipped as unchanged
    pub skipped_files: usize,
    /// Analyzed files that produced a result
    pub succeeded: usize,
    /// Analyzed files that failed
    pub failed: usize,
    /// Wall-clock time of the whole scan
    pub duration_secs: f64,
    /// Analyzed files per second
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_per_second: Option<f64>,
    /// Cumulative cache counters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
    /// Bytes held by the cache directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_size_bytes: Option<u64>,
    /// Tracker counters after the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incremental: Option<TrackerStats>,
}

/// Everything a scan produced
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScanReport {
    /// One entry per analyzed file, in completion order
    pub results: Vec<WorkResult>,
    /// Aggregate counters
    pub stats: RunStats,
}

/// Per-run tallies gathered from the result stream
#[derive(Debug, Default)]
struct Tally {
    /// Successful results
    succeeded: usize,
    /// Failed results
    failed: usize,
    /// Results served from the cache
    hits: u64,
    /// Results the analyzer had to compute
    misses: u64,
}

impl Tally {
    /// Account for one result
    fn add(&mut self, result: &WorkResult) {
        if result.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        match result.cache {
            CacheOutcome::Hit => self.hits += 1,
            CacheOutcome::Miss => self.misses += 1,
            CacheOutcome::Bypassed => {}
        }
    }
}

/// Runs scans with a fixed analyzer, pool and optional cache/tracker
pub struct ScanCoordinator {
    /// Per-file analysis capability
    analyzer: Box<dyn Analyzer>,
    /// File finder
    discovery: Discovery,
    /// Fan-out executor
    pool: WorkerPool,
    /// Present when caching is enabled
    cache: Option<ContentCache>,
    /// Present when incremental mode is enabled
    tracker: Option<ChangeTracker>,
}

impl ScanCoordinator {
    /// Build a coordinator from configuration.
    ///
    /// Opens the cache directory and loads the tracked state when the
    /// corresponding subsystem is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::ThreadPool`] if the worker pool cannot start.
    pub fn new(config: &Config, analyzer: impl Analyzer + 'static) -> Result<Self, ScanError> {
        let pool = WorkerPool::new(resolve_workers(config.performance.workers))?;
        let cache = config
            .cache
            .enabled
            .then(|| ContentCache::open(&config.cache.dir));
        let tracker = config
            .incremental
            .enabled
            .then(|| ChangeTracker::new(&config.incremental.state_file));

        info!(
            workers = pool.workers(),
            cache = cache.is_some(),
            incremental = tracker.is_some(),
            "Scan coordinator ready"
        );

        Ok(Self {
            analyzer: Box::new(analyzer),
            discovery: config.discovery(),
            pool,
            cache,
            tracker,
        })
    }

    /// Worker threads in the pool
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.pool.workers()
    }

    /// The content cache, if enabled
    #[must_use]
    pub const fn cache(&self) -> Option<&ContentCache> {
        self.cache.as_ref()
    }

    /// The change tracker, if enabled
    #[must_use]
    pub const fn tracker(&self) -> Option<&ChangeTracker> {
        self.tracker.as_ref()
    }

    /// Scan `root` for files matching `pattern` and collect every result
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::RootNotFound`] if `root` does not exist and
    /// [`ScanError::InvalidPattern`] if `pattern` is not a valid glob.
    pub fn scan_project(&mut self, root: &Path, pattern: &str) -> Result<ScanReport, ScanError> {
        let mut results = Vec::new();
        let stats = self.scan_project_streaming(root, pattern, |result| results.push(result))?;
        Ok(ScanReport { results, stats })
    }

    /// Scan `root`, handing each result to `sink` as soon as it completes.
    ///
    /// `sink` runs on the calling thread and sees exactly one result per
    /// analyzed file before this returns.
    ///
    /// # Errors
    ///
    /// Same as [`ScanCoordinator::scan_project`].
    pub fn scan_project_streaming<S>(
        &mut self,
        root: &Path,
        pattern: &str,
        mut sink: S,
    ) -> Result<RunStats, ScanError>
    where
        S: FnMut(WorkResult),
    {
        let span = span!(Level::DEBUG, "scan_project", root = %root.display(), pattern);
        let _guard = span.enter();
        let started = Instant::now();

        let discovered = self.discovery.discover(root, pattern)?;
        info!(files = discovered.len(), "Discovered files");
        if discovered.is_empty() {
            return Ok(self.run_stats(0, 0, &Tally::default(), started.elapsed()));
        }

        let selected = match &self.tracker {
            Some(tracker) => {
                let changed = tracker.get_changed_files(&discovered);
                if changed.is_empty() {
                    info!("No changes detected, nothing to analyze");
                    return Ok(self.run_stats(
                        discovered.len(),
                        0,
                        &Tally::default(),
                        started.elapsed(),
                    ));
                }
                changed
            }
            None => discovered.clone(),
        };

        let mut tally = Tally::default();
        {
            let analyzer = self.analyzer.as_ref();
            let cache = self.cache.as_ref();
            self.pool.for_each_result(
                &selected,
                |file| analyze_with_cache(analyzer, cache, file),
                |result| {
                    tally.add(&result);
                    sink(result);
                },
            );
        }

        if let Some(cache) = &mut self.cache {
            cache.record(tally.hits, tally.misses);
        }
        if let Some(tracker) = &mut self.tracker {
            tracker.update_state(&discovered);
        }

        let stats = self.run_stats(discovered.len(), selected.len(), &tally, started.elapsed());
        info!(
            analyzed = stats.analyzed_files,
            skipped = stats.skipped_files,
            failed = stats.failed,
            duration_secs = stats.duration_secs,
            "Scan complete"
        );
        Ok(stats)
    }

    /// Drop every cached result; no-op when caching is disabled
    pub fn clear_cache(&mut self) {
        if let Some(cache) = &mut self.cache {
            cache.clear();
        }
    }

    /// Forget all tracked files; no-op when incremental mode is disabled
    pub fn reset_incremental(&mut self) {
        if let Some(tracker) = &mut self.tracker {
            tracker.reset();
        }
    }

    /// Assemble the counters for a finished (or short-circuited) run
    fn run_stats(&self, total: usize, analyzed: usize, tally: &Tally, elapsed: Duration) -> RunStats {
        let duration_secs = elapsed.as_secs_f64();
        #[allow(clippy::cast_precision_loss)]
        let files_per_second = (duration_secs > 0.0).then(|| analyzed as f64 / duration_secs);

        RunStats {
            total_files: total,
            analyzed_files: analyzed,
            skipped_files: total.saturating_sub(analyzed),
            succeeded: tally.succeeded,
            failed: tally.failed,
            duration_secs,
            files_per_second,
            cache: self.cache.as_ref().map(ContentCache::stats),
            cache_size_bytes: self.cache.as_ref().map(ContentCache::size_bytes),
            incremental: self.tracker.as_ref().map(ChangeTracker::stats),
        }
    }
}

/// Cache-aware analysis of one file.
///
/// The digest is computed once; on a miss the analyzer runs and only a
/// successful payload is written back. Without a cache, or when the file
/// cannot be hashed, the analyzer runs directly.
fn analyze_with_cache(
    analyzer: &dyn Analyzer,
    cache: Option<&ContentCache>,
    file: &FileRef,
) -> Analysis {
    let Some((cache, digest)) =
        cache.and_then(|cache| ContentCache::digest_of(&file.path).map(|d| (cache, d)))
    else {
        return analyzer.analyze(&file.path).into();
    };

    if let Some(payload) = cache.load(&digest) {
        return Analysis {
            outcome: Ok(payload),
            cache: CacheOutcome::Hit,
        };
    }

    let outcome = analyzer.analyze(&file.path);
    if let Ok(payload) = &outcome {
        cache.store(&digest, payload);
    }
    Analysis {
        outcome,
        cache: CacheOutcome::Miss,
    }
}
