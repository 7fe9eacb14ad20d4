//! Terminal output for the codepulse CLI.
//!
//! - Dimmed colors for routine messages
//! - Bold colors for warnings and errors
//! - Verbosity control (quiet, normal, verbose)
//! - The end-of-scan summary
//!
//! Everything goes to stderr; stdout is reserved for machine-readable output
//! such as completions and `config` values.

use crate::coordinator::RunStats;
use crate::utils::format_size;
use colored::Colorize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

/// Verbosity level for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Suppress informational messages, show only warnings and errors.
    Quiet = 0,
    /// Default verbosity level, show all standard messages.
    Normal = 1,
    /// Show verbose debug messages in addition to standard output.
    Verbose = 2,
}

/// Global verbosity setting (default: Normal).
static VERBOSITY: AtomicU8 = AtomicU8::new(1);

/// Sets the global verbosity level for all output functions.
pub fn set_verbosity(level: Verbosity) {
    VERBOSITY.store(level as u8, Ordering::Relaxed);
}

/// Gets the current global verbosity level.
pub fn get_verbosity() -> Verbosity {
    match VERBOSITY.load(Ordering::Relaxed) {
        0 => Verbosity::Quiet,
        2 => Verbosity::Verbose,
        _ => Verbosity::Normal,
    }
}

/// Prints a success message in green (respects quiet mode).
pub fn success(message: &str) {
    if get_verbosity() == Verbosity::Quiet {
        return;
    }
    eprintln!("{}", message.green());
}

/// Prints an error message in bold red (always shown).
pub fn error(message: &str) {
    eprintln!("{}", message.red().bold());
}

/// Prints a warning message in bold yellow (always shown).
pub fn warning(message: &str) {
    eprintln!("{}", message.yellow().bold());
}

/// Prints an informational message in dimmed color (respects quiet mode).
pub fn info(message: &str) {
    if get_verbosity() == Verbosity::Quiet {
        return;
    }
    eprintln!("{}", message.dimmed());
}

/// Prints a verbose debug message (only in verbose mode).
pub fn verbose(message: &str) {
    if get_verbosity() != Verbosity::Verbose {
        return;
    }
    eprintln!("{}", message.dimmed());
}

/// Render the scan summary as plain lines (no colors)
#[must_use]
pub fn summary_lines(stats: &RunStats) -> Vec<String> {
    let mut lines = vec![
        format!("Total files:     {}", stats.total_files),
        format!("Analyzed:        {}", stats.analyzed_files),
        format!("Skipped:         {}", stats.skipped_files),
        format!("Succeeded:       {}", stats.succeeded),
        format!("Failed:          {}", stats.failed),
        format!("Duration:        {}", format_duration(stats.duration_secs)),
    ];

    if let Some(rate) = stats.files_per_second {
        lines.push(format!("Files/second:    {rate:.1}"));
    }

    if let Some(cache) = &stats.cache {
        lines.push(format!(
            "Cache:           {} hits, {} misses ({:.1}% hit rate)",
            cache.hits, cache.misses, cache.hit_rate
        ));
    }
    if let Some(size) = stats.cache_size_bytes {
        lines.push(format!("Cache size:      {}", format_size(size)));
    }

    if let Some(tracker) = &stats.incremental {
        lines.push(format!("Tracked files:   {}", tracker.tracked_files));
    }

    lines
}

/// Prints the end-of-scan summary (respects quiet mode).
pub fn print_summary(stats: &RunStats) {
    if get_verbosity() == Verbosity::Quiet {
        return;
    }

    eprintln!("{}", "Scan summary".bold());
    for line in summary_lines(stats) {
        eprintln!("  {line}");
    }

    if stats.failed > 0 {
        warning(&format!("{} file(s) failed to analyze", stats.failed));
    } else if stats.analyzed_files == 0 && stats.total_files > 0 {
        info("No changes since the last scan");
    }
}

/// Human-readable duration at millisecond precision
fn format_duration(secs: f64) -> String {
    let millis = Duration::from_secs_f64(secs.max(0.0)).as_millis();
    let rounded = Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX));
    if rounded.is_zero() {
        return "0ms".to_string();
    }
    humantime::format_duration(rounded).to_string()
}
