//! Utility functions and helpers.
//!
//! - Ignore pattern matching for discovery
//! - Modification-time conversion
//! - Human-readable size formatting
//!
//! # Submodules
//!
//! - [`hash`]: Content digests used as cache keys
//! - [`thread_pool`]: Worker pool construction and sizing
//!
//! # Examples
//!
//! ```
//! use codepulse::utils::{format_size, should_ignore};
//! use std::path::Path;
//!
//! assert_eq!(format_size(1024 * 1024), "1.00 MB");
//! assert!(should_ignore(Path::new("src/.git/HEAD"), &[".git".to_string()]));
//! ```

/// Content digests (SHA-256) and file hashing
pub mod hash;
/// Worker thread pool construction
pub mod thread_pool;

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Determines if a path should be skipped during discovery.
///
/// Supported pattern forms:
/// - `name/` or `name`: any path component equal to `name`
/// - `*suffix`: path ends with `suffix`
/// - `prefix*`: file name starts with `prefix`
/// - `*infix*`: path contains `infix`
#[must_use]
pub fn should_ignore(path: &Path, patterns: &[String]) -> bool {
    let path_str = path.to_string_lossy();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();

    patterns.iter().any(|pattern| {
        let pattern = pattern.trim_end_matches('/');
        if pattern.is_empty() {
            return false;
        }

        if pattern.len() > 1 && pattern.starts_with('*') && pattern.ends_with('*') {
            path_str.contains(&pattern[1..pattern.len() - 1])
        } else if let Some(suffix) = pattern.strip_prefix('*') {
            path_str.ends_with(suffix)
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            file_name.starts_with(prefix)
        } else {
            path.components().any(|c| c.as_os_str() == pattern)
        }
    })
}

/// Converts a timestamp into fractional seconds since the Unix epoch.
///
/// Timestamps before the epoch collapse to `0.0`.
#[must_use]
pub fn system_time_to_secs(time: SystemTime) -> f64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Formats a byte count into a human-readable string.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if size < 1024 {
        return format!("{size} B");
    }

    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}
