//! Persistent scanner settings.
//!
//! Stored as TOML; every section and key is optional and falls back to its
//! default, so an empty file is a valid configuration:
//!
//! ```toml
//! [performance]
//! workers = 0            # 0 = one per available core
//!
//! [cache]
//! enabled = true
//! dir = ".codepulse_cache"
//!
//! [incremental]
//! enabled = true
//! state_file = ".codepulse_state.json"
//!
//! [scan]
//! pattern = "*"
//! ignore_patterns = [".git", "node_modules", "__pycache__", "target", ".codepulse_cache"]
//! follow_symlinks = false
//! ```

use crate::discovery::Discovery;
use crate::tracking::state::lock_path_for;
use crate::{DEFAULT_CACHE_DIR, DEFAULT_REPORTS_DIR, DEFAULT_STATE_FILE};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the configuration file location
pub const CONFIG_ENV: &str = "CODEPULSE_CONFIG";

/// Every key accepted by [`Config::get`] and [`Config::set`]
pub const KEYS: &[&str] = &[
    "performance.workers",
    "cache.enabled",
    "cache.dir",
    "incremental.enabled",
    "incremental.state_file",
    "scan.pattern",
    "scan.ignore_patterns",
    "scan.follow_symlinks",
];

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Parallelism settings
    #[serde(default)]
    pub performance: PerformanceConfig,
    /// Content cache settings
    #[serde(default)]
    pub cache: CacheConfig,
    /// Incremental scanning settings
    #[serde(default)]
    pub incremental: IncrementalConfig,
    /// File selection settings
    #[serde(default)]
    pub scan: ScanConfig,
}

/// `[performance]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PerformanceConfig {
    /// Worker threads; 0 means one per available core
    #[serde(default)]
    pub workers: usize,
}

/// `[cache]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether analysis results are cached by content
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Directory holding cache entries
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

/// `[incremental]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementalConfig {
    /// Whether unchanged files are skipped
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Tracked-state document
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

/// `[scan]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Default glob for selecting files
    #[serde(default = "default_pattern")]
    pub pattern: String,
    /// Names and globs pruned during discovery
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,
    /// Whether discovery follows symbolic links
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_cache_dir(),
        }
    }
}

impl Default for IncrementalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            state_file: default_state_file(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            ignore_patterns: default_ignore_patterns(),
            follow_symlinks: false,
        }
    }
}

impl Config {
    /// Default location: `<user config dir>/codepulse/config.toml`
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("codepulse")
            .join("config.toml")
    }

    /// Pick the configuration file: an explicit path wins, then
    /// `CODEPULSE_CONFIG`, then [`Config::default_path`].
    #[must_use]
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => Self::default_path(),
        }
    }

    /// Load configuration from a file, or defaults if it does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file exists but cannot be read
    /// - The file contains invalid TOML or wrongly typed values
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Cannot create parent directories
    /// - Cannot write to the file
    /// - TOML serialization fails
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Discovery settings as a ready-to-use finder.
    ///
    /// The finder never returns the scanner's own files: the cache directory,
    /// the state document and its lock, and the default reports directory.
    #[must_use]
    pub fn discovery(&self) -> Discovery {
        Discovery::new(self.scan.ignore_patterns.clone(), self.scan.follow_symlinks)
            .exclude_paths(self.own_paths())
    }

    /// Paths the scanner writes to while running
    #[must_use]
    pub fn own_paths(&self) -> Vec<PathBuf> {
        vec![
            self.cache.dir.clone(),
            self.incremental.state_file.clone(),
            lock_path_for(&self.incremental.state_file),
            PathBuf::from(DEFAULT_REPORTS_DIR),
        ]
    }

    /// Get a configuration value by `section.key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let (section, name) = key.split_once('.')?;

        match (section, name) {
            ("performance", "workers") => Some(self.performance.workers.to_string()),
            ("cache", "enabled") => Some(self.cache.enabled.to_string()),
            ("cache", "dir") => Some(self.cache.dir.display().to_string()),
            ("incremental", "enabled") => Some(self.incremental.enabled.to_string()),
            ("incremental", "state_file") => {
                Some(self.incremental.state_file.display().to_string())
            }
            ("scan", "pattern") => Some(self.scan.pattern.clone()),
            ("scan", "ignore_patterns") => Some(self.scan.ignore_patterns.join(",")),
            ("scan", "follow_symlinks") => Some(self.scan.follow_symlinks.to_string()),
            _ => None,
        }
    }

    /// Set a configuration value by `section.key`
    ///
    /// `scan.ignore_patterns` takes a comma-separated list.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The key format is invalid (must be section.key)
    /// - The key is unknown
    /// - The value is invalid for the key (e.g., not a number or a bad glob)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let (section, name) = key
            .split_once('.')
            .ok_or_else(|| anyhow!("Invalid configuration key: {key}"))?;

        match (section, name) {
            ("performance", "workers") => {
                self.performance.workers = value
                    .parse()
                    .with_context(|| format!("Invalid number: {value}"))?;
            }
            ("cache", "enabled") => self.cache.enabled = parse_bool(value)?,
            ("cache", "dir") => self.cache.dir = non_empty_path(value)?,
            ("incremental", "enabled") => self.incremental.enabled = parse_bool(value)?,
            ("incremental", "state_file") => self.incremental.state_file = non_empty_path(value)?,
            ("scan", "pattern") => {
                glob::Pattern::new(value)
                    .with_context(|| format!("Invalid glob pattern: {value}"))?;
                self.scan.pattern = value.to_string();
            }
            ("scan", "ignore_patterns") => {
                self.scan.ignore_patterns = value
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect();
            }
            ("scan", "follow_symlinks") => self.scan.follow_symlinks = parse_bool(value)?,
            _ => return Err(anyhow!("Unknown configuration key: {key}")),
        }
        Ok(())
    }
}

/// Parse a boolean config value
fn parse_bool(value: &str) -> Result<bool> {
    value
        .parse()
        .with_context(|| format!("Invalid boolean: {value}"))
}

/// Reject empty path values
fn non_empty_path(value: &str) -> Result<PathBuf> {
    if value.trim().is_empty() {
        return Err(anyhow!("Path must not be empty"));
    }
    Ok(PathBuf::from(value))
}

// Default functions for serde
const fn default_true() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

fn default_state_file() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_FILE)
}

fn default_pattern() -> String {
    "*".to_string()
}

fn default_ignore_patterns() -> Vec<String> {
    [".git", "node_modules", "__pycache__", "target", DEFAULT_CACHE_DIR]
        .iter()
        .map(ToString::to_string)
        .collect()
}
