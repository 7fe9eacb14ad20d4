//! Command-line interface definitions for codepulse.
//!
//! Shared between the main binary and build tools (like xtask) for man page
//! generation.
//!
//! Note: Field-level documentation is provided via clap attributes, so we allow
//! missing_docs for this module to avoid redundant documentation.

#![allow(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Main CLI structure for codepulse.
#[derive(Parser)]
#[command(
    name = "codepulse",
    version = crate::VERSION,
    about = "Parallel code scanner with content caching and incremental runs",
    long_about = "Scans a project in parallel, skipping files whose modification time has not \
                  moved and reusing results for content it has already analyzed"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Show verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress informational messages
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file to use
    #[arg(long, global = true, env = "CODEPULSE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// All available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Scan a project directory
    Scan {
        /// Project root to scan
        path: PathBuf,

        /// Number of worker threads (0 = one per core)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Do not read or write the content cache
        #[arg(long)]
        no_cache: bool,

        /// Analyze every file, not just changed ones
        #[arg(long)]
        no_incremental: bool,

        /// Clear the content cache before scanning
        #[arg(long)]
        clear_cache: bool,

        /// Forget tracked files before scanning
        #[arg(long)]
        reset: bool,

        /// Glob selecting files to analyze (e.g. '*.py')
        #[arg(short, long)]
        pattern: Option<String>,

        /// Where to write the JSON report
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Remove every cached analysis result
    ClearCache,

    /// Forget all tracked files so the next scan analyzes everything
    Reset,

    /// Get and set configuration options
    Config {
        /// Configuration key (section.key)
        key: String,

        /// Configuration value to set
        value: Option<String>,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_scan_flags() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "codepulse",
            "scan",
            "./src",
            "--workers",
            "3",
            "--no-cache",
            "--pattern",
            "*.rs",
        ])?;

        let Commands::Scan {
            path,
            workers,
            no_cache,
            no_incremental,
            pattern,
            ..
        } = cli.command
        else {
            anyhow::bail!("expected scan command");
        };
        assert_eq!(path, PathBuf::from("./src"));
        assert_eq!(workers, Some(3));
        assert!(no_cache);
        assert!(!no_incremental);
        assert_eq!(pattern.as_deref(), Some("*.rs"));
        Ok(())
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["codepulse", "-v", "-q", "reset"]).is_err());
    }
}
