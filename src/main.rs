use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::{Generator, generate};
use codepulse::analyzer::FileMetricsAnalyzer;
use codepulse::cli::{Cli, Commands};
use codepulse::config::{Config, KEYS};
use codepulse::coordinator::{ScanCoordinator, ScanReport};
use codepulse::output::{self, Verbosity};
use codepulse::tracking::ChangeTracker;
use codepulse::{DEFAULT_REPORTS_DIR, ScanError, cache::ContentCache};
use colored::Colorize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use tempfile::NamedTempFile;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        if let Some(hint) = e.downcast_ref::<ScanError>().and_then(ScanError::suggestion) {
            eprintln!("{} {hint}", "hint:".dimmed());
        }
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else if cli.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };
    output::set_verbosity(verbosity);
    init_tracing(verbosity);

    let config_path = Config::resolve_path(cli.config.as_deref());

    match cli.command {
        Commands::Scan {
            path,
            workers,
            no_cache,
            no_incremental,
            clear_cache,
            reset,
            pattern,
            output: report_output,
        } => {
            let mut config = Config::load(&config_path)?;
            if let Some(workers) = workers {
                config.performance.workers = workers;
            }
            if no_cache {
                config.cache.enabled = false;
            }
            if no_incremental {
                config.incremental.enabled = false;
            }
            let pattern = pattern.unwrap_or_else(|| config.scan.pattern.clone());

            let mut coordinator = ScanCoordinator::new(&config, FileMetricsAnalyzer::new())?;
            if clear_cache {
                coordinator.clear_cache();
                output::info("Cache cleared");
            }
            if reset {
                coordinator.reset_incremental();
                output::info("Incremental state reset");
            }

            output::info(&format!(
                "Scanning {} with {} workers",
                path.display(),
                coordinator.workers()
            ));
            let report = coordinator.scan_project(&path, &pattern)?;
            output::print_summary(&report.stats);

            let report_path = report_output.unwrap_or_else(|| default_report_path(&path));
            write_report(&report, &report_path)?;
            output::success(&format!("Report written to {}", report_path.display()));
        }
        Commands::ClearCache => {
            let config = Config::load(&config_path)?;
            ContentCache::open(&config.cache.dir).clear();
            output::success(&format!("Cleared cache at {}", config.cache.dir.display()));
        }
        Commands::Reset => {
            let config = Config::load(&config_path)?;
            ChangeTracker::new(&config.incremental.state_file).reset();
            output::success("Incremental state reset");
        }
        Commands::Config { key, value } => {
            let mut config = Config::load(&config_path)?;
            match value {
                Some(value) => {
                    config.set(&key, &value)?;
                    config.save(&config_path)?;
                    output::success(&format!("Set {key} = {value}"));
                }
                None => {
                    let value = config.get(&key).with_context(|| {
                        format!("Unknown configuration key: {key} (known: {})", KEYS.join(", "))
                    })?;
                    println!("{value}");
                }
            }
        }
        Commands::Completion { shell } => {
            print_completions(shell, &mut Cli::command());
        }
    }

    Ok(())
}

/// Route `tracing` output to stderr; `RUST_LOG` overrides the verbosity default
fn init_tracing(verbosity: Verbosity) {
    let default_level = match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => "warn",
        Verbosity::Verbose => "info",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// `reports/scan_<project>_<timestamp>.json`
fn default_report_path(root: &Path) -> PathBuf {
    let project = root
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "project".to_string());
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(DEFAULT_REPORTS_DIR).join(format!("scan_{project}_{timestamp}.json"))
}

/// Write the report as pretty JSON, atomically
fn write_report(report: &ScanReport, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create report directory: {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, report).context("Failed to encode report")?;
    tmp.write_all(b"\n")?;
    tmp.persist(path)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    Ok(())
}

fn print_completions<G: Generator>(g: G, cmd: &mut clap::Command) {
    generate(g, cmd, cmd.get_name().to_string(), &mut io::stdout());
}
