mod common;

use anyhow::Result;
use assert_cmd::Command;
use common::TestProject;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;

/// `codepulse` with an isolated config pointing cache and state into the fixture
fn codepulse(project: &TestProject) -> Result<Command> {
    let config_path = project.path().join("config.toml");
    project.config.save(&config_path)?;

    let mut cmd = Command::cargo_bin("codepulse")?;
    cmd.current_dir(project.path())
        .env("CODEPULSE_CONFIG", &config_path)
        .env_remove("RUST_LOG");
    Ok(cmd)
}

#[test]
fn test_scan_writes_json_report() -> Result<()> {
    let project = TestProject::with_files(3)?;
    let report_path = project.path().join("out").join("report.json");

    codepulse(&project)?
        .arg("scan")
        .arg(&project.root)
        .arg("--output")
        .arg(&report_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("Scan summary"));

    let report: Value = serde_json::from_str(&fs::read_to_string(&report_path)?)?;
    assert_eq!(report["stats"]["total_files"], 3);
    assert_eq!(report["stats"]["analyzed_files"], 3);
    assert_eq!(report["results"].as_array().map(Vec::len), Some(3));
    assert_eq!(report["results"][0]["status"], "success");
    assert_eq!(report["results"][0]["result"]["language"], "Python");
    Ok(())
}

#[test]
fn test_scan_default_report_location() -> Result<()> {
    let project = TestProject::with_files(1)?;

    codepulse(&project)?
        .arg("scan")
        .arg(&project.root)
        .assert()
        .success();

    let reports: Vec<_> = fs::read_dir(project.path().join("reports"))?
        .filter_map(std::result::Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].starts_with("scan_project_"));
    assert!(reports[0].ends_with(".json"));
    Ok(())
}

#[test]
fn test_second_scan_reports_no_changes() -> Result<()> {
    let project = TestProject::with_files(2)?;
    let report_path = project.path().join("report.json");

    for _ in 0..2 {
        codepulse(&project)?
            .arg("scan")
            .arg(&project.root)
            .arg("-o")
            .arg(&report_path)
            .assert()
            .success();
    }

    let report: Value = serde_json::from_str(&fs::read_to_string(&report_path)?)?;
    assert_eq!(report["stats"]["analyzed_files"], 0);
    assert_eq!(report["stats"]["skipped_files"], 2);
    Ok(())
}

#[test]
fn test_rescan_in_place_with_default_paths() -> Result<()> {
    let project = TestProject::with_files(3)?;
    let config_path = project.path().join("defaults.toml");
    let report_path = project.path().join("second.json");

    let scan_here = || -> Result<Command> {
        let mut cmd = Command::cargo_bin("codepulse")?;
        cmd.current_dir(&project.root)
            .env("CODEPULSE_CONFIG", &config_path)
            .env_remove("RUST_LOG")
            .args(["scan", "."]);
        Ok(cmd)
    };

    // First run leaves state, lock, cache and a report under the scanned root
    scan_here()?.assert().success();
    assert!(project.root.join(".codepulse_state.json").exists());
    assert!(project.root.join(".codepulse_cache").is_dir());
    assert!(project.root.join("reports").is_dir());

    scan_here()?.arg("-o").arg(&report_path).assert().success();

    let report: Value = serde_json::from_str(&fs::read_to_string(&report_path)?)?;
    assert_eq!(report["stats"]["total_files"], 3);
    assert_eq!(report["stats"]["analyzed_files"], 0);
    assert_eq!(report["results"].as_array().map(Vec::len), Some(0));
    Ok(())
}

#[test]
fn test_scan_missing_path_fails() -> Result<()> {
    let project = TestProject::new()?;

    codepulse(&project)?
        .arg("scan")
        .arg(project.path().join("missing"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
    Ok(())
}

#[test]
fn test_scan_flags_disable_subsystems() -> Result<()> {
    let project = TestProject::with_files(2)?;
    let report_path = project.path().join("report.json");

    codepulse(&project)?
        .args(["scan", "--no-cache", "--no-incremental", "--workers", "2", "-o"])
        .arg(&report_path)
        .arg(&project.root)
        .assert()
        .success();

    let report: Value = serde_json::from_str(&fs::read_to_string(&report_path)?)?;
    assert!(report["stats"].get("cache").is_none());
    assert!(report["stats"].get("incremental").is_none());
    assert!(!project.config.cache.dir.exists());
    Ok(())
}

#[test]
fn test_config_get_and_set() -> Result<()> {
    let project = TestProject::new()?;

    codepulse(&project)?
        .args(["config", "performance.workers"])
        .assert()
        .success()
        .stdout("4\n");

    let config_path = project.path().join("config.toml");
    let mut cmd = Command::cargo_bin("codepulse")?;
    cmd.env("CODEPULSE_CONFIG", &config_path)
        .args(["config", "scan.pattern", "*.py"])
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("codepulse")?;
    cmd.env("CODEPULSE_CONFIG", &config_path)
        .args(["config", "scan.pattern"])
        .assert()
        .success()
        .stdout("*.py\n");

    let mut cmd = Command::cargo_bin("codepulse")?;
    cmd.env("CODEPULSE_CONFIG", &config_path)
        .args(["config", "performance.workers", "lots"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid number"));
    Ok(())
}

#[test]
fn test_reset_and_clear_cache_commands() -> Result<()> {
    let project = TestProject::with_files(2)?;
    let report_path = project.path().join("report.json");

    codepulse(&project)?
        .arg("scan")
        .arg(&project.root)
        .arg("-o")
        .arg(&report_path)
        .assert()
        .success();
    assert!(project.config.incremental.state_file.exists());

    codepulse(&project)?.arg("reset").assert().success();
    assert!(!project.config.incremental.state_file.exists());

    codepulse(&project)?.arg("clear-cache").assert().success();
    assert_eq!(fs::read_dir(&project.config.cache.dir)?.count(), 0);
    Ok(())
}

#[test]
fn test_completion_generates_script() -> Result<()> {
    Command::cargo_bin("codepulse")?
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("codepulse"));
    Ok(())
}
