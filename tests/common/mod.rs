#![allow(dead_code)]

use anyhow::Result;
use codepulse::config::Config;
use filetime::{FileTime, set_file_mtime};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary project with its own cache directory and state file
pub struct TestProject {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub config: Config,
}

impl TestProject {
    /// Create an empty project; cache and state live beside it, not inside
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("project");
        fs::create_dir_all(&root)?;

        let mut config = Config::default();
        config.performance.workers = 4;
        config.cache.dir = temp_dir.path().join("cache");
        config.incremental.state_file = temp_dir.path().join("state.json");

        Ok(Self {
            temp_dir,
            root,
            config,
        })
    }

    /// Project with `count` distinct Python files
    pub fn with_files(count: usize) -> Result<Self> {
        let project = Self::new()?;
        for i in 0..count {
            project.write(
                &format!("test_{i}.py"),
                &format!("# Test file {i}\ndef test_{i}():\n    return {i}\n"),
            )?;
        }
        Ok(project)
    }

    /// Write `content` to `relative`, creating parent directories
    pub fn write(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Rewrite a file and move its mtime far enough to be seen as changed
    pub fn modify(&self, relative: &str, content: &str, unix_secs: i64) -> Result<()> {
        let path = self.write(relative, content)?;
        set_file_mtime(path, FileTime::from_unix_time(unix_secs, 0))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}
