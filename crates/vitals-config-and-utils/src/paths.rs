//! File system paths.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Resolves the files used by the sync layer under one base directory.
#[derive(Debug, Clone)]
pub struct Paths {
    base_dir: PathBuf,
}

impl Paths {
    /// Use `~/.vitals` as the base directory.
    pub fn new() -> CoreResult<Self> {
        dirs::home_dir()
            .map(|home| Self::with_base_dir(home.join(".vitals")))
            .ok_or_else(|| CoreError::Path("no home directory to place .vitals in".into()))
    }

    /// Root everything at `base_dir` (tests, `--base-dir`).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// ~/.vitals/config.json
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// ~/.vitals/conf-store.json, the key/value store for endpoint and credentials.
    pub fn conf_store_file(&self) -> PathBuf {
        self.base_dir.join("conf-store.json")
    }

    /// ~/.vitals/logs
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Create the base and logs directories if they are missing.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        // logs/ sits under the base dir, so one call creates both.
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
