use anyhow::{anyhow, Result};
use std::fs;
use std::path::PathBuf;

pub struct AppPaths;

impl AppPaths {
    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Cannot determine data directory"))?
            .join("autobi");

        fs::create_dir_all(&data_dir)?;
        Ok(data_dir)
    }

    pub fn cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow!("Cannot determine cache directory"))?
            .join("autobi");

        fs::create_dir_all(&cache_dir)?;
        Ok(cache_dir)
    }

    /// Persisted question ledger
    pub fn history_file() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("history.json"))
    }

    /// Reedline's line history, separate from the question ledger
    pub fn line_history_file() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("repl_history.txt"))
    }

    pub fn log_dir() -> Result<PathBuf> {
        let log_dir = Self::data_dir()?.join("logs");
        fs::create_dir_all(&log_dir)?;
        Ok(log_dir)
    }
}
