use crate::utils::app_paths::AppPaths;
use anyhow::Result;
use chrono::Local;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::EnvFilter;

/// Initialize tracing into a session log file so the REPL screen stays
/// clean. RUST_LOG overrides the default filter. Returns the log path.
pub fn init_logging() -> Result<PathBuf> {
    let log_dir = AppPaths::log_dir()?;
    let filename = format!("autobi_{}.log", Local::now().format("%Y%m%d_%H%M%S"));
    let log_path = log_dir.join(filename);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("autobi_cli=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .with_timer(LocalTime::rfc_3339())
        .try_init()
        .ok();

    tracing::info!("Logging initialized");
    Ok(log_path)
}
