//! Log file setup
//!
//! The terminal belongs to the UI, so logs only go somewhere when a log
//! file is given. The filter comes from `CODEPAD_LOG`.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "CODEPAD_LOG";

pub const DEFAULT_FILTER: &str = "codepad=info,padscript=info";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open log file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid CODEPAD_LOG filter: {0}")]
    Filter(String),

    #[error("a global subscriber is already installed")]
    AlreadyInstalled,
}

/// Filter from `CODEPAD_LOG`, falling back to [`DEFAULT_FILTER`]
pub fn env_filter() -> Result<EnvFilter, LoggingError> {
    match std::env::var(LOG_ENV) {
        Ok(directives) => {
            EnvFilter::try_new(&directives).map_err(|e| LoggingError::Filter(e.to_string()))
        }
        Err(_) => Ok(EnvFilter::new(DEFAULT_FILTER)),
    }
}

/// Install the global subscriber writing to `path` (appending)
pub fn init(path: &Path) -> Result<(), LoggingError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter()?)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInstalled)?;

    tracing::info!(path = %path.display(), "logging initialised");
    Ok(())
}
