//! Tracing subscriber setup: stdout, plus a per-day log file when configured.

use crate::config::LogLevel;
use chrono::NaiveDate;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open log file {path}: {source}")]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to install tracing subscriber: {0}")]
    Init(String),
}

/// `hedge_it_run_<YYYY-MM-DD>.log`
pub fn log_file_name(date: NaiveDate) -> String {
    format!("hedge_it_run_{}.log", date.format("%Y-%m-%d"))
}

/// Install the global subscriber.
///
/// Returns the log file path when `log_dir` is set. Runs on the same day
/// append to the same file.
pub fn init_logging(
    level: LogLevel,
    log_dir: Option<&Path>,
    date: NaiveDate,
) -> Result<Option<PathBuf>, LoggingError> {
    let file = match log_dir {
        Some(dir) => {
            let path = dir.join(log_file_name(date));
            let open = fs::create_dir_all(dir).and_then(|_| {
                OpenOptions::new().create(true).append(true).open(&path)
            });
            let file = open.map_err(|source| LoggingError::File {
                path: path.clone(),
                source,
            })?;
            Some((path, file))
        }
        None => None,
    };

    let (path, file_layer) = match file {
        Some((path, file)) => (
            Some(path),
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true),
            ),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(level.as_filter()))
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(path)
}
