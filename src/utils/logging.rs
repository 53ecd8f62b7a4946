//! Logging system initialization
//!
//! Sets up tracing-based logging. Without a log directory, output goes to
//! stderr; with one, it goes to `heightmapper.log` rotated daily, keeping the
//! last 10 files.

use crate::error::{HeightmapperError, Result};
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt};

/// Maximum number of log files kept in the log directory
const MAX_LOG_FILES: usize = 10;

/// Build the level filter
///
/// Defaults to `info` but can be overridden via the `RUST_LOG` environment
/// variable.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Create the rolling file appender for `log_dir`
fn file_appender(log_dir: &Path) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(log_dir)?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("heightmapper")
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(log_dir)
        .map_err(|e| HeightmapperError::LoggingError(Box::new(e)))
}

/// Initialize the logging system
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(log_dir: Option<&Path>) -> Result<()> {
    let result = match log_dir {
        Some(dir) => {
            let subscriber = fmt()
                .with_writer(file_appender(dir)?)
                .with_env_filter(env_filter())
                .with_ansi(false) // Disable ANSI colors for file output
                .with_target(true) // Include target module
                .with_thread_ids(true) // Include thread IDs
                .with_file(true) // Include file names
                .with_line_number(true) // Include line numbers
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
        None => {
            let subscriber = fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(env_filter())
                .with_target(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
    };
    result.map_err(|e| HeightmapperError::LoggingError(Box::new(e)))?;

    tracing::info!("Heightmapper v{} started", env!("CARGO_PKG_VERSION"));

    Ok(())
}
