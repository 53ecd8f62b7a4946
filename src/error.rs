//! Error types for `Heightmapper`
//!
//! The exposure loop itself never fails: empty frames, degenerate ranges and
//! out-of-bounds mappings are all recovered where they occur. The variants here
//! cover the surrounding layers (configuration, image I/O, logging setup).
//!
//! Error variants use `#[source]` to preserve error chains.

use std::path::PathBuf;
use thiserror::Error;

/// Simple error type for wrapping string messages while implementing `std::error::Error`
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StringError(pub String);

impl StringError {
    /// Create a new `StringError` from a string message
    pub fn new(msg: impl Into<String>) -> Box<Self> {
        Box::new(Self(msg.into()))
    }
}

/// Main error type for `Heightmapper`
#[derive(Debug, Error)]
pub enum HeightmapperError {
    /// Configuration could not be loaded, validated or saved
    #[error("Configuration error: {0}")]
    ConfigError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A configuration value is outside its allowed range
    #[error("Invalid configuration value for `{field}`: {reason}")]
    InvalidConfig {
        /// Dotted path of the offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// Logging subsystem could not be installed
    #[error("Logging setup failed: {0}")]
    LoggingError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Heightmap image could not be decoded or encoded
    #[error("Image error for {path}: {source}")]
    ImageError {
        /// File the operation was working on
        path: PathBuf,
        /// Underlying image crate error
        #[source]
        source: image::ImageError,
    },

    /// Elevation grid dimensions don't match the supplied samples
    #[error("Elevation grid is {width}x{height} but {actual} samples were supplied")]
    GridSizeMismatch {
        /// Grid width in samples
        width: u32,
        /// Grid height in samples
        height: u32,
        /// Number of samples actually provided
        actual: usize,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for `Heightmapper` operations
pub type Result<T> = std::result::Result<T, HeightmapperError>;

/// Convert an error to a user-friendly message
///
/// Used by the command line front end when reporting a failed run.
pub fn get_user_friendly_error(error: &HeightmapperError) -> String {
    match error {
        HeightmapperError::ConfigError(_) => "Failed to load or save configuration.\n\n\
             Your settings may not persist.\n\
             Check that the configuration directory is writable."
            .to_string(),
        HeightmapperError::InvalidConfig { field, reason } => {
            format!(
                "The configuration value `{field}` is invalid: {reason}\n\n\
                 Fix the value or delete the configuration file to restore defaults."
            )
        }
        HeightmapperError::LoggingError(e) => {
            format!("Logging could not be started:\n\n{e}")
        }
        HeightmapperError::ImageError { path, source } => {
            format!(
                "Could not read or write the image {}:\n\n{source}\n\n\
                 Heightmaps must be terrarium-encoded PNG files.",
                path.display()
            )
        }
        HeightmapperError::GridSizeMismatch { .. } => {
            format!("The elevation data is malformed:\n\n{error}")
        }
        HeightmapperError::IoError(e) => {
            format!(
                "A file system error occurred:\n\n{e}\n\n\
                 Please check file permissions and disk space."
            )
        }
        HeightmapperError::JsonError(e) => {
            format!(
                "Configuration file is corrupted:\n\n{e}\n\n\
                 The application will use default settings."
            )
        }
    }
}
