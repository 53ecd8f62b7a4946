//! Configuration manager for loading and saving exposure configuration
//!
//! The default location is `Heightmapper/config.json` under the platform's
//! per-user configuration directory: `%APPDATA%` on Windows,
//! `~/Library/Application Support` on macOS, and `$XDG_CONFIG_HOME` (or
//! `~/.config`) elsewhere. When none of these can be determined, the working
//! directory is used. Writes go through a temporary file that is atomically
//! persisted over the target.

use crate::config::models::ExposureConfig;
use crate::error::{HeightmapperError, Result, StringError};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration manager
pub struct ConfigManager;

impl ConfigManager {
    /// Get the path to the default configuration file
    pub fn get_config_path() -> PathBuf {
        config_base_dir(|key| std::env::var_os(key).filter(|value| !value.is_empty()))
            .join("Heightmapper")
            .join("config.json")
    }

    /// Load configuration from the default location
    pub fn load() -> Result<ExposureConfig> {
        Self::load_from(&Self::get_config_path())
    }

    /// Load configuration from `path`
    ///
    /// A missing or unparsable file yields the default configuration. A file
    /// that parses but fails validation is an error, since silently replacing
    /// an explicit user value would be surprising.
    pub fn load_from(path: &Path) -> Result<ExposureConfig> {
        if !path.exists() {
            info!("Configuration file {} not found, using defaults", path.display());
            return Ok(ExposureConfig::default());
        }

        let json = std::fs::read_to_string(path)?;

        let config: ExposureConfig = match serde_json::from_str(&json) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to parse configuration, using defaults: {}", e);
                return Ok(ExposureConfig::default());
            }
        };

        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(config: &ExposureConfig) -> Result<()> {
        Self::save_to(config, &Self::get_config_path())
    }

    /// Save configuration to `path` with an atomic write
    pub fn save_to(config: &ExposureConfig, path: &Path) -> Result<()> {
        config.validate()?;

        let config_dir = path.parent().ok_or_else(|| {
            HeightmapperError::ConfigError(StringError::new(format!(
                "Invalid config path: {}",
                path.display()
            )))
        })?;
        std::fs::create_dir_all(config_dir)?;

        let json = serde_json::to_string_pretty(config)?;
        let mut temp = tempfile::NamedTempFile::new_in(config_dir)?;
        temp.write_all(json.as_bytes())?;
        temp.persist(path)
            .map_err(|e| HeightmapperError::ConfigError(Box::new(e.error)))?;

        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// Per-user configuration directory, resolved through `var`
fn config_base_dir(var: impl Fn(&str) -> Option<OsString>) -> PathBuf {
    let dir = if cfg!(windows) {
        var("APPDATA").map(PathBuf::from)
    } else if cfg!(target_os = "macos") {
        var("HOME").map(|home| PathBuf::from(home).join("Library").join("Application Support"))
    } else {
        var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| var("HOME").map(|home| PathBuf::from(home).join(".config")))
    };

    dir.unwrap_or_else(|| {
        warn!("No per-user configuration directory found, using the working directory");
        PathBuf::from(".")
    })
}
