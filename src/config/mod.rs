//! Configuration management module
//!
//! This module handles loading, validating and saving the exposure
//! configuration. Configuration is stored as JSON with atomic writes.

pub mod manager;
pub mod models;

pub use manager::ConfigManager;
pub use models::{ElevationLimits, ExposureConfig, SamplerSettings};
