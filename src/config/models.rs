//! Configuration data models
//!
//! This module defines the data structures used for exposure configuration.
//! Defaults map sea level to black and Everest to white, with auto-exposure on.

use crate::error::{HeightmapperError, Result};
use crate::exposure::ElevationMapping;
use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposureConfig {
    /// Whether auto-exposure starts enabled
    pub auto_exposure: bool,
    /// Allow the mapped minimum to go below sea level
    pub include_negative_elevations: bool,
    /// Mapping applied before the first exposure pass
    pub initial_mapping: ElevationMapping,
    /// Frame sampler settings
    pub sampler: SamplerSettings,
    /// Physical clamps applied to every computed mapping
    pub limits: ElevationLimits,
    /// Consecutive saturated frames with a falling trend needed to converge (>= 1)
    pub convergence_frames: u32,
    /// Quiet period after the last camera move before the view counts as settled
    pub view_settle_ms: u64,
}

/// Frame sampler settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerSettings {
    /// Per-axis reduction applied before analysis (1 = analyse full resolution)
    pub downscale_factor: u32,
}

/// Physical elevation bounds in meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevationLimits {
    /// Lowest mappable elevation (deepest ocean trench, rounded)
    pub min_elevation: f64,
    /// Highest mappable elevation (highest peak, rounded)
    pub max_elevation: f64,
    /// Added to `u_max` when a computed range collapses
    pub degenerate_padding: f64,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            auto_exposure: true,
            include_negative_elevations: false,
            initial_mapping: ElevationMapping::default(),
            sampler: SamplerSettings::default(),
            limits: ElevationLimits::default(),
            convergence_frames: 1,
            view_settle_ms: 250,
        }
    }
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            downscale_factor: 4,
        }
    }
}

impl Default for ElevationLimits {
    fn default() -> Self {
        Self {
            min_elevation: -11000.0,
            max_elevation: 8900.0,
            degenerate_padding: 10.0,
        }
    }
}

impl ExposureConfig {
    /// Reject values the exposure loop cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.sampler.downscale_factor == 0 {
            return Err(invalid("sampler.downscale_factor", "must be at least 1"));
        }
        if self.convergence_frames == 0 {
            return Err(invalid("convergence_frames", "must be at least 1"));
        }
        let mapping = self.initial_mapping;
        if !(mapping.u_min.is_finite() && mapping.u_max.is_finite()) {
            return Err(invalid("initial_mapping", "bounds must be finite"));
        }
        if mapping.u_min >= mapping.u_max {
            return Err(invalid(
                "initial_mapping",
                format!("u_min ({}) must be below u_max ({})", mapping.u_min, mapping.u_max),
            ));
        }
        if self.limits.min_elevation >= self.limits.max_elevation {
            return Err(invalid(
                "limits",
                "min_elevation must be below max_elevation",
            ));
        }
        if self.limits.degenerate_padding <= 0.0 {
            return Err(invalid("limits.degenerate_padding", "must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> HeightmapperError {
    HeightmapperError::InvalidConfig {
        field,
        reason: reason.into(),
    }
}
