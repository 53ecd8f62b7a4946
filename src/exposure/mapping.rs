//! Elevation-to-intensity mapping

use serde::{Deserialize, Serialize};

/// Elevation bounds (meters) mapped to intensities 0 and 255
///
/// `u_min < u_max` holds for every mapping the exposure loop produces; manual
/// input is expected to respect it as well.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevationMapping {
    /// Elevation rendered as intensity 0
    pub u_min: f64,
    /// Elevation rendered as intensity 255
    pub u_max: f64,
}

impl Default for ElevationMapping {
    /// Sea level to the summit of Everest
    fn default() -> Self {
        Self {
            u_min: 0.0,
            u_max: 8848.0,
        }
    }
}

impl ElevationMapping {
    /// Create a mapping from explicit bounds
    pub const fn new(u_min: f64, u_max: f64) -> Self {
        Self { u_min, u_max }
    }

    /// Width of the mapped elevation window
    pub fn range(&self) -> f64 {
        self.u_max - self.u_min
    }

    /// Elevation corresponding to an intensity level
    ///
    /// Levels outside 0..=255 extrapolate linearly; the widening step relies on
    /// that to look past the ends of the current window.
    pub fn elevation_at(&self, intensity: f64) -> f64 {
        intensity / 255.0 * self.range() + self.u_min
    }

    /// Normalised position of `elevation` in the window, clamped to 0..=1
    pub fn normalize(&self, elevation: f64) -> f64 {
        let range = self.range();
        if range <= 0.0 {
            return 0.0;
        }
        ((elevation - self.u_min) / range).clamp(0.0, 1.0)
    }
}
