//! `Heightmapper` - auto-exposure for greyscale heightmap rendering
//!
//! Maps elevations to 256 grey levels through a min/max window and keeps that
//! window fitted to the visible terrain with a camera-style auto-exposure loop:
//! sample the rendered frame, measure the intensity range actually used, and
//! remap, widen, or stop.
//!
//! - `exposure`: sampler, analyzer, policy state machine and controller
//! - `render`: the render pipeline interface plus a CPU heightfield renderer
//! - `config`: JSON configuration with validation and atomic saves
//! - `utils`: logging setup

// Module declarations
pub mod config;
pub mod error;
pub mod exposure;
pub mod render;
pub mod utils;

// Re-export commonly used types
pub use error::{HeightmapperError, Result};
pub use exposure::{ElevationMapping, ExposureController, ExposurePhase};
