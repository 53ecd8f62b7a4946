//! Render pipeline interface
//!
//! The exposure controller never draws anything itself. It reads finished
//! frames and talks back to whatever produced them through [`RenderPipeline`]:
//! read and write the elevation mapping, ask for a redraw, and query the width
//! of the current view for the scale factor readout.
//!
//! [`HeightfieldRenderer`] is a CPU implementation over an in-memory elevation
//! grid, used by the command line tool and the tests. [`terrarium`] decodes the
//! Mapzen terrarium PNG encoding into such grids.

pub mod heightfield;
pub mod terrarium;

use crate::exposure::ElevationMapping;

pub use heightfield::{ElevationGrid, HeightfieldRenderer};

/// A finished frame: greyscale in the color channels, alpha 0 where no data was drawn
pub type RenderedFrame = image::RgbaImage;

/// The rendering side of the exposure loop
pub trait RenderPipeline {
    /// Mapping currently used to shade elevations
    fn mapping(&self) -> ElevationMapping;

    /// Replace the mapping used for subsequent frames
    fn set_mapping(&mut self, mapping: ElevationMapping);

    /// Ask for a new frame; completion is reported back asynchronously
    fn request_redraw(&mut self);

    /// Width of the visible area in meters
    fn view_width_meters(&self) -> f64;
}
