//! CPU heightfield renderer
//!
//! Shades an elevation grid the way the hillshade style's color ramp does:
//! `(h - u_min) / (u_max - u_min)`, clamped and scaled to 0..=255, written to
//! all three color channels. Cells without data come out fully transparent.

use crate::error::{HeightmapperError, Result};
use crate::exposure::ElevationMapping;
use crate::render::{RenderPipeline, RenderedFrame};
use image::Rgba;
use tracing::trace;

/// Row-major elevation samples in meters; `None` marks missing data
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationGrid {
    width: u32,
    height: u32,
    samples: Vec<Option<f32>>,
}

impl ElevationGrid {
    /// Build a grid, checking that `samples` matches the dimensions
    pub fn new(width: u32, height: u32, samples: Vec<Option<f32>>) -> Result<Self> {
        if samples.len() != width as usize * height as usize {
            return Err(HeightmapperError::GridSizeMismatch {
                width,
                height,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Build a grid by evaluating `f(x, y)` for every cell
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Option<f32>) -> Self {
        let samples = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self {
            width,
            height,
            samples,
        }
    }

    /// Grid width in cells
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Elevation at `(x, y)`, `None` when missing or out of bounds
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.samples[y as usize * self.width as usize + x as usize]
    }

    /// Copy out a window of the grid; parts outside the grid come back as missing data
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Self {
        Self::from_fn(width, height, |cx, cy| {
            match (x.checked_add(cx), y.checked_add(cy)) {
                (Some(gx), Some(gy)) => self.get(gx, gy),
                _ => None,
            }
        })
    }

    /// Lowest and highest elevation present, if any cell has data
    pub fn elevation_range(&self) -> Option<(f32, f32)> {
        self.samples.iter().flatten().fold(None, |acc, &h| match acc {
            None => Some((h, h)),
            Some((lo, hi)) => Some((lo.min(h), hi.max(h))),
        })
    }

    fn samples(&self) -> &[Option<f32>] {
        &self.samples
    }
}

/// Renders an [`ElevationGrid`] through the current mapping
#[derive(Debug, Clone)]
pub struct HeightfieldRenderer {
    grid: ElevationGrid,
    mapping: ElevationMapping,
    view_width_meters: f64,
    redraw_requested: bool,
    frames_rendered: u64,
}

impl HeightfieldRenderer {
    /// Create a renderer; the first frame is requested immediately
    pub fn new(grid: ElevationGrid, mapping: ElevationMapping, view_width_meters: f64) -> Self {
        Self {
            grid,
            mapping,
            view_width_meters,
            redraw_requested: true,
            frames_rendered: 0,
        }
    }

    /// Grid being rendered
    pub fn grid(&self) -> &ElevationGrid {
        &self.grid
    }

    /// Swap in a different view of the terrain (pan or zoom) and request a frame
    pub fn set_view(&mut self, grid: ElevationGrid, view_width_meters: f64) {
        self.grid = grid;
        self.view_width_meters = view_width_meters;
        self.redraw_requested = true;
    }

    /// Number of frames rendered so far
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Consume a pending redraw request
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    /// Shade the grid with the current mapping
    pub fn render(&mut self) -> RenderedFrame {
        let mapping = self.mapping;
        let width = self.grid.width();
        let frame = RenderedFrame::from_fn(width, self.grid.height(), |x, y| {
            let index = y as usize * width as usize + x as usize;
            match self.grid.samples()[index] {
                Some(elevation) => {
                    let level = shade(mapping, elevation);
                    Rgba([level, level, level, u8::MAX])
                }
                None => Rgba([0, 0, 0, 0]),
            }
        });
        self.frames_rendered += 1;
        trace!(
            "Rendered frame {} with mapping [{:.1}, {:.1}]",
            self.frames_rendered, mapping.u_min, mapping.u_max
        );
        frame
    }
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is clamped to 0..=255 before the cast"
)]
fn shade(mapping: ElevationMapping, elevation: f32) -> u8 {
    (mapping.normalize(f64::from(elevation)) * 255.0).round() as u8
}

impl RenderPipeline for HeightfieldRenderer {
    fn mapping(&self) -> ElevationMapping {
        self.mapping
    }

    fn set_mapping(&mut self, mapping: ElevationMapping) {
        self.mapping = mapping;
    }

    fn request_redraw(&mut self) {
        self.redraw_requested = true;
    }

    fn view_width_meters(&self) -> f64 {
        self.view_width_meters
    }
}
