//! Frame sampler
//!
//! Produces a reduced copy of the rendered frame for exposure analysis. Only
//! approximate statistics are needed, so the frame is shrunk with the image
//! crate's triangle filter before its pixels are read.
//!
//! Shrinking happens on premultiplied floating-point pixels. Blending straight
//! RGBA would mix the black of transparent no-data pixels into their valid
//! neighbours and report intensities that exist nowhere in the terrain.

use crate::render::RenderedFrame;
use image::imageops::{self, FilterType};
use image::{Rgba, Rgba32FImage};
use tracing::trace;

/// One analysed pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Greyscale level (the red channel of the rendered frame)
    pub intensity: u8,
    /// False when no elevation data contributed to the pixel (fully transparent)
    pub is_valid: bool,
}

/// Downscaled copy of a rendered frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampledFrame {
    /// Width in samples
    pub width: u32,
    /// Height in samples
    pub height: u32,
    /// Row-major samples, `width * height` long
    pub samples: Vec<Sample>,
}

impl SampledFrame {
    /// Build a frame directly from samples (row-major)
    pub fn from_samples(width: u32, height: u32, samples: Vec<Sample>) -> Self {
        debug_assert_eq!(samples.len(), width as usize * height as usize);
        Self {
            width,
            height,
            samples,
        }
    }

    /// True when the frame holds no samples at all
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn clear(&mut self) {
        self.width = 0;
        self.height = 0;
        self.samples.clear();
    }
}

/// Reduces rendered frames to analysable samples
///
/// The sampled frame lives in a scratch buffer that is cleared and refilled on
/// every call, so the allocation is reused across passes.
#[derive(Debug)]
pub struct FrameSampler {
    downscale_factor: u32,
    scratch: SampledFrame,
}

impl FrameSampler {
    /// Create a sampler shrinking each axis by `downscale_factor` (0 is treated as 1)
    pub fn new(downscale_factor: u32) -> Self {
        Self {
            downscale_factor: downscale_factor.max(1),
            scratch: SampledFrame::default(),
        }
    }

    /// Per-axis reduction factor
    pub fn downscale_factor(&self) -> u32 {
        self.downscale_factor
    }

    /// Sample `frame`, returning a view of the refreshed scratch buffer
    pub fn sample(&mut self, frame: &RenderedFrame) -> &SampledFrame {
        self.scratch.clear();

        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return &self.scratch;
        }

        let target_width = (width / self.downscale_factor).max(1);
        let target_height = (height / self.downscale_factor).max(1);

        self.scratch.width = target_width;
        self.scratch.height = target_height;

        if (target_width, target_height) == (width, height) {
            self.scratch.samples.extend(frame.pixels().map(|pixel| {
                let [red, _, _, alpha] = pixel.0;
                Sample {
                    intensity: red,
                    is_valid: alpha != 0,
                }
            }));
        } else {
            let premultiplied =
                Rgba32FImage::from_fn(width, height, |x, y| premultiply(*frame.get_pixel(x, y)));
            let reduced = imageops::resize(
                &premultiplied,
                target_width,
                target_height,
                FilterType::Triangle,
            );
            self.scratch
                .samples
                .extend(reduced.pixels().map(|pixel| unpremultiply(*pixel)));
        }

        trace!(
            "Sampled {}x{} frame down to {}x{}",
            width, height, target_width, target_height
        );

        &self.scratch
    }
}

/// Normalised, premultiplied copy of a pixel; only red carries intensity
fn premultiply(pixel: Rgba<u8>) -> Rgba<f32> {
    let [red, _, _, alpha] = pixel.0;
    let alpha = f32::from(alpha) / 255.0;
    Rgba([f32::from(red) / 255.0 * alpha, 0.0, 0.0, alpha])
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is clamped to 0..=255 before the cast"
)]
fn unpremultiply(pixel: Rgba<f32>) -> Sample {
    let [red, _, _, alpha] = pixel.0;
    if alpha <= 0.0 {
        return Sample {
            intensity: 0,
            is_valid: false,
        };
    }
    Sample {
        intensity: (red / alpha * 255.0).round().clamp(0.0, 255.0) as u8,
        is_valid: true,
    }
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new(4)
    }
}
