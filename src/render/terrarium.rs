//! Terrarium elevation encoding
//!
//! Terrarium tiles pack elevation into the color channels of a PNG:
//! `h = (R * 256 + G + B / 256) - 32768` meters. Transparent pixels carry no
//! data.

use crate::error::{HeightmapperError, Result};
use crate::render::ElevationGrid;
use image::{ImageReader, Rgba, RgbaImage};
use std::path::Path;
use tracing::info;

const OFFSET: f32 = 32768.0;

/// Decode one terrarium pixel
pub fn decode_pixel(pixel: Rgba<u8>) -> Option<f32> {
    let [r, g, b, a] = pixel.0;
    if a == 0 {
        return None;
    }
    Some(f32::from(r) * 256.0 + f32::from(g) + f32::from(b) / 256.0 - OFFSET)
}

/// Encode an elevation as a terrarium pixel (inverse of [`decode_pixel`])
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "the shifted value is clamped to the 24-bit encodable range first"
)]
pub fn encode_pixel(elevation: Option<f32>) -> Rgba<u8> {
    let Some(h) = elevation else {
        return Rgba([0, 0, 0, 0]);
    };
    let scaled = ((h + OFFSET) * 256.0).round().clamp(0.0, 16_777_215.0) as u32;
    let [_, r, g, b] = scaled.to_be_bytes();
    Rgba([r, g, b, u8::MAX])
}

/// Decode a terrarium image already in memory
pub fn decode_image(image: &RgbaImage) -> ElevationGrid {
    ElevationGrid::from_fn(image.width(), image.height(), |x, y| {
        decode_pixel(*image.get_pixel(x, y))
    })
}

/// Load a terrarium PNG from disk
pub fn load(path: &Path) -> Result<ElevationGrid> {
    let image = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|source| HeightmapperError::ImageError {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();

    let grid = decode_image(&image);
    info!(
        "Loaded {}x{} terrarium heightmap from {}",
        grid.width(),
        grid.height(),
        path.display()
    );
    Ok(grid)
}
