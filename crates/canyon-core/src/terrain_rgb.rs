//! Terrain-RGB raster decoding.
//!
//! Elevation is packed into the red, green and blue channels of each pixel:
//! `elevation = -10000 + (R * 65536 + G * 256 + B) * 0.1`.

use std::fmt;

const RGBA_CHANNELS: usize = 4;

/// Decoded RGBA8 pixels of one tile, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl fmt::Debug for Raster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Raster {
    /// Wrap an RGBA8 buffer. Returns `None` when the dimensions do not match the buffer.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(RGBA_CHANNELS)?;
        if pixels.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Elevation in meters at a pixel. Coordinates are floored and clamped into the raster.
    pub fn elevation_at(&self, x: f64, y: f64) -> f64 {
        let col = clamp_pixel(x, self.width);
        let row = clamp_pixel(y, self.height);
        let idx = (row * self.width as usize + col) * RGBA_CHANNELS;
        decode_terrain_rgb(self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2])
    }
}

fn clamp_pixel(value: f64, extent: u32) -> usize {
    let max = f64::from(extent - 1);
    if !value.is_finite() {
        return 0;
    }
    value.floor().clamp(0.0, max) as usize
}

/// Decode one terrain-RGB pixel to meters.
pub fn decode_terrain_rgb(r: u8, g: u8, b: u8) -> f64 {
    let packed = u32::from(r) * 65_536 + u32::from(g) * 256 + u32::from(b);
    -10_000.0 + f64::from(packed) * 0.1
}

/// Inverse of [`decode_terrain_rgb`], rounded to the 0.1 m encoding step.
pub fn encode_terrain_rgb(elevation_m: f64) -> [u8; 3] {
    let packed = ((elevation_m + 10_000.0) * 10.0).round().clamp(0.0, 16_777_215.0) as u32;
    [(packed >> 16) as u8, (packed >> 8) as u8, packed as u8]
}
