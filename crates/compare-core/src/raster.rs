//! Decoded page pixels.

use crate::error::{CompareError, Result};

/// A row-major pixel buffer with one byte per channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub data: Vec<u8>,
}

impl Raster {
    /// Wrap an existing buffer, checking its length against the shape.
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(CompareError::InvalidInput(format!(
                "raster buffer holds {} bytes, expected {} for {}x{}x{}",
                data.len(),
                expected,
                width,
                height,
                channels
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// A raster with every pixel set to `pixel` (whose length is the channel count).
    pub fn filled(width: u32, height: u32, pixel: &[u8]) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * pixel.len());
        for _ in 0..count {
            data.extend_from_slice(pixel);
        }
        Self {
            width,
            height,
            channels: pixel.len() as u8,
            data,
        }
    }

    pub fn same_dimensions(&self, other: &Raster) -> bool {
        self.width == other.width && self.height == other.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let c = self.channels as usize;
        let start = (y as usize * self.width as usize + x as usize) * c;
        &self.data[start..start + c]
    }

    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let c = self.channels as usize;
        let start = (y as usize * self.width as usize + x as usize) * c;
        &mut self.data[start..start + c]
    }

    /// Fail unless the channel count is one of the supported layouts (gray, RGB, RGBA).
    pub fn check_layout(&self) -> Result<()> {
        match self.channels {
            1 | 3 | 4 => Ok(()),
            n => Err(CompareError::UnsupportedChannelLayout(n)),
        }
    }

    /// Luminance plane, one byte per pixel. Alpha is ignored.
    pub fn to_gray(&self) -> Result<Vec<u8>> {
        self.check_layout()?;
        if self.channels == 1 {
            return Ok(self.data.clone());
        }
        Ok(self
            .data
            .chunks_exact(self.channels as usize)
            .map(|px| luma(px[0], px[1], px[2]))
            .collect())
    }
}

/// ITU-R BT.601 luma, rounded to the nearest byte.
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
    y.round().clamp(0.0, 255.0) as u8
}
