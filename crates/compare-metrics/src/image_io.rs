//! Conversions between [`Raster`] and the `image` crate, and PNG persistence.

use std::io::{Cursor, Write};
use std::path::Path;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage, RgbaImage};

use compare_core::error::{CompareError, Result};
use compare_core::raster::Raster;

/// Convert a decoded image into a raster, keeping gray, RGB and RGBA layouts.
/// Other pixel formats are normalized to 8-bit RGB(A).
pub fn raster_from_image(image: DynamicImage) -> Raster {
    let (width, height) = (image.width(), image.height());
    let (channels, data) = match image {
        DynamicImage::ImageLuma8(buf) => (1, buf.into_raw()),
        DynamicImage::ImageRgb8(buf) => (3, buf.into_raw()),
        DynamicImage::ImageRgba8(buf) => (4, buf.into_raw()),
        other if other.color().has_alpha() => (4, other.to_rgba8().into_raw()),
        other => (3, other.to_rgb8().into_raw()),
    };
    Raster {
        width,
        height,
        channels,
        data,
    }
}

pub fn raster_to_image(raster: &Raster) -> Result<DynamicImage> {
    let (w, h) = (raster.width, raster.height);
    let data = raster.data.clone();
    let image = match raster.channels {
        1 => GrayImage::from_raw(w, h, data).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(w, h, data).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(w, h, data).map(DynamicImage::ImageRgba8),
        n => return Err(CompareError::UnsupportedChannelLayout(n)),
    };
    image.ok_or_else(|| {
        CompareError::InvalidInput(format!("raster buffer does not fit {}x{}", w, h))
    })
}

/// Decode an image file into a raster.
pub fn read_raster(path: &Path) -> Result<Raster> {
    let image = image::open(path).map_err(|e| {
        CompareError::UnreadablePage(format!("Failed to decode {}: {}", path.display(), e))
    })?;
    Ok(raster_from_image(image))
}

/// Encode a raster as PNG and move it into place at `path`.
///
/// The image is written to a temporary file in the destination directory and
/// renamed over `path`, so readers never observe a partial file.
pub fn write_png(raster: &Raster, path: &Path) -> Result<()> {
    let image = raster_to_image(raster)?;
    let mut encoded = Cursor::new(Vec::new());
    image
        .write_to(&mut encoded, ImageFormat::Png)
        .map_err(|e| CompareError::Write(format!("Failed to encode PNG: {}", e)))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| {
        CompareError::Write(format!("Failed to create {}: {}", dir.display(), e))
    })?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| CompareError::Write(format!("Failed to create temp file: {}", e)))?;
    tmp.write_all(encoded.get_ref())
        .map_err(|e| CompareError::Write(format!("Failed to write {}: {}", path.display(), e)))?;
    tmp.persist(path)
        .map_err(|e| CompareError::Write(format!("Failed to write {}: {}", path.display(), e)))?;

    log::debug!("Wrote {}", path.display());
    Ok(())
}
