//! Collaborator traits consumed by the engines.

use std::path::Path;

use crate::document::Document;
use crate::error::Result;
use crate::raster::Raster;

/// Opens documents and renders their pages.
///
/// Implementations must fail with [`CompareError::UnreadablePage`](crate::error::CompareError::UnreadablePage)
/// when a document or page cannot be decoded, including encrypted input
/// without the right password. OCR is not performed here.
pub trait PageRasterizer: Send + Sync {
    /// Human-readable name of this rasterizer.
    fn name(&self) -> &str;

    /// Open a document and extract the text layer of every page.
    fn open(&self, path: &Path) -> Result<Document>;

    /// Render one page (0-based) at the configured zoom factor.
    fn rasterize(&self, document: &Document, index: usize) -> Result<Raster>;
}

/// Recognizes text in a rendered page.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    fn recognize(&self, raster: &Raster) -> Result<String>;
}
