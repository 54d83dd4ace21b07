//! PDF collaborators: page rendering, text layer, page extraction and OCR.

mod extract;
#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;
mod ocr;
pub mod render;
pub mod text;

use std::path::Path;

use compare_core::document::Document;
use compare_core::error::{CompareError, Result};
use compare_core::options::CompareOptions;
use compare_core::plugin::PageRasterizer;
use compare_core::raster::Raster;

pub use extract::PageExtractor;
pub use ocr::TesseractOcr;

/// Renders pages with `pdftoppm` and reads the text layer with lopdf.
#[derive(Debug, Clone)]
pub struct PdfRasterizer {
    dpi: u32,
    password: Option<String>,
}

impl PdfRasterizer {
    pub fn new(dpi: u32, password: Option<String>) -> Self {
        Self { dpi, password }
    }

    pub fn from_options(options: &CompareOptions) -> Self {
        Self::new(options.render_dpi(), options.password.clone())
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }
}

impl PageRasterizer for PdfRasterizer {
    fn name(&self) -> &str {
        "pdftoppm"
    }

    fn open(&self, path: &Path) -> Result<Document> {
        let doc = text::load_pdf(path, self.password.as_deref())?;
        let pages = text::page_texts(&doc);
        log::debug!("{} has {} page(s)", path.display(), pages.len());
        Ok(Document::new(path, pages))
    }

    fn rasterize(&self, document: &Document, index: usize) -> Result<Raster> {
        if index >= document.page_count() {
            return Err(CompareError::InvalidInput(format!(
                "Page index {} out of range for {} ({} pages)",
                index,
                document.name,
                document.page_count()
            )));
        }
        render::render_page(
            &document.path,
            index as u32 + 1,
            self.dpi,
            self.password.as_deref(),
        )
    }
}
