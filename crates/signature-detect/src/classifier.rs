//! Per-page signature classification.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{json, Value};

use compare_core::document::Document;
use compare_core::error::Result;
use compare_core::plugin::{OcrEngine, PageRasterizer};

use crate::keywords::{KeywordMatcher, KeywordSet};

/// Page index (0-based) to "is a signature page".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationResult {
    pub pages: BTreeMap<usize, bool>,
}

impl ClassificationResult {
    /// Indices of signature pages, ascending.
    pub fn signature_pages(&self) -> Vec<usize> {
        self.pages
            .iter()
            .filter(|(_, &is_signature)| is_signature)
            .map(|(&index, _)| index)
            .collect()
    }

    pub fn to_json(&self) -> Value {
        json!({ "pages": self.signature_pages() })
    }
}

/// Classifies pages with a keyword rule, reading scanned pages through OCR.
pub struct KeywordClassifier<'a> {
    rasterizer: &'a dyn PageRasterizer,
    ocr: &'a dyn OcrEngine,
}

impl<'a> KeywordClassifier<'a> {
    pub fn new(rasterizer: &'a dyn PageRasterizer, ocr: &'a dyn OcrEngine) -> Self {
        Self { rasterizer, ocr }
    }

    /// Open `path` and classify every page against `keywords`.
    pub fn classify_path(&self, path: &Path, keywords: &KeywordSet) -> Result<ClassificationResult> {
        let document = self.rasterizer.open(path)?;
        self.classify(&document, keywords)
    }

    /// Classify every page of an opened document.
    ///
    /// A page that cannot be read or recognized is logged and counted as not
    /// a signature page.
    pub fn classify(&self, document: &Document, keywords: &KeywordSet) -> Result<ClassificationResult> {
        let matcher = KeywordMatcher::new(keywords)?;
        let mut result = ClassificationResult::default();

        for index in 0..document.page_count() {
            let is_signature = match self.page_text(document, index) {
                Ok(text) => decide(&matcher, &text, &document.name, index),
                Err(e) => {
                    log::error!("Error processing page {} of {}: {}", index + 1, document.name, e);
                    false
                }
            };
            result.pages.insert(index, is_signature);
        }

        log::info!(
            "{}: {} signature page(s) of {}",
            document.name,
            result.signature_pages().len(),
            document.page_count()
        );
        Ok(result)
    }

    /// The text layer, or OCR of the rendered page when there is none.
    fn page_text(&self, document: &Document, index: usize) -> Result<String> {
        if let Some(text) = &document.pages[index].text {
            return Ok(text.clone());
        }
        log::debug!(
            "{} page {}: no text layer, running {}",
            document.name,
            index + 1,
            self.ocr.name()
        );
        let raster = self.rasterizer.rasterize(document, index)?;
        self.ocr.recognize(&raster)
    }
}

fn decide(matcher: &KeywordMatcher, text: &str, name: &str, index: usize) -> bool {
    if !matcher.matches_primary(text) {
        log::debug!("{} page {}: no primary keyword", name, index + 1);
        return false;
    }
    if let Some(keyword) = matcher.excluded_by(text) {
        log::debug!("{} page {}: excluded by {:?}", name, index + 1, keyword);
        return false;
    }
    log::debug!("{} page {}: signature page", name, index + 1);
    true
}
