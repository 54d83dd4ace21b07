//! Opened documents and their pages.
//!
//! A `Document` is produced by a [`PageRasterizer`](crate::plugin::PageRasterizer)
//! and owned by the caller for the duration of one comparison or classification.
//! Page rasters are never stored here; they are rendered on demand.

use std::path::{Path, PathBuf};

/// An opened document: its identity plus the per-page text layer.
#[derive(Debug, Clone)]
pub struct Document {
    /// File name used for pairing across directory trees.
    pub name: String,
    pub path: PathBuf,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn new(path: &Path, pages: Vec<Page>) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            path: path.to_path_buf(),
            pages,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// File name without its extension, used to name derived artifacts.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }
}

/// One page of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 0-based position within the document.
    pub index: usize,
    /// Extracted text layer; `None` when the page has no extractable text.
    pub text: Option<String>,
}

impl Page {
    /// Build a page, treating an empty or whitespace-only text layer as absent.
    pub fn new(index: usize, text: Option<String>) -> Self {
        let text = text.filter(|t| !t.trim().is_empty());
        Self { index, text }
    }

    pub fn has_text(&self) -> bool {
        self.text.is_some()
    }
}
