//! Comparison of two same-named documents.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use compare_core::document::Document;
use compare_core::error::Result;
use compare_core::options::CompareOptions;
use compare_core::plugin::PageRasterizer;
use compare_core::report::{DocumentVerdict, PageOutcome};

use crate::page::PageComparator;

pub struct DocumentComparator<'a> {
    rasterizer: &'a dyn PageRasterizer,
    options: &'a CompareOptions,
}

impl<'a> DocumentComparator<'a> {
    pub fn new(rasterizer: &'a dyn PageRasterizer, options: &'a CompareOptions) -> Self {
        Self {
            rasterizer,
            options,
        }
    }

    /// Open and compare two files.
    ///
    /// Fails only when a document cannot be opened; failures on individual
    /// pages are recorded in the verdict.
    pub fn compare_paths(&self, left: &Path, right: &Path) -> Result<DocumentVerdict> {
        let left_doc = self.rasterizer.open(left)?;
        let right_doc = self.rasterizer.open(right)?;

        if self.options.identical_file_fast_path
            && left_doc.page_count() == right_doc.page_count()
            && files_identical(left, right)?
        {
            log::debug!("{}: files are byte-identical", right_doc.name);
            return Ok(DocumentVerdict {
                name: right_doc.name.clone(),
                matched: true,
                left_pages: left_doc.page_count(),
                right_pages: right_doc.page_count(),
                pages: Vec::new(),
            });
        }

        Ok(self.compare(&left_doc, &right_doc))
    }

    /// Compare two opened documents page by page.
    ///
    /// Differing page counts are a mismatch without rendering anything.
    /// Otherwise every page is compared, even after the first mismatch, so
    /// the artifacts cover the whole document.
    pub fn compare(&self, left: &Document, right: &Document) -> DocumentVerdict {
        let mut verdict = DocumentVerdict {
            name: right.name.clone(),
            matched: false,
            left_pages: left.page_count(),
            right_pages: right.page_count(),
            pages: Vec::new(),
        };

        if verdict.page_count_mismatch() {
            log::info!(
                "{}: page count differs ({} vs {})",
                right.name,
                verdict.left_pages,
                verdict.right_pages
            );
            return verdict;
        }

        let pages = PageComparator::new(self.rasterizer, self.options);
        for index in 0..left.page_count() {
            let result = pages.compare(left, right, index);
            if let Err(e) = &result {
                log::error!("{} page {}: {}", right.name, index + 1, e);
            }
            verdict.pages.push(PageOutcome { index, result });
        }

        verdict.matched = verdict.pages.iter().all(PageOutcome::is_match);
        log::info!(
            "{}: {} ({} page(s), {} artifact(s))",
            right.name,
            if verdict.matched { "match" } else { "mismatch" },
            verdict.left_pages,
            verdict.artifact_count()
        );
        verdict
    }
}

/// Byte-for-byte file equality, read in chunks.
pub fn files_identical(a: &Path, b: &Path) -> Result<bool> {
    if std::fs::metadata(a)?.len() != std::fs::metadata(b)?.len() {
        return Ok(false);
    }

    let mut ra = BufReader::new(File::open(a)?);
    let mut rb = BufReader::new(File::open(b)?);
    let mut buf_a = [0u8; 8192];
    let mut buf_b = [0u8; 8192];

    loop {
        let n = read_full(&mut ra, &mut buf_a)?;
        let m = read_full(&mut rb, &mut buf_b)?;
        if n != m || buf_a[..n] != buf_b[..m] {
            return Ok(false);
        }
        if n == 0 {
            return Ok(true);
        }
    }
}

/// Fill `buf` as far as the reader allows; returns the byte count.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
