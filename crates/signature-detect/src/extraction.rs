//! Signature extraction runs: classify each input file and write its
//! signature pages to `<stem>_<n>_signatures.pdf`, `n` being the number of
//! signature pages.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use compare_core::error::{CompareError, Result};
use compare_core::options::CompareOptions;
use compare_core::plugin::{OcrEngine, PageRasterizer};
use compare_pdf::PageExtractor;

use crate::classifier::KeywordClassifier;
use crate::keywords::KeywordSet;

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionOutcome {
    pub file: String,
    /// Signature page indices (0-based).
    pub pages: Vec<usize>,
    /// The extracted document, when one was written.
    pub output: Option<PathBuf>,
    pub message: String,
    #[serde(skip)]
    pub failed: bool,
}

pub struct SignatureExtraction<'a> {
    rasterizer: &'a dyn PageRasterizer,
    ocr: &'a dyn OcrEngine,
    extractor: &'a PageExtractor,
    options: &'a CompareOptions,
}

impl<'a> SignatureExtraction<'a> {
    pub fn new(
        rasterizer: &'a dyn PageRasterizer,
        ocr: &'a dyn OcrEngine,
        extractor: &'a PageExtractor,
        options: &'a CompareOptions,
    ) -> Self {
        Self {
            rasterizer,
            ocr,
            extractor,
            options,
        }
    }

    /// Process `files` on a pool of `max_workers` threads, `batch_size` files
    /// at a time. Outcomes are returned in input order; a failing file never
    /// stops the run.
    pub fn run(
        &self,
        files: &[PathBuf],
        keywords: &KeywordSet,
        out_dir: &Path,
    ) -> Result<Vec<ExtractionOutcome>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.max_workers)
            .build()
            .map_err(|e| CompareError::Other(format!("Failed to start worker pool: {}", e)))?;

        log::info!("Extracting signature pages from {} file(s)", files.len());

        let mut outcomes = Vec::with_capacity(files.len());
        for batch in files.chunks(self.options.batch_size) {
            let results: Vec<ExtractionOutcome> = pool.install(|| {
                batch
                    .par_iter()
                    .map(|path| self.process_file(path, keywords, out_dir))
                    .collect()
            });
            outcomes.extend(results);
        }
        Ok(outcomes)
    }

    fn process_file(&self, path: &Path, keywords: &KeywordSet, out_dir: &Path) -> ExtractionOutcome {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let failed = |e: CompareError| {
            log::error!("Error processing PDF file {}: {}", file, e);
            ExtractionOutcome {
                file: file.clone(),
                pages: Vec::new(),
                output: None,
                message: format!("Error processing {}.", file),
                failed: true,
            }
        };

        let classifier = KeywordClassifier::new(self.rasterizer, self.ocr);
        let pages = match classifier.classify_path(path, keywords) {
            Ok(result) => result.signature_pages(),
            Err(e) => return failed(e),
        };

        if pages.is_empty() {
            return ExtractionOutcome {
                message: format!("Processed {}: No signature pages detected.", file),
                file,
                pages,
                output: None,
                failed: false,
            };
        }

        let output = out_dir.join(output_name(path, pages.len()));
        if let Err(e) = self.extractor.extract(path, &pages, &output) {
            return failed(e);
        }

        ExtractionOutcome {
            message: format!(
                "Processed {}. Total number of signatures: {}",
                file,
                pages.len()
            ),
            file,
            pages,
            output: Some(output),
            failed: false,
        }
    }
}

/// `<stem>_<count>_signatures.pdf`
pub fn output_name(path: &Path, count: usize) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    format!("{}_{}_signatures.pdf", stem, count)
}

/// The signature count encoded in an extracted file's name by [`output_name`].
pub fn signature_count(file_name: &str) -> Option<usize> {
    let rest = file_name.strip_suffix("_signatures.pdf")?;
    let (_, count) = rest.rsplit_once('_')?;
    count.parse().ok()
}
