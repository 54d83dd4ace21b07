//! Comparison of a single page pair.

use std::path::Path;

use compare_core::document::Document;
use compare_core::error::Result;
use compare_core::options::CompareOptions;
use compare_core::plugin::PageRasterizer;
use compare_core::raster::Raster;
use compare_core::report::{DifferenceRegion, PageArtifacts, PageComparison, PageVerdict};
use compare_metrics::annotate::annotate_regions;
use compare_metrics::image_io::write_png;
use compare_metrics::regions::{extract_regions, RegionParams};
use compare_metrics::ssim::structural_similarity;
use compare_metrics::text_similarity::texts_match;

/// Compares one page of two documents: text layer, pixels and, on a pixel
/// difference, the regions that changed.
pub struct PageComparator<'a> {
    rasterizer: &'a dyn PageRasterizer,
    options: &'a CompareOptions,
}

impl<'a> PageComparator<'a> {
    pub fn new(rasterizer: &'a dyn PageRasterizer, options: &'a CompareOptions) -> Self {
        Self {
            rasterizer,
            options,
        }
    }

    /// Compare page `index` of `left` and `right`.
    ///
    /// Errors come from rendering, region extraction or artifact writing; the
    /// caller decides how a failed page counts.
    pub fn compare(&self, left: &Document, right: &Document, index: usize) -> Result<PageComparison> {
        let left_raster = self.rasterizer.rasterize(left, index)?;
        let right_raster = self.rasterizer.rasterize(right, index)?;

        let text = match (page_text(left, index), page_text(right, index)) {
            (Some(a), Some(b)) => Some(texts_match(a, b, self.options.text_similarity_threshold)),
            _ => None,
        };

        let mut comparison = if left_raster == right_raster {
            PageComparison {
                verdict: PageVerdict {
                    text_match: true,
                    image_match: true,
                },
                text_similarity: None,
                image_similarity: None,
                regions: Vec::new(),
                artifacts: None,
            }
        } else {
            self.compare_pixels(left, right, index, &left_raster, &right_raster)?
        };

        // Without text on both sides the image verdict decides.
        match text {
            Some((matched, ratio)) => {
                comparison.verdict.text_match = matched;
                comparison.text_similarity = Some(ratio);
            }
            None => comparison.verdict.text_match = comparison.verdict.image_match,
        }

        if !comparison.verdict.is_match() {
            log::info!(
                "{} page {}: mismatch (text {:?}, ssim {:?}, {} region(s))",
                right.name,
                index + 1,
                comparison.text_similarity,
                comparison.image_similarity,
                comparison.regions.len()
            );
        }

        Ok(comparison)
    }

    fn compare_pixels(
        &self,
        left: &Document,
        right: &Document,
        index: usize,
        left_raster: &Raster,
        right_raster: &Raster,
    ) -> Result<PageComparison> {
        let mut comparison = PageComparison {
            verdict: PageVerdict {
                text_match: false,
                image_match: false,
            },
            text_similarity: None,
            image_similarity: None,
            regions: Vec::new(),
            artifacts: None,
        };

        if !left_raster.same_dimensions(right_raster) {
            log::warn!(
                "{} page {}: rendered sizes differ ({}x{} vs {}x{})",
                right.name,
                index + 1,
                left_raster.width,
                left_raster.height,
                right_raster.width,
                right_raster.height
            );
            comparison.image_similarity = Some(0.0);
            return Ok(comparison);
        }

        let score = structural_similarity(left_raster, right_raster);
        comparison.image_similarity = Some(score);

        let params = RegionParams::from(self.options);
        comparison.regions = extract_regions(left_raster, right_raster, &params)?;

        // A surviving region is a visible change, whatever the global score.
        comparison.verdict.image_match =
            score >= self.options.image_similarity_threshold && comparison.regions.is_empty();

        if !comparison.regions.is_empty() {
            comparison.artifacts = Some(self.write_artifacts(
                left,
                right,
                index,
                left_raster,
                right_raster,
                &comparison.regions,
            )?);
        }

        Ok(comparison)
    }

    /// Write the left page as-is and the right page with its regions marked.
    fn write_artifacts(
        &self,
        left: &Document,
        right: &Document,
        index: usize,
        left_raster: &Raster,
        right_raster: &Raster,
        regions: &[DifferenceRegion],
    ) -> Result<PageArtifacts> {
        let artifacts = artifact_paths(&self.options.artifact_dir, left, right, index);

        write_png(left_raster, &artifacts.original)?;
        let annotated = annotate_regions(right_raster, regions, self.options.annotate_arrows);
        write_png(&annotated, &artifacts.annotated)?;

        log::debug!(
            "Wrote {} and {}",
            artifacts.original.display(),
            artifacts.annotated.display()
        );
        Ok(artifacts)
    }
}

fn page_text(document: &Document, index: usize) -> Option<&str> {
    document.pages.get(index).and_then(|p| p.text.as_deref())
}

/// `<dir>/original/<left-stem>_Page_<n>.png` and
/// `<dir>/annotated/<right-stem>_Page_<n>.png`, `n` being 1-based.
pub fn artifact_paths(dir: &Path, left: &Document, right: &Document, index: usize) -> PageArtifacts {
    let file = |stem: String| format!("{}_Page_{}.png", stem, index + 1);
    PageArtifacts {
        original: dir.join("original").join(file(left.stem())),
        annotated: dir.join("annotated").join(file(right.stem())),
    }
}
