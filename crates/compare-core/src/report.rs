//! Verdicts and result records produced by the comparison engine.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::CompareError;

// ---------------------------------------------------------------------------
// Difference regions
// ---------------------------------------------------------------------------

/// Axis-aligned bounding box in raster pixel coordinates.
/// `x2`/`y2` are exclusive, so a valid region has `x1 < x2` and `y1 < y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DifferenceRegion {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl DifferenceRegion {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &DifferenceRegion) -> DifferenceRegion {
        DifferenceRegion {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    /// True when the ranges overlap or lie within `distance` pixels on both axes.
    pub fn is_near(&self, other: &DifferenceRegion, distance: u32) -> bool {
        let d = distance as i64;
        let (ax1, ay1, ax2, ay2) = (self.x1 as i64, self.y1 as i64, self.x2 as i64, self.y2 as i64);
        let (bx1, by1, bx2, by2) = (
            other.x1 as i64,
            other.y1 as i64,
            other.x2 as i64,
            other.y2 as i64,
        );
        ax1 <= bx2 + d && ax2 >= bx1 - d && ay1 <= by2 + d && ay2 >= by1 - d
    }

    /// Grow by `margin` on every side, clamped to a `width` x `height` raster.
    pub fn enlarge(&self, margin: u32, width: u32, height: u32) -> DifferenceRegion {
        DifferenceRegion {
            x1: self.x1.saturating_sub(margin),
            y1: self.y1.saturating_sub(margin),
            x2: self.x2.saturating_add(margin).min(width),
            y2: self.y2.saturating_add(margin).min(height),
        }
    }
}

// ---------------------------------------------------------------------------
// Page and document verdicts
// ---------------------------------------------------------------------------

/// Outcome of comparing one page pair. Equivalent only when both flags hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageVerdict {
    pub text_match: bool,
    pub image_match: bool,
}

impl PageVerdict {
    pub fn is_match(&self) -> bool {
        self.text_match && self.image_match
    }
}

/// Paths of the two images written for a differing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageArtifacts {
    pub original: PathBuf,
    pub annotated: PathBuf,
}

/// Everything learned while comparing one page pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PageComparison {
    pub verdict: PageVerdict,
    /// `None` when either side had no text layer.
    pub text_similarity: Option<f64>,
    /// `None` when the rasters were byte-identical (SSIM skipped).
    pub image_similarity: Option<f64>,
    pub regions: Vec<DifferenceRegion>,
    pub artifacts: Option<PageArtifacts>,
}

/// Tagged per-page result: a verdict, or the error that prevented one.
#[derive(Debug)]
pub struct PageOutcome {
    pub index: usize,
    pub result: Result<PageComparison, CompareError>,
}

impl PageOutcome {
    pub fn is_match(&self) -> bool {
        matches!(&self.result, Ok(c) if c.verdict.is_match())
    }
}

/// Document-level verdict for one same-named pair.
#[derive(Debug)]
pub struct DocumentVerdict {
    pub name: String,
    pub matched: bool,
    pub left_pages: usize,
    pub right_pages: usize,
    /// Empty when page counts differ or a fast path decided the verdict.
    pub pages: Vec<PageOutcome>,
}

impl DocumentVerdict {
    pub fn page_count_mismatch(&self) -> bool {
        self.left_pages != self.right_pages
    }

    /// Number of artifact images written across all pages.
    pub fn artifact_count(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| matches!(&p.result, Ok(c) if c.artifacts.is_some()))
            .count()
            * 2
    }

    pub fn to_json(&self) -> Value {
        let pages: Vec<Value> = self
            .pages
            .iter()
            .map(|p| match &p.result {
                Ok(c) => json!({
                    "index": p.index,
                    "text_match": c.verdict.text_match,
                    "image_match": c.verdict.image_match,
                    "text_similarity": c.text_similarity,
                    "image_similarity": c.image_similarity,
                    "regions": c.regions,
                    "artifacts": c.artifacts,
                }),
                Err(e) => json!({
                    "index": p.index,
                    "error": e.to_string(),
                }),
            })
            .collect();
        json!({
            "name": self.name,
            "match": self.matched,
            "left_pages": self.left_pages,
            "right_pages": self.right_pages,
            "pages": pages,
        })
    }
}

// ---------------------------------------------------------------------------
// Folder report
// ---------------------------------------------------------------------------

/// One line of a folder comparison result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub title: String,
    pub message: String,
    pub download_link: String,
}

impl ReportEntry {
    pub fn matched(name: &str) -> Self {
        Self::new("Matched File", name)
    }

    pub fn mismatched(name: &str) -> Self {
        Self::new("Mismatched File", name)
    }

    pub fn error(name: &str) -> Self {
        Self::new("Error File", name)
    }

    fn new(title: &str, name: &str) -> Self {
        Self {
            title: title.to_string(),
            message: name.to_string(),
            download_link: name.to_string(),
        }
    }
}

/// Folder comparison results partitioned by outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderReport {
    pub matches: Vec<ReportEntry>,
    pub mismatches: Vec<ReportEntry>,
    pub errors: Vec<ReportEntry>,
}

impl FolderReport {
    pub fn total(&self) -> usize {
        self.matches.len() + self.mismatches.len() + self.errors.len()
    }
}
