//! Difference region extraction.
//!
//! Pipeline, for two equally-shaped rasters:
//! 1. per-pixel absolute difference reduced to a grayscale magnitude
//! 2. binary mask of magnitudes above the intensity cutoff
//! 3. bounding boxes of the outer connected regions of the mask
//! 4. boxes not larger than the size threshold are dropped as render noise
//! 5. near or overlapping boxes are merged until a fixed point
//! 6. surviving boxes are enlarged by a margin, clamped to the raster

use std::collections::VecDeque;

use compare_core::error::{CompareError, Result};
use compare_core::options::CompareOptions;
use compare_core::raster::{luma, Raster};
use compare_core::report::DifferenceRegion;

/// Upper bound on merge passes, whatever the input layout.
pub const MAX_MERGE_PASSES: usize = 10_000;

/// Tunables for region extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionParams {
    pub intensity_threshold: u8,
    pub size_threshold: u32,
    pub merge_distance: u32,
    pub enlarge_margin: u32,
}

impl Default for RegionParams {
    fn default() -> Self {
        Self {
            intensity_threshold: 30,
            size_threshold: 20,
            merge_distance: 30,
            enlarge_margin: 5,
        }
    }
}

impl From<&CompareOptions> for RegionParams {
    fn from(options: &CompareOptions) -> Self {
        Self {
            intensity_threshold: options.diff_intensity_threshold,
            size_threshold: options.region_size_threshold,
            merge_distance: options.region_merge_distance,
            enlarge_margin: options.region_enlarge_margin,
        }
    }
}

/// Binary difference mask, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffMask {
    pub width: usize,
    pub height: usize,
    pub bits: Vec<bool>,
}

impl DiffMask {
    pub fn is_empty(&self) -> bool {
        !self.bits.iter().any(|&b| b)
    }

    fn get(&self, x: usize, y: usize) -> bool {
        self.bits[y * self.width + x]
    }
}

/// Run the full extraction pipeline.
pub fn extract_regions(
    a: &Raster,
    b: &Raster,
    params: &RegionParams,
) -> Result<Vec<DifferenceRegion>> {
    let mask = difference_mask(a, b, params.intensity_threshold)?;
    if mask.is_empty() {
        return Ok(Vec::new());
    }

    let candidates: Vec<DifferenceRegion> = outer_region_boxes(&mask)
        .into_iter()
        .filter(|r| r.area() > params.size_threshold as u64)
        .collect();

    log::debug!(
        "{} candidate region(s) above {} px",
        candidates.len(),
        params.size_threshold
    );

    let merged = merge_regions(candidates, params.merge_distance);
    Ok(enlarge_regions(
        &merged,
        params.enlarge_margin,
        a.width,
        a.height,
    ))
}

/// Mask of pixels whose difference magnitude exceeds `threshold`.
///
/// Rasters with matching colour layouts are differenced per channel and the
/// difference is reduced to luma; mixed layouts are compared in grayscale.
pub fn difference_mask(a: &Raster, b: &Raster, threshold: u8) -> Result<DiffMask> {
    a.check_layout()?;
    b.check_layout()?;
    if !a.same_dimensions(b) {
        return Err(CompareError::RegionExtraction(format!(
            "raster shapes differ: {}x{} vs {}x{}",
            a.width, a.height, b.width, b.height
        )));
    }

    let magnitudes: Vec<u8> = if a.channels == b.channels && a.channels >= 3 {
        let c = a.channels as usize;
        a.data
            .chunks_exact(c)
            .zip(b.data.chunks_exact(c))
            .map(|(pa, pb)| {
                luma(
                    pa[0].abs_diff(pb[0]),
                    pa[1].abs_diff(pb[1]),
                    pa[2].abs_diff(pb[2]),
                )
            })
            .collect()
    } else {
        let ga = a.to_gray()?;
        let gb = b.to_gray()?;
        ga.iter().zip(&gb).map(|(x, y)| x.abs_diff(*y)).collect()
    };

    Ok(DiffMask {
        width: a.width as usize,
        height: a.height as usize,
        bits: magnitudes.into_iter().map(|m| m > threshold).collect(),
    })
}

/// Bounding boxes of the 8-connected regions of the mask that are not
/// enclosed in a hole of another region.
///
/// A region counts as outer when it touches the image border or borders
/// background that is 4-connected to the border.
pub fn outer_region_boxes(mask: &DiffMask) -> Vec<DifferenceRegion> {
    let (w, h) = (mask.width, mask.height);
    if w == 0 || h == 0 {
        return Vec::new();
    }

    let outside = border_background(mask);
    let mut visited = vec![false; w * h];
    let mut boxes = Vec::new();
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for sy in 0..h {
        for sx in 0..w {
            let start = sy * w + sx;
            if !mask.bits[start] || visited[start] {
                continue;
            }

            visited[start] = true;
            stack.push((sx, sy));
            let (mut x1, mut y1, mut x2, mut y2) = (sx, sy, sx, sy);
            let mut outer = false;

            while let Some((x, y)) = stack.pop() {
                x1 = x1.min(x);
                y1 = y1.min(y);
                x2 = x2.max(x);
                y2 = y2.max(y);

                if !outer {
                    outer = x == 0
                        || y == 0
                        || x + 1 == w
                        || y + 1 == h
                        || four_neighbours(x, y, w, h).any(|(nx, ny)| outside[ny * w + nx]);
                }

                for (nx, ny) in eight_neighbours(x, y, w, h) {
                    let idx = ny * w + nx;
                    if mask.bits[idx] && !visited[idx] {
                        visited[idx] = true;
                        stack.push((nx, ny));
                    }
                }
            }

            if outer {
                boxes.push(DifferenceRegion::new(
                    x1 as u32,
                    y1 as u32,
                    x2 as u32 + 1,
                    y2 as u32 + 1,
                ));
            }
        }
    }

    boxes
}

/// Background pixels 4-connected to the image border.
fn border_background(mask: &DiffMask) -> Vec<bool> {
    let (w, h) = (mask.width, mask.height);
    let mut outside = vec![false; w * h];
    let mut stack: Vec<(usize, usize)> = Vec::new();

    let seed = |x: usize, y: usize, outside: &mut [bool], stack: &mut Vec<(usize, usize)>| {
        let idx = y * w + x;
        if !mask.get(x, y) && !outside[idx] {
            outside[idx] = true;
            stack.push((x, y));
        }
    };

    for x in 0..w {
        seed(x, 0, &mut outside, &mut stack);
        seed(x, h - 1, &mut outside, &mut stack);
    }
    for y in 0..h {
        seed(0, y, &mut outside, &mut stack);
        seed(w - 1, y, &mut outside, &mut stack);
    }

    while let Some((x, y)) = stack.pop() {
        for (nx, ny) in four_neighbours(x, y, w, h) {
            seed(nx, ny, &mut outside, &mut stack);
        }
    }

    outside
}

fn four_neighbours(
    x: usize,
    y: usize,
    w: usize,
    h: usize,
) -> impl Iterator<Item = (usize, usize)> {
    const STEPS: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
    offsets(x, y, w, h, &STEPS)
}

fn eight_neighbours(
    x: usize,
    y: usize,
    w: usize,
    h: usize,
) -> impl Iterator<Item = (usize, usize)> {
    const STEPS: [(i64, i64); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];
    offsets(x, y, w, h, &STEPS)
}

fn offsets(
    x: usize,
    y: usize,
    w: usize,
    h: usize,
    steps: &'static [(i64, i64)],
) -> impl Iterator<Item = (usize, usize)> {
    steps.iter().filter_map(move |(dx, dy)| {
        let nx = x as i64 + dx;
        let ny = y as i64 + dy;
        if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
            None
        } else {
            Some((nx as usize, ny as usize))
        }
    })
}

/// Merge boxes that overlap or lie within `distance` pixels on both axes,
/// repeating full passes until one produces no merge.
///
/// Each pass takes boxes from the front of the list; a box near any later box
/// is folded into that box, otherwise it is kept. Every merging pass removes
/// at least one box, and the pass count is additionally capped at
/// [`MAX_MERGE_PASSES`].
pub fn merge_regions(boxes: Vec<DifferenceRegion>, distance: u32) -> Vec<DifferenceRegion> {
    let max_passes = (boxes.len() + 1).min(MAX_MERGE_PASSES);
    let mut boxes = boxes;

    for _ in 0..max_passes {
        let mut queue: VecDeque<DifferenceRegion> = boxes.into();
        let mut kept = Vec::with_capacity(queue.len());
        let mut merged = false;

        while let Some(current) = queue.pop_front() {
            if let Some(other) = queue.iter_mut().find(|b| current.is_near(b, distance)) {
                *other = current.union(other);
                merged = true;
            } else {
                kept.push(current);
            }
        }

        boxes = kept;
        if !merged {
            return boxes;
        }
    }

    log::warn!(
        "Region merge stopped after {} passes with {} box(es) left",
        max_passes,
        boxes.len()
    );
    boxes
}

/// Grow every box by `margin`, clamped to a `width` x `height` raster.
pub fn enlarge_regions(
    boxes: &[DifferenceRegion],
    margin: u32,
    width: u32,
    height: u32,
) -> Vec<DifferenceRegion> {
    boxes
        .iter()
        .map(|b| b.enlarge(margin, width, height))
        .collect()
}
