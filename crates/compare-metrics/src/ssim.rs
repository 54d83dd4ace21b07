//! Structural similarity index (SSIM) between two rasters.
//!
//! Standard formulation over a 7x7 uniform sliding window with sample
//! covariance, `K1 = 0.01`, `K2 = 0.03` and an 8-bit data range. The result is
//! the mean SSIM over every window that lies fully inside the image.
//! Window sums are maintained incrementally in integers, so identical inputs
//! score exactly 1.0.

use compare_core::error::{CompareError, Result};
use compare_core::raster::Raster;

/// Side length of the sliding window.
pub const WINDOW: usize = 7;

const K1: f64 = 0.01;
const K2: f64 = 0.03;
const DATA_RANGE: f64 = 255.0;

/// SSIM between two rasters, converting both to grayscale first.
///
/// Never fails: an unsupported channel layout or a shape mismatch is logged
/// and scored as 0.0 so a batch keeps going.
pub fn structural_similarity(a: &Raster, b: &Raster) -> f64 {
    match try_structural_similarity(a, b) {
        Ok(score) => score,
        Err(e) => {
            log::error!("Error comparing images: {}", e);
            0.0
        }
    }
}

/// SSIM between two rasters, reporting layout and shape problems as errors.
pub fn try_structural_similarity(a: &Raster, b: &Raster) -> Result<f64> {
    a.check_layout()?;
    b.check_layout()?;
    if !a.same_dimensions(b) {
        return Err(CompareError::InvalidInput(format!(
            "cannot compare {}x{} raster with {}x{} raster",
            a.width, a.height, b.width, b.height
        )));
    }
    if a == b {
        return Ok(1.0);
    }
    let gray_a = a.to_gray()?;
    let gray_b = b.to_gray()?;
    Ok(ssim_gray(
        &gray_a,
        &gray_b,
        a.width as usize,
        a.height as usize,
    ))
}

/// SSIM between two equally-sized 8-bit grayscale planes.
///
/// Planes smaller than the window in either dimension are scored as a single
/// window covering the whole image.
pub fn ssim_gray(a: &[u8], b: &[u8], width: usize, height: usize) -> f64 {
    debug_assert_eq!(a.len(), width * height);
    debug_assert_eq!(b.len(), width * height);

    if width == 0 || height == 0 {
        return 1.0;
    }

    if width < WINDOW || height < WINDOW {
        let mut sums = WindowSums::default();
        for (&x, &y) in a.iter().zip(b) {
            sums.add(x, y);
        }
        return sums.ssim(width * height);
    }

    let np = WINDOW * WINDOW;

    // Column sums over the current band of WINDOW rows.
    let mut columns = vec![WindowSums::default(); width];
    for row in 0..WINDOW {
        let offset = row * width;
        for (x, col) in columns.iter_mut().enumerate() {
            col.add(a[offset + x], b[offset + x]);
        }
    }

    let mut total = 0.0;
    let mut count = 0usize;

    for top in 0..=(height - WINDOW) {
        if top > 0 {
            let leaving = (top - 1) * width;
            let entering = (top + WINDOW - 1) * width;
            for (x, col) in columns.iter_mut().enumerate() {
                col.remove(a[leaving + x], b[leaving + x]);
                col.add(a[entering + x], b[entering + x]);
            }
        }

        let mut window = WindowSums::default();
        for col in &columns[..WINDOW] {
            window.merge(col);
        }

        for left in 0..=(width - WINDOW) {
            if left > 0 {
                window.unmerge(&columns[left - 1]);
                window.merge(&columns[left + WINDOW - 1]);
            }
            total += window.ssim(np);
            count += 1;
        }
    }

    total / count as f64
}

/// Running sums of x, y, x², y² and xy over a set of pixels.
#[derive(Debug, Clone, Copy, Default)]
struct WindowSums {
    x: i64,
    y: i64,
    xx: i64,
    yy: i64,
    xy: i64,
}

impl WindowSums {
    fn add(&mut self, x: u8, y: u8) {
        let (x, y) = (x as i64, y as i64);
        self.x += x;
        self.y += y;
        self.xx += x * x;
        self.yy += y * y;
        self.xy += x * y;
    }

    fn remove(&mut self, x: u8, y: u8) {
        let (x, y) = (x as i64, y as i64);
        self.x -= x;
        self.y -= y;
        self.xx -= x * x;
        self.yy -= y * y;
        self.xy -= x * y;
    }

    fn merge(&mut self, other: &WindowSums) {
        self.x += other.x;
        self.y += other.y;
        self.xx += other.xx;
        self.yy += other.yy;
        self.xy += other.xy;
    }

    fn unmerge(&mut self, other: &WindowSums) {
        self.x -= other.x;
        self.y -= other.y;
        self.xx -= other.xx;
        self.yy -= other.yy;
        self.xy -= other.xy;
    }

    /// SSIM of the pixels summed so far, `n` being their count.
    fn ssim(&self, n: usize) -> f64 {
        let np = n as f64;
        let cov_norm = if n > 1 { np / (np - 1.0) } else { 1.0 };
        let c1 = (K1 * DATA_RANGE).powi(2);
        let c2 = (K2 * DATA_RANGE).powi(2);

        let ux = self.x as f64 / np;
        let uy = self.y as f64 / np;
        let uxx = self.xx as f64 / np;
        let uyy = self.yy as f64 / np;
        let uxy = self.xy as f64 / np;

        let vx = cov_norm * (uxx - ux * ux);
        let vy = cov_norm * (uyy - uy * uy);
        let vxy = cov_norm * (uxy - ux * uy);

        let numerator = (2.0 * ux * uy + c1) * (2.0 * vxy + c2);
        let denominator = (ux * ux + uy * uy + c1) * (vx + vy + c2);
        numerator / denominator
    }
}
