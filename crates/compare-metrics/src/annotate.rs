//! Drawing difference regions onto a raster for operator review.

use compare_core::raster::Raster;
use compare_core::report::DifferenceRegion;

pub const BOX_COLOR: [u8; 3] = [0, 255, 0];
pub const ARROW_COLOR: [u8; 3] = [255, 0, 0];

/// Horizontal gap between a box's right edge and the arrow tip.
pub const ARROW_OFFSET: i64 = 20;
pub const ARROW_LENGTH: i64 = 150;
/// Arrow head length as a fraction of the arrow length.
pub const ARROW_TIP_RATIO: f64 = 0.1;

/// Copy of `raster` with a rectangle around every region and, when
/// `arrows` is set, an arrow pointing at each region's right edge.
///
/// The result is always RGB(A) so the markings keep their colour; gray
/// input is expanded to RGB. Lines are one pixel wide and clipped to the
/// raster.
pub fn annotate_regions(raster: &Raster, regions: &[DifferenceRegion], arrows: bool) -> Raster {
    let mut canvas = to_color(raster);

    for region in regions {
        draw_rectangle(&mut canvas, region, BOX_COLOR);

        if arrows {
            let cy = region.y1 as i64 + region.height() as i64 / 2;
            let tip = (region.x2 as i64 + ARROW_OFFSET, cy);
            let tail = (tip.0 + ARROW_LENGTH, cy);
            draw_arrow(&mut canvas, tail, tip, ARROW_COLOR);
        }
    }

    canvas
}

fn to_color(raster: &Raster) -> Raster {
    if raster.channels != 1 {
        return raster.clone();
    }
    let data = raster.data.iter().flat_map(|&v| [v, v, v]).collect();
    Raster {
        width: raster.width,
        height: raster.height,
        channels: 3,
        data,
    }
}

fn draw_rectangle(canvas: &mut Raster, region: &DifferenceRegion, color: [u8; 3]) {
    let (x1, y1) = (region.x1 as i64, region.y1 as i64);
    let (x2, y2) = (region.x2 as i64, region.y2 as i64);
    draw_line(canvas, (x1, y1), (x2, y1), color);
    draw_line(canvas, (x2, y1), (x2, y2), color);
    draw_line(canvas, (x2, y2), (x1, y2), color);
    draw_line(canvas, (x1, y2), (x1, y1), color);
}

/// Line from `from` to `to` with a two-stroke head at `to`.
fn draw_arrow(canvas: &mut Raster, from: (i64, i64), to: (i64, i64), color: [u8; 3]) {
    draw_line(canvas, from, to, color);

    let dx = (from.0 - to.0) as f64;
    let dy = (from.1 - to.1) as f64;
    let angle = dy.atan2(dx);
    let tip = (dx * dx + dy * dy).sqrt() * ARROW_TIP_RATIO;

    for side in [std::f64::consts::FRAC_PI_4, -std::f64::consts::FRAC_PI_4] {
        let end = (
            (to.0 as f64 + tip * (angle + side).cos()).round() as i64,
            (to.1 as f64 + tip * (angle + side).sin()).round() as i64,
        );
        draw_line(canvas, end, to, color);
    }
}

/// Bresenham line, skipping pixels outside the canvas.
fn draw_line(canvas: &mut Raster, from: (i64, i64), to: (i64, i64), color: [u8; 3]) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        put_pixel(canvas, x, y, color);
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn put_pixel(canvas: &mut Raster, x: i64, y: i64, color: [u8; 3]) {
    if x < 0 || y < 0 || x >= canvas.width as i64 || y >= canvas.height as i64 {
        return;
    }
    let pixel = canvas.pixel_mut(x as u32, y as u32);
    pixel[..3].copy_from_slice(&color);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white(width: u32, height: u32) -> Raster {
        Raster::filled(width, height, &[255, 255, 255])
    }

    #[test]
    fn test_rectangle_outline() {
        let raster = white(40, 40);
        let region = DifferenceRegion::new(5, 5, 15, 12);
        let out = annotate_regions(&raster, &[region], false);

        assert_eq!(out.pixel(5, 5), &BOX_COLOR);
        assert_eq!(out.pixel(15, 12), &BOX_COLOR);
        assert_eq!(out.pixel(10, 5), &BOX_COLOR);
        assert_eq!(out.pixel(5, 8), &BOX_COLOR);
        // Interior untouched
        assert_eq!(out.pixel(10, 8), &[255, 255, 255]);
        // Source left alone
        assert_eq!(raster.pixel(5, 5), &[255, 255, 255]);
    }

    #[test]
    fn test_arrow_points_at_right_edge() {
        let raster = white(300, 60);
        let region = DifferenceRegion::new(10, 20, 30, 40);
        let out = annotate_regions(&raster, &[region], true);

        // Shaft runs from x2 + 20 to x2 + 170 along the box centre
        assert_eq!(out.pixel(50, 30), &ARROW_COLOR);
        assert_eq!(out.pixel(120, 30), &ARROW_COLOR);
        assert_eq!(out.pixel(200, 30), &ARROW_COLOR);
        assert_eq!(out.pixel(201, 30), &[255, 255, 255]);
        // Head strokes leave the tip diagonally
        assert_eq!(out.pixel(55, 25), &ARROW_COLOR);
        assert_eq!(out.pixel(55, 35), &ARROW_COLOR);
    }

    #[test]
    fn test_arrows_optional() {
        let raster = white(300, 60);
        let region = DifferenceRegion::new(10, 20, 30, 40);
        let out = annotate_regions(&raster, &[region], false);
        assert_eq!(out.pixel(120, 30), &[255, 255, 255]);
    }

    #[test]
    fn test_clipping_at_edges() {
        let raster = white(50, 30);
        // Box touching the far corner; arrow runs entirely off canvas
        let region = DifferenceRegion::new(40, 20, 50, 30);
        let out = annotate_regions(&raster, &[region], true);
        assert_eq!(out.pixel(40, 20), &BOX_COLOR);
        assert_eq!(out.pixel(49, 20), &BOX_COLOR);
    }

    #[test]
    fn test_gray_input_becomes_rgb() {
        let raster = Raster::filled(20, 20, &[200]);
        let out = annotate_regions(&raster, &[DifferenceRegion::new(2, 2, 8, 8)], false);
        assert_eq!(out.channels, 3);
        assert_eq!(out.pixel(0, 0), &[200, 200, 200]);
        assert_eq!(out.pixel(2, 2), &BOX_COLOR);
    }

    #[test]
    fn test_rgba_keeps_alpha() {
        let raster = Raster::filled(20, 20, &[255, 255, 255, 128]);
        let out = annotate_regions(&raster, &[DifferenceRegion::new(2, 2, 8, 8)], false);
        assert_eq!(out.pixel(2, 2), &[0, 255, 0, 128]);
    }
}
