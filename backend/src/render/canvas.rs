//! RGBA framebuffer with the few primitives the plots need.

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

use crate::error::RenderResult;

pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const AXIS: Rgba<u8> = Rgba([60, 60, 60, 255]);
pub const GRID: Rgba<u8> = Rgba([228, 228, 228, 255]);

const GRID_LINES: usize = 5;

pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width.max(1), height.max(1), BACKGROUND),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Alpha-blend one pixel; out-of-bounds writes are dropped.
    pub fn blend(&mut self, x: i64, y: i64, color: Rgba<u8>) {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return;
        }
        let alpha = color[3] as f64 / 255.0;
        let pixel = self.image.get_pixel_mut(x as u32, y as u32);
        for c in 0..3 {
            pixel[c] = (color[c] as f64 * alpha + pixel[c] as f64 * (1.0 - alpha)).round() as u8;
        }
        pixel[3] = 255;
    }

    pub fn fill_rect(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, color: Rgba<u8>) {
        let (xa, xb) = ordered(x0, x1);
        let (ya, yb) = ordered(y0, y1);
        for y in ya..=yb {
            for x in xa..=xb {
                self.blend(x, y, color);
            }
        }
    }

    /// One-pixel Bresenham line.
    pub fn line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, color: Rgba<u8>) {
        let (mut x, mut y) = (x0.round() as i64, y0.round() as i64);
        let (xe, ye) = (x1.round() as i64, y1.round() as i64);
        let dx = (xe - x).abs();
        let dy = -(ye - y).abs();
        let sx = if x < xe { 1 } else { -1 };
        let sy = if y < ye { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.blend(x, y, color);
            if x == xe && y == ye {
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

    /// Line of the given width, drawn as overlapping discs.
    pub fn stroke(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, width: f64, color: Rgba<u8>) {
        let length = (x1 - x0).hypot(y1 - y0);
        let steps = (length * 2.0).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            self.fill_circle(x0 + (x1 - x0) * t, y0 + (y1 - y0) * t, width / 2.0, color);
        }
    }

    pub fn fill_circle(&mut self, cx: f64, cy: f64, radius: f64, color: Rgba<u8>) {
        let r = radius.max(0.5);
        let (xa, xb) = ordered(cx - r, cx + r);
        let (ya, yb) = ordered(cy - r, cy + r);
        for y in ya..=yb {
            for x in xa..=xb {
                if (x as f64 - cx).hypot(y as f64 - cy) <= r {
                    self.blend(x, y, color);
                }
            }
        }
    }

    /// Pie wedge between two angles in radians, clockwise from 12 o'clock.
    pub fn fill_wedge(&mut self, cx: f64, cy: f64, radius: f64, start: f64, end: f64, color: Rgba<u8>) {
        let tau = std::f64::consts::TAU;
        let (xa, xb) = ordered(cx - radius, cx + radius);
        let (ya, yb) = ordered(cy - radius, cy + radius);
        for y in ya..=yb {
            for x in xa..=xb {
                let dx = x as f64 - cx;
                let dy = y as f64 - cy;
                if dx.hypot(dy) > radius {
                    continue;
                }
                let angle = dx.atan2(-dy).rem_euclid(tau);
                if angle >= start && angle < end {
                    self.blend(x, y, color);
                }
            }
        }
    }

    /// Axes along the left and bottom edges plus horizontal grid lines.
    pub fn frame(&mut self, area: &PlotArea) {
        for i in 0..=GRID_LINES {
            let y = area.py(i as f64 / GRID_LINES as f64);
            self.line(area.left, y, area.right, y, GRID);
        }
        self.line(area.left, area.top, area.left, area.bottom, AXIS);
        self.line(area.left, area.bottom, area.right, area.bottom, AXIS);
    }

    pub fn into_png(self) -> RenderResult<Vec<u8>> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(self.image).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.image.get_pixel(x, y)
    }
}

fn ordered(a: f64, b: f64) -> (i64, i64) {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    (lo.round() as i64, hi.round() as i64)
}

// =============================================================================
// Coordinates
// =============================================================================

/// Pixel rectangle the data is drawn into.
#[derive(Debug, Clone, Copy)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl PlotArea {
    pub fn with_margins(width: u32, height: u32) -> Self {
        let (w, h) = (width as f64, height as f64);
        Self {
            left: (w * 0.08).max(8.0),
            top: (h * 0.06).max(8.0),
            right: w - (w * 0.04).max(8.0),
            bottom: h - (h * 0.08).max(8.0),
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Horizontal pixel for a fraction of the width.
    pub fn px(&self, fraction: f64) -> f64 {
        self.left + fraction * self.width()
    }

    /// Vertical pixel for a fraction of the height, 0 at the bottom.
    pub fn py(&self, fraction: f64) -> f64 {
        self.bottom - fraction * self.height()
    }
}

/// Linear data-to-fraction mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub lo: f64,
    pub hi: f64,
}

impl Scale {
    /// Data range padded by 5% on both sides; a single value gets ±0.5.
    pub fn padded(values: impl IntoIterator<Item = f64>) -> Self {
        let (lo, hi) = values
            .into_iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if !lo.is_finite() || !hi.is_finite() {
            return Self { lo: 0.0, hi: 1.0 };
        }
        if hi <= lo {
            return Self { lo: lo - 0.5, hi: hi + 0.5 };
        }
        let pad = (hi - lo) * 0.05;
        Self {
            lo: lo - pad,
            hi: hi + pad,
        }
    }

    /// Discrete positions `0..n` centred in equal slots.
    pub fn discrete(n: usize) -> Self {
        Self {
            lo: -0.5,
            hi: n.max(1) as f64 - 0.5,
        }
    }

    pub fn fraction(&self, value: f64) -> f64 {
        (value - self.lo) / (self.hi - self.lo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_rect_and_png() {
        let mut canvas = Canvas::new(20, 10);
        canvas.fill_rect(2.0, 2.0, 5.0, 5.0, AXIS);
        assert_eq!(canvas.pixel(3, 3), AXIS);
        assert_eq!(canvas.pixel(10, 8), BACKGROUND);

        let png = canvas.into_png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn test_out_of_bounds_is_ignored() {
        let mut canvas = Canvas::new(4, 4);
        canvas.line(-10.0, -10.0, 10.0, 10.0, AXIS);
        assert_eq!(canvas.pixel(2, 2), AXIS);
    }

    #[test]
    fn test_scale() {
        let scale = Scale::padded([0.0, 10.0]);
        assert!((scale.fraction(5.0) - 0.5).abs() < 1e-12);
        assert_eq!(Scale::padded([3.0]), Scale { lo: 2.5, hi: 3.5 });
        assert_eq!(Scale::discrete(3).fraction(1.0), 0.5);
    }
}
