// ============================================================================
// TRANSFORM OPERATIONS - flip, rotate, resize, crop
// ============================================================================

use image::{imageops, RgbaImage};

use crate::error::{Error, Result};

/// Interpolation method for resize operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Interpolation {
    Nearest,
    Bilinear,
    Bicubic,
    #[default]
    Lanczos3,
}

impl Interpolation {
    pub fn label(&self) -> &'static str {
        match self {
            Interpolation::Nearest => "Nearest neighbour",
            Interpolation::Bilinear => "Bilinear",
            Interpolation::Bicubic => "Bicubic",
            Interpolation::Lanczos3 => "Lanczos (smooth)",
        }
    }

    pub fn to_filter(&self) -> imageops::FilterType {
        match self {
            Interpolation::Nearest => imageops::FilterType::Nearest,
            Interpolation::Bilinear => imageops::FilterType::Triangle,
            Interpolation::Bicubic => imageops::FilterType::CatmullRom,
            Interpolation::Lanczos3 => imageops::FilterType::Lanczos3,
        }
    }
}

/// The four fixed transpositions offered by the flip/rotate tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transpose {
    FlipHorizontal,
    FlipVertical,
    /// 90° clockwise
    RotateCw,
    /// 90° counter-clockwise
    RotateCcw,
}

impl Transpose {
    pub fn apply(self, src: &RgbaImage) -> RgbaImage {
        match self {
            Transpose::FlipHorizontal => imageops::flip_horizontal(src),
            Transpose::FlipVertical => imageops::flip_vertical(src),
            Transpose::RotateCw => imageops::rotate90(src),
            Transpose::RotateCcw => imageops::rotate270(src),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Transpose::FlipHorizontal => "flip horizontal",
            Transpose::FlipVertical => "flip vertical",
            Transpose::RotateCw => "rotate 90° CW",
            Transpose::RotateCcw => "rotate 90° CCW",
        }
    }
}

/// Resample to exactly `new_w × new_h` (each at least 1px).
pub fn resize(src: &RgbaImage, new_w: u32, new_h: u32, interp: Interpolation) -> RgbaImage {
    let (new_w, new_h) = (new_w.max(1), new_h.max(1));
    if (new_w, new_h) == src.dimensions() {
        return src.clone();
    }
    imageops::resize(src, new_w, new_h, interp.to_filter())
}

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Build from two arbitrary corners (in any order), clamped to `bounds`.
    pub fn from_corners(a: (f32, f32), b: (f32, f32), bounds: (u32, u32)) -> Self {
        let clamp_x = |v: f32| v.round().clamp(0.0, bounds.0 as f32) as u32;
        let clamp_y = |v: f32| v.round().clamp(0.0, bounds.1 as f32) as u32;
        let (x0, x1) = (clamp_x(a.0.min(b.0)), clamp_x(a.0.max(b.0)));
        let (y0, y1) = (clamp_y(a.1.min(b.1)), clamp_y(a.1.max(b.1)));
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Intersection with a `w × h` image.
    pub fn clamp_to(&self, w: u32, h: u32) -> Self {
        let x0 = self.x.min(w);
        let y0 = self.y.min(h);
        let x1 = self.right().min(w);
        let y1 = self.bottom().min(h);
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }
}

/// Crop to `rect`, clamped to the image. A zero-area result is an error.
pub fn crop(src: &RgbaImage, rect: Rect) -> Result<RgbaImage> {
    let r = rect.clamp_to(src.width(), src.height());
    if r.is_empty() {
        return Err(Error::geometry(format!(
            "crop of {}x{} at ({}, {}) is empty inside a {}x{} image",
            rect.width,
            rect.height,
            rect.x,
            rect.y,
            src.width(),
            src.height()
        )));
    }
    Ok(imageops::crop_imm(src, r.x, r.y, r.width, r.height).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([x as u8, y as u8, (x ^ y) as u8, 255]))
    }

    #[test]
    fn flips_are_involutions() {
        let img = gradient(13, 7);
        for t in [Transpose::FlipHorizontal, Transpose::FlipVertical] {
            assert_eq!(t.apply(&t.apply(&img)), img);
        }
    }

    #[test]
    fn four_rotations_are_identity() {
        let img = gradient(13, 7);
        for t in [Transpose::RotateCw, Transpose::RotateCcw] {
            let mut out = img.clone();
            for _ in 0..4 {
                out = t.apply(&out);
            }
            assert_eq!(out, img);
        }
    }

    #[test]
    fn rotate_cw_moves_top_left_to_top_right() {
        let img = gradient(4, 2);
        let out = Transpose::RotateCw.apply(&img);
        assert_eq!(out.dimensions(), (2, 4));
        assert_eq!(out.get_pixel(1, 0), img.get_pixel(0, 0));
    }

    #[test]
    fn corners_are_sorted_and_clamped() {
        let r = Rect::from_corners((50.0, 40.0), (-5.0, 10.0), (30, 30));
        assert_eq!(r, Rect::new(0, 10, 30, 20));
    }

    #[test]
    fn empty_crop_is_an_error() {
        let img = gradient(10, 10);
        assert!(crop(&img, Rect::new(12, 0, 5, 5)).is_err());
        assert!(crop(&img, Rect::new(2, 2, 0, 5)).is_err());
        assert_eq!(crop(&img, Rect::new(8, 8, 5, 5)).unwrap().dimensions(), (2, 2));
    }

    #[test]
    fn resize_to_same_size_is_untouched() {
        let img = gradient(9, 9);
        assert_eq!(resize(&img, 9, 9, Interpolation::Lanczos3), img);
        assert_eq!(resize(&img, 0, 3, Interpolation::Nearest).dimensions(), (1, 3));
    }
}
