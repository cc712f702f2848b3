// ============================================================================
// EFFECTS - pixelate, vignette, masks and compositing helpers
// ============================================================================

use image::{imageops, GrayImage, Luma, RgbaImage};
use rayon::prelude::*;

use crate::ops::filters::gaussian_blur_gray;

// --- Masks ---

/// Filled ellipse inscribed in the box `(x0, y0)–(x1, y1)` on a `w × h`
/// mask. The box may extend past the mask edges.
pub fn ellipse_mask(w: u32, h: u32, x0: f32, y0: f32, x1: f32, y1: f32) -> GrayImage {
    let cx = (x0 + x1) / 2.0;
    let cy = (y0 + y1) / 2.0;
    let rx = ((x1 - x0) / 2.0).max(0.5);
    let ry = ((y1 - y0) / 2.0).max(0.5);
    GrayImage::from_fn(w, h, |x, y| {
        let dx = (x as f32 + 0.5 - cx) / rx;
        let dy = (y as f32 + 0.5 - cy) / ry;
        if dx * dx + dy * dy <= 1.0 { Luma([255]) } else { Luma([0]) }
    })
}

// --- Compositing ---

/// Paste `patch` at `(left, top)`. With a mask, each pixel is blended by the
/// mask value (255 = patch, 0 = keep `dst`).
pub fn paste_masked(dst: &mut RgbaImage, patch: &RgbaImage, left: u32, top: u32, mask: Option<&GrayImage>) {
    let (dw, dh) = dst.dimensions();
    for (x, y, p) in patch.enumerate_pixels() {
        let (tx, ty) = (left + x, top + y);
        if tx >= dw || ty >= dh {
            continue;
        }
        let m = mask.map_or(255, |m| m.get_pixel(x, y)[0]) as u32;
        if m == 0 {
            continue;
        }
        let d = dst.get_pixel_mut(tx, ty);
        for c in 0..4 {
            d[c] = ((p[c] as u32 * m + d[c] as u32 * (255 - m) + 127) / 255) as u8;
        }
    }
}

/// Source-over alpha compositing of `src` onto `dst` at a possibly negative
/// offset, with an extra global `opacity` (0..1) applied to `src`.
pub fn blend_over(dst: &mut RgbaImage, src: &RgbaImage, left: i64, top: i64, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return;
    }
    let (dw, dh) = (dst.width() as i64, dst.height() as i64);
    for (x, y, s) in src.enumerate_pixels() {
        let (tx, ty) = (left + x as i64, top + y as i64);
        if tx < 0 || ty < 0 || tx >= dw || ty >= dh {
            continue;
        }
        let sa = s[3] as f32 / 255.0 * opacity;
        if sa <= 0.0 {
            continue;
        }
        let d = dst.get_pixel_mut(tx as u32, ty as u32);
        let da = d[3] as f32 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        for c in 0..3 {
            let v = (s[c] as f32 * sa + d[c] as f32 * da * (1.0 - sa)) / out_a;
            d[c] = v.round().clamp(0.0, 255.0) as u8;
        }
        d[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    }
}

// --- Pixelate ---

/// Mosaic by shrinking (bilinear) to `1/block` and growing back (nearest).
pub fn pixelate(src: &RgbaImage, block: u32) -> RgbaImage {
    let block = block.max(1);
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 {
        return src.clone();
    }
    let small = imageops::resize(
        src,
        (w / block).max(1),
        (h / block).max(1),
        imageops::FilterType::Triangle,
    );
    imageops::resize(&small, w, h, imageops::FilterType::Nearest)
}

// --- Vignette ---

/// Darken toward the edges. `amount` 0..100; 0 is neutral.
///
/// An ellipse covering `1.3 - amount/100` of the frame is drawn, blurred by
/// 45% of the short side, and used to composite the image over black.
pub fn vignette(src: &RgbaImage, amount: f32) -> RgbaImage {
    let (w, h) = src.dimensions();
    if amount <= 0.0 || w == 0 || h == 0 {
        return src.clone();
    }
    let coverage = 1.3 - amount / 100.0;
    let left = w as f32 * (1.0 - coverage) / 2.0;
    let top = h as f32 * (1.0 - coverage) / 2.0;
    let mask = ellipse_mask(w, h, left, top, w as f32 - left, h as f32 - top);
    let radius = (w.min(h) as f32 * 0.45).floor();
    let mask = gaussian_blur_gray(&mask, radius);

    let stride = w as usize * 4;
    let mask_raw = mask.as_raw();
    let mut out = src.clone();
    out.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..w as usize {
                let m = mask_raw[y * w as usize + x] as u32;
                let pi = x * 4;
                for c in 0..3 {
                    row[pi + c] = ((row[pi + c] as u32 * m + 127) / 255) as u8;
                }
            }
        });
    out
}
