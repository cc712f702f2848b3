use image::{Rgba, RgbaImage};
use rayon::prelude::*;

/// Replacement written into every removed pixel.
pub const CLEARED: Rgba<u8> = Rgba([255, 255, 255, 0]);

/// Global color-to-transparent removal:
///
/// 1. Sample the seed pixel. A fully transparent seed (or one outside the
///    image) means there is nothing to remove.
/// 2. Every pixel with alpha > 0 whose R, G and B each differ from the seed by
///    at most `tolerance` becomes [`CLEARED`].
///
/// Returns the new image and the number of pixels cleared, or `None` when the
/// seed is unusable.
pub fn remove_color_at(
    pixels: &RgbaImage,
    seed_x: u32,
    seed_y: u32,
    tolerance: u8,
) -> Option<(RgbaImage, usize)> {
    if seed_x >= pixels.width() || seed_y >= pixels.height() {
        return None;
    }
    let seed = *pixels.get_pixel(seed_x, seed_y);
    if seed[3] == 0 {
        return None;
    }
    Some(remove_color(pixels, [seed[0], seed[1], seed[2]], tolerance))
}

/// Clear every visible pixel within `tolerance` of `target` (per channel).
/// Already-transparent pixels are never touched.
pub fn remove_color(pixels: &RgbaImage, target: [u8; 3], tolerance: u8) -> (RgbaImage, usize) {
    let mut out = pixels.clone();
    let tol = tolerance as i16;
    let cleared: usize = out
        .par_chunks_mut(4)
        .map(|px| {
            if px[3] == 0 {
                return 0;
            }
            let close = (0..3).all(|c| (px[c] as i16 - target[c] as i16).abs() <= tol);
            if close {
                px.copy_from_slice(&CLEARED.0);
                1
            } else {
                0
            }
        })
        .sum();
    (out, cleared)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette_image() -> RgbaImage {
        RgbaImage::from_fn(4, 1, |x, _| match x {
            0 => Rgba([100, 100, 100, 255]),
            1 => Rgba([101, 100, 100, 255]),
            2 => Rgba([100, 100, 100, 0]),
            _ => Rgba([10, 200, 30, 255]),
        })
    }

    #[test]
    fn zero_tolerance_only_hits_exact_matches() {
        let (out, n) = remove_color_at(&palette_image(), 0, 0, 0).unwrap();
        assert_eq!(n, 1);
        assert_eq!(out.get_pixel(0, 0), &CLEARED);
        assert_eq!(out.get_pixel(1, 0), &Rgba([101, 100, 100, 255]));
    }

    #[test]
    fn transparent_pixels_are_never_reprocessed() {
        let img = palette_image();
        let (out, _) = remove_color_at(&img, 0, 0, 5).unwrap();
        // the already-transparent pixel keeps its original RGB
        assert_eq!(out.get_pixel(2, 0), &Rgba([100, 100, 100, 0]));
        assert_eq!(out.get_pixel(1, 0), &CLEARED);
        assert_eq!(out.get_pixel(3, 0), img.get_pixel(3, 0));
    }

    #[test]
    fn transparent_seed_is_a_no_op() {
        assert!(remove_color_at(&palette_image(), 2, 0, 50).is_none());
        assert!(remove_color_at(&palette_image(), 9, 0, 50).is_none());
    }
}
