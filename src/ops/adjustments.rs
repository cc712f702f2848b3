// ============================================================================
// COLOR ADJUSTMENTS - per-pixel tone and color operations
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;

/// Sepia ramp endpoints: luma 0 maps to the dark tone, luma 255 to the light one.
pub const SEPIA_DARK: [f32; 3] = [48.0, 30.0, 1.0];
pub const SEPIA_LIGHT: [f32; 3] = [251.0, 239.0, 219.0];

/// Row-parallel per-pixel transform. The closure receives `(x, y, r, g, b, a)`
/// as f32 in 0..255 and returns the new channels; results are rounded and
/// clamped.
pub(crate) fn apply_per_pixel<F>(src: &RgbaImage, transform: F) -> RgbaImage
where
    F: Fn(u32, u32, f32, f32, f32, f32) -> (f32, f32, f32, f32) + Sync,
{
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 {
        return src.clone();
    }
    let stride = w as usize * 4;
    let src_raw = src.as_raw();
    let mut out = RgbaImage::new(w, h);

    out.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row_out)| {
            let row_in = &src_raw[y * stride..(y + 1) * stride];
            for x in 0..w as usize {
                let pi = x * 4;
                let (nr, ng, nb, na) = transform(
                    x as u32,
                    y as u32,
                    row_in[pi] as f32,
                    row_in[pi + 1] as f32,
                    row_in[pi + 2] as f32,
                    row_in[pi + 3] as f32,
                );
                row_out[pi] = nr.round().clamp(0.0, 255.0) as u8;
                row_out[pi + 1] = ng.round().clamp(0.0, 255.0) as u8;
                row_out[pi + 2] = nb.round().clamp(0.0, 255.0) as u8;
                row_out[pi + 3] = na.round().clamp(0.0, 255.0) as u8;
            }
        });
    out
}

/// ITU-R 601-2 luma, the same weights grayscale conversion uses everywhere
/// in this crate.
#[inline]
pub fn luma(r: f32, g: f32, b: f32) -> f32 {
    r * 0.299 + g * 0.587 + b * 0.114
}

// ---------------------------------------------------------------------------
//  Tone
// ---------------------------------------------------------------------------

/// Scale toward black. `factor` 1.0 is neutral.
pub fn brightness(src: &RgbaImage, factor: f32) -> RgbaImage {
    apply_per_pixel(src, |_, _, r, g, b, a| (r * factor, g * factor, b * factor, a))
}

/// Mean luma of the image, rounded to an integer gray level.
pub fn mean_luma(src: &RgbaImage) -> f32 {
    let n = (src.width() as u64 * src.height() as u64).max(1);
    let total: f64 = src
        .par_chunks(4)
        .map(|p| luma(p[0] as f32, p[1] as f32, p[2] as f32) as f64)
        .sum();
    (total / n as f64).round() as f32
}

/// Blend with a flat gray of the image's mean luma. `factor` 1.0 is neutral.
pub fn contrast(src: &RgbaImage, factor: f32) -> RgbaImage {
    let mean = mean_luma(src);
    apply_per_pixel(src, |_, _, r, g, b, a| {
        (
            mean + factor * (r - mean),
            mean + factor * (g - mean),
            mean + factor * (b - mean),
            a,
        )
    })
}

/// Blend with the grayscale image. 0.0 is fully gray, 1.0 neutral.
pub fn saturation(src: &RgbaImage, factor: f32) -> RgbaImage {
    apply_per_pixel(src, |_, _, r, g, b, a| {
        let l = luma(r, g, b).round();
        (
            l + factor * (r - l),
            l + factor * (g - l),
            l + factor * (b - l),
            a,
        )
    })
}

pub fn grayscale(src: &RgbaImage) -> RgbaImage {
    apply_per_pixel(src, |_, _, r, g, b, a| {
        let l = luma(r, g, b);
        (l, l, l, a)
    })
}

/// Colorize luma along the sepia ramp and blend by `amount` (0..1).
pub fn sepia(src: &RgbaImage, amount: f32) -> RgbaImage {
    let amount = amount.clamp(0.0, 1.0);
    apply_per_pixel(src, |_, _, r, g, b, a| {
        let t = luma(r, g, b).round() / 255.0;
        let tone = |c: usize| SEPIA_DARK[c] + (SEPIA_LIGHT[c] - SEPIA_DARK[c]) * t;
        (
            r + (tone(0) - r) * amount,
            g + (tone(1) - g) * amount,
            b + (tone(2) - b) * amount,
            a,
        )
    })
}

/// `255 - v` on the color channels; alpha is kept.
pub fn invert(src: &RgbaImage) -> RgbaImage {
    apply_per_pixel(src, |_, _, r, g, b, a| (255.0 - r, 255.0 - g, 255.0 - b, a))
}

// ---------------------------------------------------------------------------
//  Hue
// ---------------------------------------------------------------------------

/// Rotate the HSV hue by `steps / 256` of a full turn.
pub fn hue_shift(src: &RgbaImage, steps: u8) -> RgbaImage {
    if steps == 0 {
        return src.clone();
    }
    let delta = steps as f32 / 256.0;
    apply_per_pixel(src, |_, _, r, g, b, a| {
        let (h, s, v) = rgb_to_hsv(r / 255.0, g / 255.0, b / 255.0);
        let (nr, ng, nb) = hsv_to_rgb((h + delta).fract(), s, v);
        (nr * 255.0, ng * 255.0, nb * 255.0, a)
    })
}

/// RGB (0..1) → HSV (H: 0..1, S: 0..1, V: 0..1)
pub fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let d = max - min;
    let v = max;
    if max <= 0.0 || d < 1e-6 {
        return (0.0, 0.0, v);
    }
    let s = d / max;
    let h = if (max - r).abs() < 1e-6 {
        let mut h = (g - b) / d;
        if h < 0.0 {
            h += 6.0;
        }
        h / 6.0
    } else if (max - g).abs() < 1e-6 {
        ((b - r) / d + 2.0) / 6.0
    } else {
        ((r - g) / d + 4.0) / 6.0
    };
    (h, s, v)
}

/// HSV (H: 0..1, S: 0..1, V: 0..1) → RGB (0..1)
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    if s <= 0.0 {
        return (v, v, v);
    }
    let h6 = (h.rem_euclid(1.0)) * 6.0;
    let sector = h6.floor();
    let f = h6 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match sector as u32 % 6 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample() -> RgbaImage {
        RgbaImage::from_fn(7, 5, |x, y| {
            Rgba([(x * 36) as u8, (y * 60) as u8, ((x + y) * 20) as u8, (200 + x) as u8])
        })
    }

    #[test]
    fn invert_twice_is_identity() {
        let img = sample();
        assert_eq!(invert(&invert(&img)), img);
    }

    #[test]
    fn invert_keeps_alpha() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 77]));
        assert_eq!(invert(&img).get_pixel(0, 0), &Rgba([245, 235, 225, 77]));
    }

    #[test]
    fn neutral_factors_are_identity() {
        let img = sample();
        assert_eq!(brightness(&img, 1.0), img);
        assert_eq!(contrast(&img, 1.0), img);
        assert_eq!(hue_shift(&img, 0), img);
        assert_eq!(sepia(&img, 0.0), img);
    }

    #[test]
    fn zero_saturation_is_gray() {
        let out = saturation(&sample(), 0.0);
        for p in out.pixels() {
            assert_eq!(p[0], p[1]);
            assert_eq!(p[1], p[2]);
        }
    }

    #[test]
    fn zero_contrast_is_flat_mean() {
        let out = contrast(&sample(), 0.0);
        let first = *out.get_pixel(0, 0);
        assert!(out.pixels().all(|p| p[0] == first[0] && p[1] == first[0]));
    }

    #[test]
    fn full_sepia_maps_black_and_white_to_ramp_ends() {
        let img = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 { Rgba([0, 0, 0, 255]) } else { Rgba([255, 255, 255, 255]) }
        });
        let out = sepia(&img, 1.0);
        assert_eq!(out.get_pixel(0, 0), &Rgba([48, 30, 1, 255]));
        assert_eq!(out.get_pixel(1, 0), &Rgba([251, 239, 219, 255]));
    }

    #[test]
    fn hsv_round_trip() {
        for &(r, g, b) in &[(1.0, 0.0, 0.0), (0.2, 0.5, 0.9), (0.3, 0.3, 0.3), (0.0, 0.8, 0.4)] {
            let (h, s, v) = rgb_to_hsv(r, g, b);
            let (nr, ng, nb) = hsv_to_rgb(h, s, v);
            assert!((nr - r).abs() < 1e-4 && (ng - g).abs() < 1e-4 && (nb - b).abs() < 1e-4);
        }
    }

    #[test]
    fn half_turn_hue_shift_turns_red_cyan() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 255]));
        assert_eq!(hue_shift(&img, 128).get_pixel(0, 0), &Rgba([0, 255, 255, 255]));
    }
}
