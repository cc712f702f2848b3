// ============================================================================
// FILTERS - Gaussian blur (extended box approximation), smoothing, sharpen
// ============================================================================

use image::{GrayImage, RgbaImage};
use rayon::prelude::*;

/// Box passes used to approximate a Gaussian.
const BLUR_PASSES: usize = 3;

/// Fractional box radius that makes `BLUR_PASSES` box blurs match a Gaussian
/// of standard deviation `sigma` (Gwosdek et al., extended box filter).
fn box_radius_for_sigma(sigma: f32) -> f32 {
    let sigma2 = sigma * sigma / BLUR_PASSES as f32;
    let big_l = (12.0 * sigma2 + 1.0).sqrt();
    let l = ((big_l - 1.0) / 2.0).floor();
    let a = (2.0 * l + 1.0) * (l * (l + 1.0) - 3.0 * sigma2)
        / (6.0 * (sigma2 - (l + 1.0) * (l + 1.0)));
    (l + a).max(0.0)
}

/// Gaussian blur of an RGBA image. `radius` is the standard deviation in
/// pixels; runtime does not depend on it.
pub fn gaussian_blur(src: &RgbaImage, radius: f32) -> RgbaImage {
    let (w, h) = src.dimensions();
    if radius <= 0.0 || w == 0 || h == 0 {
        return src.clone();
    }
    let mut buf: Vec<f32> = src.as_raw().iter().map(|&b| b as f32).collect();
    blur_planes(&mut buf, w as usize, h as usize, 4, radius);

    let mut out = RgbaImage::new(w, h);
    let dst: &mut [u8] = &mut out;
    dst.par_iter_mut()
        .zip(buf.par_iter())
        .for_each(|(d, &v)| *d = v.round().clamp(0.0, 255.0) as u8);
    out
}

/// Gaussian blur of a single-channel mask.
pub fn gaussian_blur_gray(src: &GrayImage, radius: f32) -> GrayImage {
    let (w, h) = src.dimensions();
    if radius <= 0.0 || w == 0 || h == 0 {
        return src.clone();
    }
    let mut buf: Vec<f32> = src.as_raw().iter().map(|&b| b as f32).collect();
    blur_planes(&mut buf, w as usize, h as usize, 1, radius);

    let mut out = GrayImage::new(w, h);
    let dst: &mut [u8] = &mut out;
    dst.par_iter_mut()
        .zip(buf.par_iter())
        .for_each(|(d, &v)| *d = v.round().clamp(0.0, 255.0) as u8);
    out
}

/// Blur interleaved `channels`-wide f32 rows in place: horizontal passes,
/// transpose, horizontal passes again, transpose back.
fn blur_planes(buf: &mut Vec<f32>, w: usize, h: usize, channels: usize, sigma: f32) {
    let r = box_radius_for_sigma(sigma);
    if r <= 0.0 {
        return;
    }
    for _ in 0..BLUR_PASSES {
        box_pass_rows(buf, w, channels, r);
    }
    let mut t = transpose(buf, w, h, channels);
    for _ in 0..BLUR_PASSES {
        box_pass_rows(&mut t, h, channels, r);
    }
    *buf = transpose(&t, h, w, channels);
}

fn transpose(src: &[f32], w: usize, h: usize, channels: usize) -> Vec<f32> {
    let mut dst = vec![0.0f32; src.len()];
    dst.par_chunks_mut(h * channels)
        .enumerate()
        .for_each(|(x, col_out)| {
            for y in 0..h {
                let si = (y * w + x) * channels;
                let di = y * channels;
                col_out[di..di + channels].copy_from_slice(&src[si..si + channels]);
            }
        });
    dst
}

/// One fractional box blur along each row (edge pixels are clamped).
fn box_pass_rows(buf: &mut [f32], w: usize, channels: usize, radius: f32) {
    let l = radius.floor() as isize;
    let a = radius - l as f32;
    let norm = 1.0 / (2.0 * radius + 1.0);
    let last = w as isize - 1;

    buf.par_chunks_mut(w * channels).for_each(|row| {
        let src = row.to_vec();
        let at = |x: isize, c: usize| src[x.clamp(0, last) as usize * channels + c];
        for c in 0..channels {
            let mut sum = 0.0f32;
            for k in -l..=l {
                sum += at(k, c);
            }
            for x in 0..w as isize {
                let edge = at(x - l - 1, c) + at(x + l + 1, c);
                row[x as usize * channels + c] = (sum + a * edge) * norm;
                sum += at(x + l + 1, c) - at(x - l, c);
            }
        }
    });
}

/// 3×3 smoothing kernel `[1 1 1; 1 5 1; 1 1 1] / 13`. Border pixels are
/// copied unchanged. Alpha is preserved.
pub fn smooth_3x3(src: &RgbaImage) -> RgbaImage {
    let (w, h) = src.dimensions();
    let mut out = src.clone();
    if w < 3 || h < 3 {
        return out;
    }
    let (wu, hu) = (w as usize, h as usize);
    let stride = wu * 4;
    let src_raw = src.as_raw();

    out.par_chunks_mut(stride)
        .enumerate()
        .filter(|(y, _)| *y > 0 && *y + 1 < hu)
        .for_each(|(y, row_out)| {
            for x in 1..wu - 1 {
                for c in 0..3 {
                    let mut acc = 0u32;
                    for dy in 0..3 {
                        for dx in 0..3 {
                            let v = src_raw[(y + dy - 1) * stride + (x + dx - 1) * 4 + c] as u32;
                            acc += if dx == 1 && dy == 1 { v * 5 } else { v };
                        }
                    }
                    row_out[x * 4 + c] = ((acc as f32) / 13.0).round().min(255.0) as u8;
                }
            }
        });
    out
}

/// Sharpness enhancement: blend away from a smoothed copy.
/// `factor` 1.0 returns the input, 0.0 the smoothed image, >1 sharpens.
pub fn sharpen(src: &RgbaImage, factor: f32) -> RgbaImage {
    if (factor - 1.0).abs() < f32::EPSILON {
        return src.clone();
    }
    let smoothed = smooth_3x3(src);
    let mut out = src.clone();
    out.par_chunks_mut(4)
        .zip(smoothed.par_chunks(4))
        .for_each(|(px, sm)| {
            for c in 0..3 {
                let s = sm[c] as f32;
                let v = s + factor * (px[c] as f32 - s);
                px[c] = v.round().clamp(0.0, 255.0) as u8;
            }
        });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba};

    #[test]
    fn blur_of_flat_image_is_unchanged() {
        let img = RgbaImage::from_pixel(40, 30, Rgba([120, 60, 200, 255]));
        assert_eq!(gaussian_blur(&img, 5.0), img);
    }

    #[test]
    fn blur_spreads_a_single_bright_pixel() {
        let mut img = GrayImage::new(21, 21);
        img.put_pixel(10, 10, Luma([255]));
        let out = gaussian_blur_gray(&img, 2.0);
        assert!(out.get_pixel(10, 10)[0] < 255);
        assert!(out.get_pixel(11, 10)[0] > 0);
        let (l, r) = (out.get_pixel(9, 10)[0] as i32, out.get_pixel(11, 10)[0] as i32);
        assert!((l - r).abs() <= 1);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn blur_preserves_mean_brightness() {
        let img = RgbaImage::from_fn(32, 32, |x, _| {
            if x < 16 { Rgba([0, 0, 0, 255]) } else { Rgba([200, 200, 200, 255]) }
        });
        let out = gaussian_blur(&img, 3.0);
        let mean_in: f32 = img.pixels().map(|p| p[0] as f32).sum::<f32>() / 1024.0;
        let mean_out: f32 = out.pixels().map(|p| p[0] as f32).sum::<f32>() / 1024.0;
        assert!((mean_in - mean_out).abs() < 2.0);
    }

    #[test]
    fn zero_radius_is_identity() {
        let img = RgbaImage::from_fn(5, 5, |x, y| Rgba([x as u8 * 40, y as u8 * 40, 0, 255]));
        assert_eq!(gaussian_blur(&img, 0.0), img);
    }

    #[test]
    fn neutral_sharpen_is_identity() {
        let img = RgbaImage::from_fn(6, 6, |x, y| Rgba([(x * y * 7) as u8, 3, 9, 255]));
        assert_eq!(sharpen(&img, 1.0), img);
    }

    #[test]
    fn sharpen_increases_edge_contrast() {
        let img = RgbaImage::from_fn(8, 8, |x, _| {
            if x < 4 { Rgba([50, 50, 50, 255]) } else { Rgba([150, 150, 150, 255]) }
        });
        let out = sharpen(&img, 3.0);
        assert!(out.get_pixel(3, 4)[0] < 50);
        assert!(out.get_pixel(4, 4)[0] > 150);
        // borders untouched by the smoothing kernel
        assert_eq!(out.get_pixel(0, 0), img.get_pixel(0, 0));
    }
}
