// ============================================================================
// QR - generate (optional centred logo) and decode
// ============================================================================

use std::path::{Path, PathBuf};

use image::{imageops, Rgba, RgbaImage};
use qrcode::{Color, EcLevel, QrCode};

use crate::error::{Error, ProcessError, Result};
use crate::io::{self, SaveFormat, SaveOptions};
use crate::naming::{CounterStyle, OutputNamer};
use crate::ops::effects;
use crate::ops::transform::{self, Interpolation};

/// Pixels per module.
pub const BOX_SIZE: u32 = 10;
/// Quiet zone, in modules.
pub const BORDER: u32 = 4;
/// Longest logo side as a fraction of the QR width.
pub const LOGO_FRACTION: f32 = 0.22;
/// White margin around the logo, in pixels (split over both sides).
pub const LOGO_PADDING: u32 = 6;

const DARK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const LIGHT: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Encode `text` with high error correction, black on white.
pub fn generate(text: &str) -> Result<Option<RgbaImage>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::H)
        .map_err(|e| Error::parameter(format!("text cannot be encoded as a QR code: {}", e)))?;
    let modules = code.width() as u32;
    let colors = code.to_colors();
    let side = (modules + 2 * BORDER) * BOX_SIZE;
    let img = RgbaImage::from_fn(side, side, |x, y| {
        let (mx, my) = (x / BOX_SIZE, y / BOX_SIZE);
        if mx < BORDER || my < BORDER || mx >= BORDER + modules || my >= BORDER + modules {
            return LIGHT;
        }
        let idx = ((my - BORDER) * modules + (mx - BORDER)) as usize;
        match colors[idx] {
            Color::Dark => DARK,
            Color::Light => LIGHT,
        }
    });
    tracing::debug!(modules, side, "QR generated");
    Ok(Some(img))
}

/// Shrink to fit a `max × max` box, keeping aspect. Never enlarges.
fn thumbnail(image: &RgbaImage, max: u32) -> RgbaImage {
    let (w, h) = image.dimensions();
    let scale = (max as f32 / w.max(1) as f32).min(max as f32 / h.max(1) as f32);
    if scale >= 1.0 {
        return image.clone();
    }
    let tw = ((w as f32 * scale).round() as u32).max(1);
    let th = ((h as f32 * scale).round() as u32).max(1);
    transform::resize(image, tw, th, Interpolation::Lanczos3)
}

/// Centre `logo` on the code over a white patch.
pub fn overlay_logo(qr: &mut RgbaImage, logo: &RgbaImage) {
    let (qw, qh) = qr.dimensions();
    let logo = thumbnail(logo, ((qw as f32 * LOGO_FRACTION) as u32).max(1));
    let (lw, lh) = logo.dimensions();
    let (bw, bh) = (lw + LOGO_PADDING, lh + LOGO_PADDING);
    let patch = RgbaImage::from_pixel(bw, bh, LIGHT);
    imageops::replace(qr, &patch, (qw as i64 - bw as i64) / 2, (qh as i64 - bh as i64) / 2);
    effects::blend_over(qr, &logo, (qw as i64 - lw as i64) / 2, (qh as i64 - lh as i64) / 2, 1.0);
}

pub fn generate_with_logo(text: &str, logo: Option<&Path>) -> Result<Option<RgbaImage>> {
    let Some(mut qr) = generate(text)? else {
        return Ok(None);
    };
    if let Some(path) = logo {
        let logo = image::open(path)
            .map_err(|source| Error::Load { path: path.to_path_buf(), source })?
            .to_rgba8();
        overlay_logo(&mut qr, &logo);
    }
    Ok(Some(qr))
}

/// Save under the chosen name, or `name_1.png`, `name_2.png`, … when taken.
pub fn save(qr: &RgbaImage, chosen: &Path) -> Result<PathBuf> {
    let namer = OutputNamer::new("", CounterStyle::FirstBare).with_extension("png");
    io::save_next_to(qr, chosen, &namer, &SaveOptions::new(SaveFormat::Png, 100))
}

/// Text of the first QR symbol found in `image`.
pub fn decode(image: &RgbaImage) -> Result<String> {
    let luma = image::DynamicImage::ImageRgba8(image.clone()).to_luma8();
    let (w, h) = luma.dimensions();
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(w as usize, h as usize, |x, y| {
        luma.get_pixel(x as u32, y as u32)[0]
    });
    for grid in prepared.detect_grids() {
        match grid.decode() {
            Ok((_, content)) => return Ok(content),
            Err(e) => tracing::debug!("QR grid failed to decode: {:?}", e),
        }
    }
    Err(Error::Process(ProcessError::NotFound("no QR code in image".to_string())))
}

pub fn decode_file(path: &Path) -> Result<String> {
    let img = image::open(path).map_err(|source| Error::Load { path: path.to_path_buf(), source })?;
    decode(&img.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_generates_nothing() {
        assert!(generate("   ").unwrap().is_none());
    }

    #[test]
    fn size_follows_modules_box_and_border() {
        let qr = generate("hello").unwrap().unwrap();
        let modules = QrCode::with_error_correction_level(b"hello", EcLevel::H).unwrap().width() as u32;
        assert_eq!(qr.width(), (modules + 8) * 10);
        assert_eq!(qr.get_pixel(0, 0), &LIGHT);
        // top-left finder pattern starts right after the quiet zone
        assert_eq!(qr.get_pixel(40, 40), &DARK);
    }

    #[test]
    fn generated_code_decodes() {
        let qr = generate("https://example.com/qfast").unwrap().unwrap();
        assert_eq!(decode(&qr).unwrap(), "https://example.com/qfast");
    }

    #[test]
    fn logo_is_centred_on_white_patch() {
        let mut qr = generate("logo test").unwrap().unwrap();
        let logo = RgbaImage::from_pixel(400, 200, Rgba([255, 0, 0, 255]));
        overlay_logo(&mut qr, &logo);
        let c = qr.width() / 2;
        assert_eq!(qr.get_pixel(c, c), &Rgba([255, 0, 0, 255]));
        assert_eq!(decode(&qr).unwrap(), "logo test");
    }

    #[test]
    fn plain_image_has_no_code() {
        let img = RgbaImage::from_pixel(100, 100, LIGHT);
        assert!(matches!(decode(&img), Err(Error::Process(ProcessError::NotFound(_)))));
    }

    #[test]
    fn save_uses_bare_name_first() {
        let dir = tempfile::tempdir().unwrap();
        let qr = generate("x").unwrap().unwrap();
        let chosen = dir.path().join("qrcode.png");
        assert_eq!(save(&qr, &chosen).unwrap(), chosen);
        assert_eq!(save(&qr, &chosen).unwrap(), dir.path().join("qrcode_1.png"));
    }
}
