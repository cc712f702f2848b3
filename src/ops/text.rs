use std::path::Path;

use ab_glyph::{point, Font, FontArc, GlyphId, ScaleFont};
use image::RgbaImage;

use crate::error::{Error, ProcessError, Result};

/// Horizontal shear applied for synthetic italics.
const ITALIC_SHEAR: f32 = 0.2;

/// A font plus the styling the face itself could not provide.
#[derive(Clone)]
pub struct LoadedFont {
    pub font: FontArc,
    pub synthetic_bold: bool,
    pub synthetic_italic: bool,
}

impl std::fmt::Debug for LoadedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedFont")
            .field("synthetic_bold", &self.synthetic_bold)
            .field("synthetic_italic", &self.synthetic_italic)
            .finish_non_exhaustive()
    }
}

impl LoadedFont {
    /// Load a TTF/OTF file directly; bold/italic are always synthesized.
    pub fn from_file(path: &Path, bold: bool, italic: bool) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let font = FontArc::try_from_vec(bytes).map_err(|e| {
            Error::parameter(format!("{} is not a usable font: {}", path.display(), e))
        })?;
        Ok(Self { font, synthetic_bold: bold, synthetic_italic: italic })
    }

    /// Look up a system family with the requested style, falling back to the
    /// generic sans-serif family. Fails only when neither resolves.
    pub fn system(family: &str, bold: bool, italic: bool) -> Result<Self> {
        use font_kit::family_name::FamilyName;

        let requested = if family.eq_ignore_ascii_case("sans-serif") || family.is_empty() {
            FamilyName::SansSerif
        } else {
            FamilyName::Title(family.to_string())
        };
        load_system_font(&[requested, FamilyName::SansSerif], bold, italic).ok_or_else(|| {
            tracing::warn!(family, "no system font matched, not even a generic sans-serif");
            Error::Process(ProcessError::NotFound(format!("font family '{}'", family)))
        })
    }
}

fn load_system_font(
    families: &[font_kit::family_name::FamilyName],
    bold: bool,
    italic: bool,
) -> Option<LoadedFont> {
    use font_kit::properties::{Properties, Style, Weight};
    use font_kit::source::SystemSource;

    let mut props = Properties::new();
    if bold {
        props.weight = Weight::BOLD;
    }
    if italic {
        props.style = Style::Italic;
    }

    let handle = SystemSource::new().select_best_match(families, &props).ok()?;
    let face = handle.load().ok()?;
    let got = face.properties();
    let bytes: Vec<u8> = (*face.copy_font_data()?).clone();
    let font = FontArc::try_from_vec(bytes).ok()?;
    Some(LoadedFont {
        font,
        synthetic_bold: bold && got.weight.0 < Weight::SEMIBOLD.0,
        synthetic_italic: italic && got.style == Style::Normal,
    })
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    /// Pixel size (em height).
    pub size: f32,
    pub color: [u8; 4],
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: 40.0,
            color: [255, 255, 255, 255],
            bold: false,
            italic: false,
            underline: false,
        }
    }
}

/// Rendered text. `off_x/off_y` locate the bitmap's top-left corner relative
/// to the text origin (top-left of the first line box).
#[derive(Debug, Clone)]
pub struct TextBitmap {
    pub image: RgbaImage,
    pub off_x: i32,
    pub off_y: i32,
}

/// Lay out a single line, left-aligned at x=0 with glyph y on the baseline.
/// Returns `(glyphs, total_width)`.
fn layout_line(font: &FontArc, text: &str, size: f32, baseline: f32) -> (Vec<(GlyphId, f32, f32)>, f32) {
    let scaled = font.as_scaled(size);
    let mut glyphs = Vec::with_capacity(text.len());
    let mut cursor_x = 0.0f32;
    let mut last: Option<GlyphId> = None;
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = last {
            cursor_x += scaled.kern(prev, id);
        }
        glyphs.push((id, cursor_x, baseline));
        cursor_x += scaled.h_advance(id);
        last = Some(id);
    }
    (glyphs, cursor_x)
}

/// Width and height of the laid-out text box (all lines).
pub fn measure_text(font: &LoadedFont, text: &str, size: f32) -> (f32, f32) {
    let scaled = font.font.as_scaled(size);
    let line_height = scaled.height();
    let mut width = 0.0f32;
    let mut lines = 0;
    for line in text.split('\n') {
        let (_, w) = layout_line(&font.font, line, size, 0.0);
        width = width.max(w);
        lines += 1;
    }
    if font.synthetic_bold {
        width += 1.0;
    }
    (width, lines as f32 * line_height)
}

/// Rasterize `text` into a tight RGBA bitmap. Returns `None` when nothing
/// visible would be drawn.
pub fn rasterize_text(font: &LoadedFont, text: &str, style: &TextStyle) -> Option<TextBitmap> {
    let size = style.size.max(1.0);
    let scaled = font.font.as_scaled(size);
    let ascent = scaled.ascent();
    let line_height = scaled.height();
    let bold = style.bold && font.synthetic_bold;
    let italic = style.italic && font.synthetic_italic;

    let mut glyphs = Vec::new();
    let mut line_widths = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        let (g, w) = layout_line(&font.font, line, size, ascent + i as f32 * line_height);
        glyphs.extend(g);
        line_widths.push(w);
    }

    let mut outlined = Vec::with_capacity(glyphs.len());
    let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
    let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
    for &(id, gx, gy) in &glyphs {
        let glyph = id.with_scale_and_position(size, point(gx, gy));
        if let Some(og) = font.font.outline_glyph(glyph) {
            let b = og.px_bounds();
            min_x = min_x.min(b.min.x);
            min_y = min_y.min(b.min.y);
            max_x = max_x.max(b.max.x);
            max_y = max_y.max(b.max.y);
            outlined.push((og, gy));
        }
    }

    let thickness = (size * 0.06).max(1.0);
    if style.underline {
        for (i, &w) in line_widths.iter().enumerate() {
            if w < 0.1 {
                continue;
            }
            min_x = min_x.min(0.0);
            max_x = max_x.max(w);
            let y = i as f32 * line_height + ascent + size * 0.1;
            min_y = min_y.min(y - thickness);
            max_y = max_y.max(y + thickness);
        }
    }
    if min_x >= max_x || min_y >= max_y {
        return None;
    }

    // Room for the italic shear and bold smear.
    let pad = 2.0 + if italic { size * ITALIC_SHEAR } else { 0.0 };
    let x0 = (min_x - pad).floor() as i32;
    let y0 = (min_y - 2.0).floor() as i32;
    let x1 = (max_x + pad).ceil() as i32 + 1;
    let y1 = (max_y + 2.0).ceil() as i32;
    let (bw, bh) = ((x1 - x0) as u32, (y1 - y0) as u32);
    let mut coverage = vec![0.0f32; bw as usize * bh as usize];

    for (og, baseline) in &outlined {
        let b = og.px_bounds();
        og.draw(|px, py, cov| {
            let cy = b.min.y + py as f32;
            let mut cx = b.min.x + px as f32;
            if italic {
                cx += (baseline - cy) * ITALIC_SHEAR;
            }
            let ix = cx.round() as i32 - x0;
            let iy = cy.round() as i32 - y0;
            if ix < 0 || iy < 0 || ix as u32 >= bw || iy as u32 >= bh {
                return;
            }
            let idx = iy as usize * bw as usize + ix as usize;
            coverage[idx] = coverage[idx].max(cov);
            if bold && (ix as u32) + 1 < bw {
                coverage[idx + 1] = coverage[idx + 1].max(cov);
            }
        });
    }

    if style.underline {
        for (i, &w) in line_widths.iter().enumerate() {
            if w < 0.1 {
                continue;
            }
            let line_y = i as f32 * line_height + ascent + size * 0.1;
            let ly0 = ((line_y - thickness / 2.0).floor() as i32 - y0).max(0);
            let ly1 = ((line_y + thickness / 2.0).ceil() as i32 - y0).min(bh as i32);
            let lx0 = (-x0).max(0);
            let lx1 = (w.ceil() as i32 - x0).min(bw as i32);
            for ly in ly0..ly1 {
                for lx in lx0..lx1 {
                    coverage[ly as usize * bw as usize + lx as usize] = 1.0;
                }
            }
        }
    }

    let [r, g, b, a] = style.color;
    let image = RgbaImage::from_fn(bw, bh, |x, y| {
        let cov = coverage[y as usize * bw as usize + x as usize];
        if cov > 0.001 {
            image::Rgba([r, g, b, (a as f32 * cov).round().min(255.0) as u8])
        } else {
            image::Rgba([0, 0, 0, 0])
        }
    });

    Some(TextBitmap { image, off_x: x0, off_y: y0 })
}

/// Draw `text` with its origin at `(x, y)` onto `dst`, scaled by `opacity`.
pub fn draw_text(
    dst: &mut RgbaImage,
    font: &LoadedFont,
    text: &str,
    style: &TextStyle,
    x: f32,
    y: f32,
    opacity: f32,
) -> bool {
    let Some(bitmap) = rasterize_text(font, text, style) else {
        return false;
    };
    let left = x.round() as i64 + bitmap.off_x as i64;
    let top = y.round() as i64 + bitmap.off_y as i64;
    crate::ops::effects::blend_over(dst, &bitmap.image, left, top, opacity);
    true
}

/// A font for tests: `QFAST_TEST_FONT`, then well-known font files, then the
/// system sans-serif. Panics when none is available.
#[cfg(test)]
pub(crate) fn test_font() -> LoadedFont {
    const KNOWN: &[&str] = &[
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/Library/Fonts/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];
    let env = std::env::var_os("QFAST_TEST_FONT").map(std::path::PathBuf::from);
    env.into_iter()
        .chain(KNOWN.iter().map(std::path::PathBuf::from))
        .filter(|p| p.is_file())
        .find_map(|p| LoadedFont::from_file(&p, false, false).ok())
        .or_else(|| LoadedFont::system("sans-serif", false, false).ok())
        .expect("no font for text tests: install DejaVu Sans or set QFAST_TEST_FONT")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_rasterizes_to_nothing() {
        let font = test_font();
        assert!(rasterize_text(&font, "", &TextStyle::default()).is_none());
        assert!(rasterize_text(&font, "   ", &TextStyle::default()).is_none());
    }

    #[test]
    fn bigger_text_measures_wider() {
        let font = test_font();
        let (w_small, h_small) = measure_text(&font, "Hello", 20.0);
        let (w_big, h_big) = measure_text(&font, "Hello", 80.0);
        assert!(w_big > w_small * 3.0);
        assert!(h_big > h_small);
    }

    #[test]
    fn drawn_text_changes_pixels_near_origin() {
        let font = test_font();
        let mut img = RgbaImage::from_pixel(200, 80, image::Rgba([0, 0, 0, 255]));
        let style = TextStyle { size: 40.0, color: [255, 0, 0, 255], ..Default::default() };
        assert!(draw_text(&mut img, &font, "Hi", &style, 10.0, 10.0, 1.0));
        assert!(img.pixels().any(|p| p[0] > 128));
        // nothing drawn far right of a two-letter string
        assert!((150..200).all(|x| img.get_pixel(x, 40)[0] == 0));
    }

    #[test]
    fn bad_font_file_is_a_parameter_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        assert!(LoadedFont::from_file(&path, false, false).is_err());
    }
}
