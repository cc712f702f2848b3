// ============================================================================
// PHOTO SHEET - tile one image into an R×C grid on a solid background
// ============================================================================

use image::{imageops, Rgba, RgbaImage};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::naming::{CounterStyle, OutputNamer};
use crate::tool::{ImageTool, RenderContext};

pub const MAX_SPACING_PERCENT: u32 = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SheetLayout {
    #[default]
    Grid2x2,
    Grid2x3,
    Grid2x4,
    Grid3x3,
    Grid3x4,
    Grid4x4,
}

impl SheetLayout {
    pub fn all() -> &'static [SheetLayout] {
        &[
            SheetLayout::Grid2x2,
            SheetLayout::Grid2x3,
            SheetLayout::Grid2x4,
            SheetLayout::Grid3x3,
            SheetLayout::Grid3x4,
            SheetLayout::Grid4x4,
        ]
    }

    /// `(rows, cols)`
    pub fn grid(self) -> (u32, u32) {
        match self {
            SheetLayout::Grid2x2 => (2, 2),
            SheetLayout::Grid2x3 => (2, 3),
            SheetLayout::Grid2x4 => (2, 4),
            SheetLayout::Grid3x3 => (3, 3),
            SheetLayout::Grid3x4 => (3, 4),
            SheetLayout::Grid4x4 => (4, 4),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SheetLayout::Grid2x2 => "2x2",
            SheetLayout::Grid2x3 => "2x3",
            SheetLayout::Grid2x4 => "2x4",
            SheetLayout::Grid3x3 => "3x3",
            SheetLayout::Grid3x4 => "3x4",
            SheetLayout::Grid4x4 => "4x4",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::all().iter().copied().find(|l| l.label().eq_ignore_ascii_case(label))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SheetBackground {
    #[default]
    White,
    Black,
}

impl SheetBackground {
    fn pixel(self) -> Rgba<u8> {
        match self {
            SheetBackground::White => Rgba([255, 255, 255, 255]),
            SheetBackground::Black => Rgba([0, 0, 0, 255]),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sheet {
    pub layout: SheetLayout,
    /// Gap between tiles as a percentage of the tile width (0..=50).
    pub spacing_percent: u32,
    pub background: SheetBackground,
}

impl Default for Sheet {
    fn default() -> Self {
        Self {
            layout: SheetLayout::default(),
            spacing_percent: 5,
            background: SheetBackground::default(),
        }
    }
}

impl Sheet {
    /// Spacing for a tile of width `tile_w`. The percentage keeps the
    /// proxy and the full render proportionally identical.
    pub fn spacing_px(&self, tile_w: u32) -> u32 {
        (tile_w as u64 * self.spacing_percent.min(MAX_SPACING_PERCENT) as u64 / 100) as u32
    }

    pub fn canvas_size(&self, tile_w: u32, tile_h: u32) -> (u32, u32) {
        let (rows, cols) = self.layout.grid();
        let sp = self.spacing_px(tile_w);
        (cols * tile_w + (cols + 1) * sp, rows * tile_h + (rows + 1) * sp)
    }
}

impl ImageTool for Sheet {
    fn name(&self) -> &'static str {
        "sheet"
    }

    fn namer(&self) -> OutputNamer {
        OutputNamer::new("_sheet", CounterStyle::ZeroPadded).with_fallback_extension("jpg")
    }

    fn proxy_divisor(&self, settings: &Settings) -> u32 {
        settings.sheet_proxy_divisor
    }

    fn render(&self, image: &RgbaImage, _ctx: RenderContext) -> Result<Option<RgbaImage>> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(Error::geometry("cannot tile an empty image"));
        }
        let (rows, cols) = self.layout.grid();
        let sp = self.spacing_px(w);
        let (cw, ch) = self.canvas_size(w, h);
        let mut canvas = RgbaImage::from_pixel(cw, ch, self.background.pixel());
        for r in 0..rows {
            for c in 0..cols {
                let x = sp + c * (w + sp);
                let y = sp + r * (h + sp);
                imageops::overlay(&mut canvas, image, x as i64, y as i64);
            }
        }
        Ok(Some(canvas))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_includes_outer_and_inner_gaps() {
        let sheet = Sheet { layout: SheetLayout::Grid2x3, spacing_percent: 10, ..Default::default() };
        assert_eq!(sheet.spacing_px(100), 10);
        assert_eq!(sheet.canvas_size(100, 50), (3 * 100 + 4 * 10, 2 * 50 + 3 * 10));
    }

    #[test]
    fn tiles_are_placed_on_background() {
        let tile = RgbaImage::from_pixel(10, 10, Rgba([200, 0, 0, 255]));
        let sheet = Sheet { spacing_percent: 20, background: SheetBackground::Black, ..Default::default() };
        let out = sheet.render(&tile, RenderContext::FULL).unwrap().unwrap();
        assert_eq!(out.dimensions(), (26, 26));
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(out.get_pixel(2, 2), &Rgba([200, 0, 0, 255]));
        assert_eq!(out.get_pixel(12, 12), &Rgba([0, 0, 0, 255]));
        assert_eq!(out.get_pixel(14, 14), &Rgba([200, 0, 0, 255]));
    }

    #[test]
    fn layout_labels_round_trip() {
        for l in SheetLayout::all() {
            assert_eq!(SheetLayout::from_label(l.label()), Some(*l));
        }
        assert_eq!(SheetLayout::from_label("5x5"), None);
    }
}
