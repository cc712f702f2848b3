// ============================================================================
// CENSOR - pixelate or blur a dragged rectangle/ellipse, with undo
// ============================================================================

use std::path::{Path, PathBuf};

use image::{imageops, RgbaImage};

use crate::config::Settings;
use crate::error::Result;
use crate::io;
use crate::naming::{CounterStyle, OutputNamer};
use crate::ops::effects;
use crate::ops::filters;
use crate::ops::transform::Rect;
use crate::preview::DisplayMapping;
use crate::tool::EditSession;

/// Regions thinner than this in either axis are ignored.
const MIN_REGION: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CensorShape {
    #[default]
    Rectangle,
    Ellipse,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CensorMode {
    #[default]
    Pixelate,
    Blur,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Censor {
    pub shape: CensorShape,
    pub mode: CensorMode,
    /// 5..=100
    pub strength: u32,
}

impl Default for Censor {
    fn default() -> Self {
        Self {
            shape: CensorShape::Rectangle,
            mode: CensorMode::Pixelate,
            strength: 25,
        }
    }
}

impl Censor {
    fn strength(&self) -> u32 {
        self.strength.clamp(5, 100)
    }

    pub fn block_size(&self) -> u32 {
        (self.strength() / 2).max(4)
    }

    pub fn blur_radius(&self) -> f32 {
        self.strength() as f32 / 2.0
    }

    /// Censor `region` of `image`. `None` when the region is too small.
    pub fn apply(&self, image: &RgbaImage, region: Rect) -> Option<RgbaImage> {
        let r = region.clamp_to(image.width(), image.height());
        if r.width < MIN_REGION || r.height < MIN_REGION {
            return None;
        }
        let patch = imageops::crop_imm(image, r.x, r.y, r.width, r.height).to_image();
        let processed = match self.mode {
            CensorMode::Pixelate => effects::pixelate(&patch, self.block_size()),
            CensorMode::Blur => filters::gaussian_blur(&patch, self.blur_radius()),
        };
        let mask = match self.shape {
            CensorShape::Rectangle => None,
            CensorShape::Ellipse => Some(effects::ellipse_mask(
                r.width,
                r.height,
                0.0,
                0.0,
                r.width as f32,
                r.height as f32,
            )),
        };
        let mut out = image.clone();
        effects::paste_masked(&mut out, &processed, r.x, r.y, mask.as_ref());
        Some(out)
    }
}

pub fn namer() -> OutputNamer {
    OutputNamer::new("_censored", CounterStyle::ZeroPadded)
}

/// Interactive censoring session: each applied region is undoable.
pub struct CensorEditor {
    session: EditSession,
    pub params: Censor,
}

impl CensorEditor {
    pub fn open(path: &Path, settings: Settings) -> Result<Self> {
        Ok(Self {
            session: EditSession::open(path, settings)?,
            params: Censor::default(),
        })
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    /// Censor a region in source pixels. Returns whether anything changed.
    pub fn censor(&mut self, region: Rect) -> Result<bool> {
        let params = self.params;
        let changed = self.session.apply(|img| Ok(params.apply(img, region)))?;
        if changed {
            tracing::debug!(?region, mode = ?params.mode, shape = ?params.shape, "censored region");
        }
        Ok(changed)
    }

    /// Censor the area dragged between two points of the displayed image.
    pub fn censor_display(&mut self, mapping: &DisplayMapping, a: (f32, f32), b: (f32, f32)) -> Result<bool> {
        self.censor(mapping.selection(a, b))
    }

    pub fn undo(&mut self) -> bool {
        self.session.undo()
    }

    pub fn save(&self) -> Result<PathBuf> {
        let format = io::format_for_source(&self.session.source().path);
        self.session.save(&namer(), format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checker() -> RgbaImage {
        RgbaImage::from_fn(40, 40, |x, y| {
            if (x + y) % 2 == 0 { Rgba([255, 255, 255, 255]) } else { Rgba([0, 0, 0, 255]) }
        })
    }

    #[test]
    fn tiny_regions_are_ignored() {
        let c = Censor::default();
        assert!(c.apply(&checker(), Rect::new(5, 5, 1, 30)).is_none());
        assert!(c.apply(&checker(), Rect::new(39, 39, 10, 10)).is_none());
    }

    #[test]
    fn pixelate_only_touches_the_region() {
        let img = checker();
        let out = Censor::default().apply(&img, Rect::new(0, 0, 24, 24)).unwrap();
        assert_eq!(out.get_pixel(30, 30), img.get_pixel(30, 30));
        // 12px blocks inside the region
        assert_eq!(out.get_pixel(0, 0), out.get_pixel(11, 11));
    }

    #[test]
    fn ellipse_keeps_corners() {
        let img = checker();
        let c = Censor { shape: CensorShape::Ellipse, mode: CensorMode::Blur, strength: 20 };
        let out = c.apply(&img, Rect::new(0, 0, 40, 40)).unwrap();
        assert_eq!(out.get_pixel(0, 0), img.get_pixel(0, 0));
        assert_ne!(out.get_pixel(20, 20), img.get_pixel(20, 20));
    }

    #[test]
    fn block_size_has_a_floor() {
        assert_eq!(Censor { strength: 5, ..Default::default() }.block_size(), 4);
        assert_eq!(Censor { strength: 100, ..Default::default() }.block_size(), 50);
    }

    #[test]
    fn editor_history_only_grows_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("face.png");
        checker().save(&src).unwrap();
        let mut editor = CensorEditor::open(&src, Settings::default()).unwrap();
        assert!(!editor.censor(Rect::new(0, 0, 1, 1)).unwrap());
        assert!(!editor.session().can_undo());
        assert!(editor.censor(Rect::new(0, 0, 20, 20)).unwrap());
        assert!(editor.undo());
        assert_eq!(editor.session().current(), &checker());
        assert_eq!(editor.save().unwrap(), dir.path().join("face_censored01.png"));
    }
}
