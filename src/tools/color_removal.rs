use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::error::Result;
use crate::io::SaveFormat;
use crate::naming::{CounterStyle, OutputNamer};
use crate::ops::color_removal;
use crate::preview::DisplayMapping;
use crate::tool::EditSession;

pub const DEFAULT_TOLERANCE: u8 = 10;
pub const MAX_TOLERANCE: u8 = 100;

pub fn namer() -> OutputNamer {
    OutputNamer::new("_removed", CounterStyle::Plain).with_extension("png")
}

/// Click-to-clear background remover with undo.
pub struct ColorRemover {
    session: EditSession,
    tolerance: u8,
}

impl ColorRemover {
    pub fn open(path: &Path, settings: Settings) -> Result<Self> {
        Ok(Self {
            session: EditSession::open(path, settings)?,
            tolerance: DEFAULT_TOLERANCE,
        })
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn tolerance(&self) -> u8 {
        self.tolerance
    }

    pub fn set_tolerance(&mut self, tolerance: u8) {
        self.tolerance = tolerance.min(MAX_TOLERANCE);
    }

    /// Clear every pixel matching the color at `(x, y)`. Returns the number
    /// of pixels cleared; a transparent or out-of-range seed clears nothing
    /// and leaves no history entry.
    pub fn remove_at(&mut self, x: u32, y: u32) -> Result<usize> {
        let tolerance = self.tolerance;
        let mut cleared = 0;
        self.session.apply(|img| {
            Ok(color_removal::remove_color_at(img, x, y, tolerance).map(|(out, n)| {
                cleared = n;
                out
            }))
        })?;
        tracing::debug!(x, y, tolerance, cleared, "color removed");
        Ok(cleared)
    }

    /// Same as [`remove_at`](Self::remove_at) for a click on the displayed image.
    pub fn remove_at_display(&mut self, mapping: &DisplayMapping, x: f32, y: f32) -> Result<usize> {
        match mapping.to_pixel(x, y) {
            Some((px, py)) => self.remove_at(px, py),
            None => Ok(0),
        }
    }

    pub fn undo(&mut self) -> bool {
        self.session.undo()
    }

    pub fn save(&self) -> Result<PathBuf> {
        self.session.save(&namer(), SaveFormat::Png)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn logo_on_white(dir: &Path) -> PathBuf {
        let path = dir.join("logo.jpg");
        let img = image::RgbImage::from_fn(20, 20, |x, y| {
            if (5..15).contains(&x) && (5..15).contains(&y) {
                image::Rgb([200, 20, 20])
            } else {
                image::Rgb([255, 255, 255])
            }
        });
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn click_clears_background_and_saves_png() {
        let dir = tempfile::tempdir().unwrap();
        let mut remover = ColorRemover::open(&logo_on_white(dir.path()), Settings::default()).unwrap();
        remover.set_tolerance(40);
        let cleared = remover.remove_at(0, 0).unwrap();
        assert!(cleared >= 250);
        assert_eq!(remover.session().current().get_pixel(0, 0)[3], 0);
        assert_eq!(remover.session().current().get_pixel(10, 10)[3], 255);

        let out = remover.save().unwrap();
        assert_eq!(out, dir.path().join("logo_removed1.png"));
        let saved = image::open(&out).unwrap().to_rgba8();
        assert_eq!(saved.get_pixel(0, 0), &Rgba([255, 255, 255, 0]));
    }

    #[test]
    fn clicking_cleared_area_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mut remover = ColorRemover::open(&logo_on_white(dir.path()), Settings::default()).unwrap();
        remover.set_tolerance(40);
        remover.remove_at(0, 0).unwrap();
        assert_eq!(remover.session().undo_depth(), 1);
        assert_eq!(remover.remove_at(1, 1).unwrap(), 0);
        assert_eq!(remover.session().undo_depth(), 1);
        assert!(remover.undo());
        assert_eq!(remover.session().current().get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn tolerance_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let mut remover = ColorRemover::open(&logo_on_white(dir.path()), Settings::default()).unwrap();
        remover.set_tolerance(250);
        assert_eq!(remover.tolerance(), MAX_TOLERANCE);
    }
}
