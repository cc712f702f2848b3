use std::path::PathBuf;

use image::RgbaImage;

use crate::config::Settings;
use crate::error::Result;
use crate::naming::{CounterStyle, OutputNamer};
use crate::ops::adjustments;
use crate::tool::{ImageTool, RenderContext, ToolSession};

/// Color negative. Alpha is left as is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Invert;

impl ImageTool for Invert {
    fn name(&self) -> &'static str {
        "invert"
    }

    fn namer(&self) -> OutputNamer {
        OutputNamer::new("_inverted", CounterStyle::ZeroPadded).with_fallback_extension("jpg")
    }

    fn render(&self, image: &RgbaImage, _ctx: RenderContext) -> Result<Option<RgbaImage>> {
        Ok(Some(adjustments::invert(image)))
    }
}

/// Invert each file in turn, stopping at the first failure.
pub fn invert_files(paths: &[PathBuf], settings: &Settings) -> Result<Vec<PathBuf>> {
    let mut session = ToolSession::new(Invert, settings.clone());
    let mut written = Vec::with_capacity(paths.len());
    for path in paths {
        session.load(path)?;
        written.extend(session.save()?);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn inverting_twice_is_identity() {
        let img = RgbaImage::from_fn(9, 4, |x, y| Rgba([x as u8 * 25, y as u8 * 60, 7, 100 + x as u8]));
        let once = Invert.render(&img, RenderContext::FULL).unwrap().unwrap();
        assert_eq!(once.get_pixel(0, 0), &Rgba([255, 255, 248, 100]));
        let twice = Invert.render(&once, RenderContext::FULL).unwrap().unwrap();
        assert_eq!(twice, img);
    }

    #[test]
    fn batch_writes_one_file_per_input() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b_inverted01.png");
        RgbaImage::new(3, 3).save(&a).unwrap();
        RgbaImage::new(3, 3).save(&b).unwrap();
        let out = invert_files(&[a, b], &Settings::default()).unwrap();
        assert_eq!(out, vec![dir.path().join("a_inverted01.png"), dir.path().join("b_inverted02.png")]);
    }
}
