// ============================================================================
// ADJUST - ordered color/tone filter chain
// ============================================================================
//
// Stage order: hue → brightness → contrast → saturation → blur → sharpen →
// sepia → vignette. A stage whose control sits at its neutral value is
// skipped entirely.

use image::RgbaImage;

use crate::error::Result;
use crate::naming::{CounterStyle, OutputNamer};
use crate::ops::{adjustments, effects, filters};
use crate::tool::{ImageTool, RenderContext};

/// Slider values, in the units the controls use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adjust {
    /// 0..=255, fraction of a hue turn in 1/256 steps.
    pub hue: u8,
    /// Percent, 10..=300.
    pub brightness: u32,
    /// Percent, 10..=300.
    pub contrast: u32,
    /// Tenths, 0..=30.
    pub saturation: u32,
    /// 0..=100; Gaussian radius is `blur / 20` source pixels.
    pub blur: u32,
    /// Tenths, 10..=50.
    pub sharpen: u32,
    /// 0..=100
    pub sepia: u32,
    /// 0..=100
    pub vignette: u32,
}

impl Default for Adjust {
    fn default() -> Self {
        Self {
            hue: 0,
            brightness: 100,
            contrast: 100,
            saturation: 10,
            blur: 0,
            sharpen: 10,
            sepia: 0,
            vignette: 0,
        }
    }
}

impl Adjust {
    /// Every control pulled into its slider range.
    pub fn clamped(self) -> Self {
        Self {
            hue: self.hue,
            brightness: self.brightness.clamp(10, 300),
            contrast: self.contrast.clamp(10, 300),
            saturation: self.saturation.min(30),
            blur: self.blur.min(100),
            sharpen: self.sharpen.clamp(10, 50),
            sepia: self.sepia.min(100),
            vignette: self.vignette.min(100),
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.clamped() == Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl ImageTool for Adjust {
    fn name(&self) -> &'static str {
        "adjust"
    }

    fn namer(&self) -> OutputNamer {
        OutputNamer::new("_adjust", CounterStyle::ZeroPadded)
    }

    fn render(&self, image: &RgbaImage, ctx: RenderContext) -> Result<Option<RgbaImage>> {
        let p = self.clamped();
        let neutral = Self::default();
        let mut working = image.clone();

        if p.hue != neutral.hue {
            working = adjustments::hue_shift(&working, p.hue);
        }
        if p.brightness != neutral.brightness {
            working = adjustments::brightness(&working, p.brightness as f32 / 100.0);
        }
        if p.contrast != neutral.contrast {
            working = adjustments::contrast(&working, p.contrast as f32 / 100.0);
        }
        if p.saturation != neutral.saturation {
            working = adjustments::saturation(&working, p.saturation as f32 / 10.0);
        }
        if p.blur != neutral.blur {
            working = filters::gaussian_blur(&working, ctx.px(p.blur as f32 / 20.0));
        }
        if p.sharpen != neutral.sharpen {
            working = filters::sharpen(&working, p.sharpen as f32 / 10.0);
        }
        if p.sepia != neutral.sepia {
            working = adjustments::sepia(&working, p.sepia as f32 / 100.0);
        }
        if p.vignette != neutral.vignette {
            working = effects::vignette(&working, p.vignette as f32);
        }
        Ok(Some(working))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient() -> RgbaImage {
        RgbaImage::from_fn(16, 8, |x, y| Rgba([x as u8 * 15, y as u8 * 30, 128, 255]))
    }

    #[test]
    fn neutral_settings_leave_pixels_alone() {
        let img = gradient();
        let adj = Adjust::default();
        assert!(adj.is_neutral());
        assert_eq!(adj.render(&img, RenderContext::FULL).unwrap().unwrap(), img);
    }

    #[test]
    fn brightness_half_darkens() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([200, 100, 50, 255]));
        let adj = Adjust { brightness: 50, ..Default::default() };
        let out = adj.render(&img, RenderContext::FULL).unwrap().unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgba([100, 50, 25, 255]));
    }

    #[test]
    fn zero_saturation_is_gray() {
        let img = gradient();
        let adj = Adjust { saturation: 0, ..Default::default() };
        let out = adj.render(&img, RenderContext::FULL).unwrap().unwrap();
        assert!(out.pixels().all(|p| p[0] == p[1] && p[1] == p[2]));
    }

    #[test]
    fn full_sepia_stays_on_the_ramp() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let adj = Adjust { sepia: 100, ..Default::default() };
        let out = adj.render(&img, RenderContext::FULL).unwrap().unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgba([0x30, 0x1e, 0x01, 255]));
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let adj = Adjust { brightness: 5000, sharpen: 0, ..Default::default() }.clamped();
        assert_eq!(adj.brightness, 300);
        assert_eq!(adj.sharpen, 10);
    }
}
