use image::RgbaImage;

use crate::error::{Error, Result};
use crate::naming::{CounterStyle, OutputNamer};
use crate::ops::transform::{self, Rect};
use crate::preview::DisplayMapping;
use crate::tool::{ImageTool, RenderContext};

/// Crop to a rectangle given in source pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Crop {
    pub region: Rect,
}

impl Crop {
    pub fn new(region: Rect) -> Self {
        Self { region }
    }

    /// Selection dragged between two points of the displayed (fitted) image.
    pub fn from_display(mapping: &DisplayMapping, a: (f32, f32), b: (f32, f32)) -> Result<Self> {
        let region = mapping.selection(a, b);
        if region.is_empty() {
            return Err(Error::geometry("select an area to crop"));
        }
        Ok(Self { region })
    }
}

impl ImageTool for Crop {
    fn name(&self) -> &'static str {
        "crop"
    }

    fn namer(&self) -> OutputNamer {
        OutputNamer::new("_cropped", CounterStyle::ZeroPadded)
    }

    fn render(&self, image: &RgbaImage, ctx: RenderContext) -> Result<Option<RgbaImage>> {
        let r = self.region;
        let scaled = if ctx.scale < 1.0 {
            proxy_region(r, ctx, image.dimensions())
        } else {
            r
        };
        transform::crop(image, scaled).map(Some)
    }
}

/// Outward-rounded proxy rectangle, at least 1px on each axis, so a
/// selection that crops at full size also previews.
fn proxy_region(r: Rect, ctx: RenderContext, (w, h): (u32, u32)) -> Rect {
    if r.is_empty() || w == 0 || h == 0 {
        return Rect::new(0, 0, 0, 0);
    }
    let edge = |v: u32, max: u32, round: fn(f32) -> f32| (round(ctx.px(v as f32)).max(0.0) as u32).min(max);
    let x0 = edge(r.x, w - 1, f32::floor);
    let y0 = edge(r.y, h - 1, f32::floor);
    let x1 = edge(r.right(), w, f32::ceil).max(x0 + 1);
    let y1 = edge(r.bottom(), h, f32::ceil).max(y0 + 1);
    Rect::new(x0, y0, x1 - x0, y1 - y0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn display_selection_maps_to_source_rect() {
        let mapping = DisplayMapping::fit(1000, 800, 500, 400);
        let crop = Crop::from_display(&mapping, (50.0, 40.0), (150.0, 240.0)).unwrap();
        assert_eq!(crop.region, Rect::new(100, 80, 200, 400));
    }

    #[test]
    fn zero_area_selection_is_rejected() {
        let mapping = DisplayMapping::fit(100, 100, 100, 100);
        assert!(Crop::from_display(&mapping, (10.0, 10.0), (10.0, 60.0)).is_err());
    }

    #[test]
    fn render_cuts_the_region() {
        let img = RgbaImage::from_fn(10, 10, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let out = Crop::new(Rect::new(2, 3, 4, 5))
            .render(&img, RenderContext::FULL)
            .unwrap()
            .unwrap();
        assert_eq!(out.dimensions(), (4, 5));
        assert_eq!(out.get_pixel(0, 0), &Rgba([2, 3, 0, 255]));
    }

    #[test]
    fn saved_crop_lands_next_to_source() {
        use crate::config::Settings;
        use crate::tool::ToolSession;

        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("name.jpg");
        image::RgbImage::from_pixel(1000, 800, image::Rgb([90, 120, 150])).save(&src).unwrap();

        let mapping = DisplayMapping::fit(1000, 800, 500, 400);
        let crop = Crop::from_display(&mapping, (50.0, 50.0), (250.0, 150.0)).unwrap();
        let mut session = ToolSession::new(crop, Settings::default());
        session.load(&src).unwrap();
        let out = session.save().unwrap().unwrap();
        assert_eq!(out, dir.path().join("name_cropped01.jpg"));
        let saved = image::open(&out).unwrap();
        assert_eq!((saved.width(), saved.height()), (400, 200));
    }

    #[test]
    fn proxy_render_scales_region() {
        let proxy = RgbaImage::new(25, 20);
        let out = Crop::new(Rect::new(20, 40, 40, 20))
            .render(&proxy, RenderContext { scale: 0.25 })
            .unwrap()
            .unwrap();
        assert_eq!(out.dimensions(), (10, 5));
    }

    #[test]
    fn tiny_selection_still_previews() {
        use crate::config::Settings;
        use crate::tool::ToolSession;

        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("dots.png");
        RgbaImage::from_pixel(400, 400, Rgba([10, 20, 30, 255])).save(&src).unwrap();

        let mut session = ToolSession::new(Crop::new(Rect::new(10, 10, 2, 2)), Settings::default());
        session.load(&src).unwrap();
        session.refresh_preview().unwrap();
        let (w, h) = session.preview().unwrap().dimensions();
        assert!(w >= 1 && h >= 1);

        let out = session.save().unwrap().unwrap();
        assert_eq!(image::open(&out).unwrap().width(), 2);
    }

    #[test]
    fn proxy_region_stays_inside_the_image() {
        let r = proxy_region(Rect::new(398, 398, 2, 2), RenderContext { scale: 0.25 }, (100, 100));
        assert_eq!(r, Rect::new(99, 99, 1, 1));
    }
}
