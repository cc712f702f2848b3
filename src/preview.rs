// ============================================================================
// PREVIEW - display fitting, coordinate mapping and the debounce timer
// ============================================================================

use std::time::{Duration, Instant};

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::config::Theme;
use crate::ops::transform::Rect;

/// Where a scaled image sits inside a display area (aspect preserved,
/// centred).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayMapping {
    pub image_w: u32,
    pub image_h: u32,
    pub displayed_w: u32,
    pub displayed_h: u32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl DisplayMapping {
    /// Fit `image_w × image_h` into `area_w × area_h`.
    pub fn fit(image_w: u32, image_h: u32, area_w: u32, area_h: u32) -> Self {
        let (iw, ih) = (image_w.max(1) as f32, image_h.max(1) as f32);
        let scale = (area_w as f32 / iw).min(area_h as f32 / ih);
        let displayed_w = ((iw * scale).round() as u32).max(1);
        let displayed_h = ((ih * scale).round() as u32).max(1);
        Self {
            image_w,
            image_h,
            displayed_w,
            displayed_h,
            offset_x: (area_w as f32 - displayed_w as f32) / 2.0,
            offset_y: (area_h as f32 - displayed_h as f32) / 2.0,
        }
    }

    /// Image pixels per displayed pixel.
    pub fn scale(&self) -> f32 {
        self.image_w as f32 / self.displayed_w as f32
    }

    /// Display-area point → image coordinates (unclamped).
    pub fn to_image(&self, x: f32, y: f32) -> (f32, f32) {
        let s = self.scale();
        ((x - self.offset_x) * s, (y - self.offset_y) * s)
    }

    /// Display-area point → pixel inside the image, if it lands on one.
    pub fn to_pixel(&self, x: f32, y: f32) -> Option<(u32, u32)> {
        let (ix, iy) = self.to_image(x, y);
        if ix < 0.0 || iy < 0.0 {
            return None;
        }
        let (px, py) = (ix as u32, iy as u32);
        (px < self.image_w && py < self.image_h).then_some((px, py))
    }

    /// Selection between two display points → clamped image rectangle.
    pub fn selection(&self, a: (f32, f32), b: (f32, f32)) -> Rect {
        Rect::from_corners(
            self.to_image(a.0, a.1),
            self.to_image(b.0, b.1),
            (self.image_w, self.image_h),
        )
    }
}

/// Scale `image` into an `area_w × area_h` frame filled with the theme's base
/// color, the way a tool window shows its preview.
pub fn letterbox(image: &RgbaImage, area_w: u32, area_h: u32, theme: &Theme) -> RgbaImage {
    let map = DisplayMapping::fit(image.width(), image.height(), area_w, area_h);
    let scaled = imageops::resize(image, map.displayed_w, map.displayed_h, FilterType::Triangle);
    let [r, g, b] = theme.base;
    let mut frame = RgbaImage::from_pixel(area_w.max(1), area_h.max(1), Rgba([r, g, b, 255]));
    imageops::overlay(
        &mut frame,
        &scaled,
        map.offset_x.round() as i64,
        map.offset_y.round() as i64,
    );
    frame
}

/// Single-shot, restartable delay. Each `schedule` replaces any pending
/// deadline; `poll` fires once when the latest deadline has passed.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// `true` exactly once per burst, when `now` reaches the latest deadline.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(at) if now >= at => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Time left until the pending deadline.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|at| at.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_image_is_letterboxed_vertically() {
        let m = DisplayMapping::fit(1000, 500, 400, 400);
        assert_eq!((m.displayed_w, m.displayed_h), (400, 200));
        assert_eq!(m.offset_x, 0.0);
        assert_eq!(m.offset_y, 100.0);
        assert_eq!(m.scale(), 2.5);
    }

    #[test]
    fn selection_maps_back_to_source_space() {
        let m = DisplayMapping::fit(1000, 800, 250, 200);
        let r = m.selection((25.0, 20.0), (125.0, 120.0));
        assert_eq!(r, Rect::new(100, 80, 400, 400));
    }

    #[test]
    fn clicks_outside_the_image_miss() {
        let m = DisplayMapping::fit(100, 50, 200, 200);
        assert_eq!(m.to_pixel(100.0, 10.0), None);
        assert_eq!(m.to_pixel(0.0, 50.0), Some((0, 0)));
    }

    #[test]
    fn letterbox_uses_theme_base() {
        let img = RgbaImage::from_pixel(10, 5, Rgba([255, 0, 0, 255]));
        let theme = Theme::default();
        let frame = letterbox(&img, 20, 20, &theme);
        assert_eq!(frame.get_pixel(0, 0), &Rgba([30, 30, 30, 255]));
        assert_eq!(frame.get_pixel(10, 10), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn last_schedule_wins() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(50));
        d.schedule(t0);
        d.schedule(t0 + Duration::from_millis(30));
        assert!(!d.poll(t0 + Duration::from_millis(60)));
        assert!(d.poll(t0 + Duration::from_millis(80)));
        assert!(!d.poll(t0 + Duration::from_millis(200)));
    }

    #[test]
    fn poll_without_schedule_never_fires() {
        let mut d = Debouncer::new(Duration::from_millis(20));
        assert!(!d.is_pending());
        assert!(!d.poll(Instant::now() + Duration::from_secs(1)));
    }
}
