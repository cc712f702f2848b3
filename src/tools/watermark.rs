// ============================================================================
// WATERMARK - text or logo stamped at an anchor on every queued file
// ============================================================================

use std::path::PathBuf;

use image::RgbaImage;

use crate::config::Settings;
use crate::error::Result;
use crate::naming::{CounterStyle, OutputNamer};
use crate::ops::effects;
use crate::ops::text::{self, LoadedFont, TextStyle};
use crate::ops::transform::{self, Interpolation};
use crate::tool::{ImageTool, RenderContext, ToolSession};
use crate::tools::BatchReport;

pub const ACCEPTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Distance from the edges for corner anchors.
pub const MARGIN: f32 = 40.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Anchor {
    #[default]
    BottomRight,
    TopRight,
    BottomLeft,
    TopLeft,
    Center,
}

impl Anchor {
    /// Top-left corner of an `ow × oh` mark on a `cw × ch` canvas.
    pub fn place(self, cw: f32, ch: f32, ow: f32, oh: f32, margin: f32) -> (f32, f32) {
        match self {
            Anchor::BottomRight => (cw - ow - margin, ch - oh - margin),
            Anchor::TopRight => (cw - ow - margin, margin),
            Anchor::BottomLeft => (margin, ch - oh - margin),
            Anchor::TopLeft => (margin, margin),
            Anchor::Center => (((cw - ow) / 2.0).floor(), ((ch - oh) / 2.0).floor()),
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "bottomright" => Some(Anchor::BottomRight),
            "topright" => Some(Anchor::TopRight),
            "bottomleft" => Some(Anchor::BottomLeft),
            "topleft" => Some(Anchor::TopLeft),
            "center" | "centre" => Some(Anchor::Center),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Mark {
    /// `style.size` is clamped to 10..=1000.
    Text {
        text: String,
        font: LoadedFont,
        style: TextStyle,
    },
    /// Logo scaled to `scale_percent` of the target width (1..=100).
    Logo { image: RgbaImage, scale_percent: u32 },
}

#[derive(Clone, Debug)]
pub struct Watermark {
    pub mark: Mark,
    pub anchor: Anchor,
    /// 0..=100
    pub opacity: u32,
}

impl Watermark {
    pub fn new(mark: Mark) -> Self {
        Self { mark, anchor: Anchor::default(), opacity: 70 }
    }

    fn opacity(&self) -> f32 {
        self.opacity.min(100) as f32 / 100.0
    }
}

impl ImageTool for Watermark {
    fn name(&self) -> &'static str {
        "watermark"
    }

    fn namer(&self) -> OutputNamer {
        OutputNamer::new(".watermarked", CounterStyle::Plain)
    }

    fn render(&self, image: &RgbaImage, ctx: RenderContext) -> Result<Option<RgbaImage>> {
        let (cw, ch) = (image.width() as f32, image.height() as f32);
        let margin = ctx.px(MARGIN);
        let mut out = image.clone();
        match &self.mark {
            Mark::Text { text, font, style } => {
                if text.trim().is_empty() {
                    return Ok(None);
                }
                let style = TextStyle {
                    size: ctx.px(style.size.clamp(10.0, 1000.0)).max(1.0),
                    ..*style
                };
                let (tw, th) = text::measure_text(font, text, style.size);
                let (x, y) = self.anchor.place(cw, ch, tw, th, margin);
                text::draw_text(&mut out, font, text, &style, x, y, self.opacity());
            }
            Mark::Logo { image: logo, scale_percent } => {
                let nw = ((image.width() as u64 * (*scale_percent).clamp(1, 100) as u64 / 100) as u32).max(1);
                let nh = ((logo.height() as f32 * nw as f32 / logo.width().max(1) as f32).round() as u32).max(1);
                let scaled = transform::resize(logo, nw, nh, Interpolation::Lanczos3);
                let (x, y) = self.anchor.place(cw, ch, nw as f32, nh as f32, margin);
                effects::blend_over(&mut out, &scaled, x as i64, y as i64, self.opacity());
            }
        }
        Ok(Some(out))
    }
}

/// Watermark every accepted file; failures are collected, not fatal.
pub fn watermark_files(paths: &[PathBuf], mark: Watermark, settings: &Settings) -> BatchReport {
    let mut session = ToolSession::new(mark, settings.clone());
    let mut report = BatchReport::default();
    for path in super::filter_by_extension(paths, ACCEPTED_EXTENSIONS) {
        let result = session.load(&path).and_then(|_| session.save());
        match result {
            Ok(Some(out)) => report.written.push(out),
            Ok(None) => {}
            Err(e) => report.record(&path, Err(e)),
        }
    }
    tracing::info!(ok = report.succeeded(), failed = report.failed.len(), "watermark batch finished");
    report
}
