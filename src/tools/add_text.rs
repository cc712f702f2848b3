use image::RgbaImage;

use crate::error::Result;
use crate::naming::{CounterStyle, OutputNamer};
use crate::ops::text::{self, LoadedFont, TextStyle};
use crate::preview::DisplayMapping;
use crate::tool::{ImageTool, RenderContext};

pub const MIN_SIZE: f32 = 10.0;
pub const MAX_SIZE: f32 = 500.0;

/// Stamp a line of text at a point given in source pixels.
#[derive(Clone, Debug)]
pub struct AddText {
    pub text: String,
    pub font: LoadedFont,
    pub style: TextStyle,
    pub position: (f32, f32),
}

impl AddText {
    pub fn new(font: LoadedFont) -> Self {
        Self {
            text: String::new(),
            font,
            style: TextStyle::default(),
            position: (0.0, 0.0),
        }
    }

    /// Place the text where the user clicked on the displayed image.
    pub fn place_at_display(&mut self, mapping: &DisplayMapping, x: f32, y: f32) {
        let (ix, iy) = mapping.to_image(x, y);
        self.position = (
            ix.clamp(0.0, mapping.image_w as f32),
            iy.clamp(0.0, mapping.image_h as f32),
        );
    }
}

impl ImageTool for AddText {
    fn name(&self) -> &'static str {
        "add-text"
    }

    fn namer(&self) -> OutputNamer {
        OutputNamer::new("_text", CounterStyle::ZeroPadded)
    }

    fn render(&self, image: &RgbaImage, ctx: RenderContext) -> Result<Option<RgbaImage>> {
        if self.text.trim().is_empty() {
            return Ok(None);
        }
        let style = TextStyle {
            size: ctx.px(self.style.size.clamp(MIN_SIZE, MAX_SIZE)).max(1.0),
            ..self.style
        };
        let mut out = image.clone();
        let (x, y) = (ctx.px(self.position.0), ctx.px(self.position.1));
        if !text::draw_text(&mut out, &self.font, &self.text, &style, x, y, 1.0) {
            return Ok(None);
        }
        Ok(Some(out))
    }
}
