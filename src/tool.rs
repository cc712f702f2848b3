// ============================================================================
// TOOL PIPELINE - load → preview (proxy) → render (full) → save
// ============================================================================
//
// Every parametrized tool implements `ImageTool`; `ToolSession` owns the
// source, its proxy, the debounce timer and the last preview, so the tools
// themselves only describe their transform and output naming.
//
// Interactive editors whose edits accumulate (censor, color remover,
// flip/rotate) use `EditSession` instead: a working image plus a bounded
// undo ring.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use image::RgbaImage;

use crate::config::Settings;
use crate::error::Result;
use crate::history::ImageHistory;
use crate::io::{self, SaveFormat, SaveOptions, SourceImage};
use crate::naming::OutputNamer;
use crate::preview::{self, Debouncer};

/// How the bitmap being rendered relates to the source image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderContext {
    /// Rendered pixels per source pixel: 1.0 for the final render, 1/divisor
    /// for the proxy.
    pub scale: f32,
}

impl RenderContext {
    pub const FULL: RenderContext = RenderContext { scale: 1.0 };

    pub fn proxy(source_w: u32, proxy_w: u32) -> Self {
        Self { scale: proxy_w.max(1) as f32 / source_w.max(1) as f32 }
    }

    /// Convert a length given in source pixels to rendered pixels.
    pub fn px(&self, source_px: f32) -> f32 {
        source_px * self.scale
    }
}

/// A parametrized pixel transform with its own output naming.
pub trait ImageTool {
    fn name(&self) -> &'static str;

    /// Suffix token and counter style for saved files.
    fn namer(&self) -> OutputNamer;

    /// Apply the transform. `Ok(None)` means the parameters describe a no-op
    /// (empty text, neutral settings) and nothing should be saved.
    fn render(&self, image: &RgbaImage, ctx: RenderContext) -> Result<Option<RgbaImage>>;

    fn proxy_divisor(&self, settings: &Settings) -> u32 {
        settings.proxy_divisor
    }

    fn save_format(&self, source: &Path) -> SaveFormat {
        io::format_for_source(source)
    }
}

pub struct ToolSession<T: ImageTool> {
    tool: T,
    settings: Settings,
    source: Option<SourceImage>,
    proxy: Option<RgbaImage>,
    preview: Option<RgbaImage>,
    debouncer: Debouncer,
    destination: Option<PathBuf>,
}

impl<T: ImageTool> ToolSession<T> {
    pub fn new(tool: T, settings: Settings) -> Self {
        let debouncer = Debouncer::new(settings.debounce());
        Self {
            tool,
            settings,
            source: None,
            proxy: None,
            preview: None,
            debouncer,
            destination: None,
        }
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    pub fn proxy(&self) -> Option<&RgbaImage> {
        self.proxy.as_ref()
    }

    pub fn preview(&self) -> Option<&RgbaImage> {
        self.preview.as_ref()
    }

    /// The current preview fitted into an `area_w × area_h` display area on
    /// the theme background.
    pub fn display_preview(&self, area_w: u32, area_h: u32) -> Option<RgbaImage> {
        self.preview
            .as_ref()
            .map(|p| preview::letterbox(p, area_w, area_h, &self.settings.theme))
    }

    pub fn set_destination(&mut self, dir: Option<PathBuf>) {
        self.destination = dir;
    }

    /// Load a new source and rebuild the proxy. The previous preview is
    /// dropped.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let source = SourceImage::open(path)?;
        let divisor = self.tool.proxy_divisor(&self.settings);
        self.proxy = Some(io::make_proxy(&source.pixels, divisor));
        self.source = Some(source);
        self.preview = None;
        tracing::info!(tool = self.tool.name(), path = %path.display(), divisor, "source loaded");
        Ok(())
    }

    /// Replace the source with an in-memory image (e.g. a pasted bitmap).
    pub fn load_image(&mut self, source: SourceImage) {
        let divisor = self.tool.proxy_divisor(&self.settings);
        self.proxy = Some(io::make_proxy(&source.pixels, divisor));
        self.source = Some(source);
        self.preview = None;
    }

    /// Change parameters and schedule a debounced preview.
    pub fn update(&mut self, now: Instant, change: impl FnOnce(&mut T)) {
        change(&mut self.tool);
        self.request_preview(now);
    }

    /// Schedule a preview recompute. Without a loaded image this is a no-op.
    pub fn request_preview(&mut self, now: Instant) {
        if self.proxy.is_some() {
            self.debouncer.schedule(now);
        }
    }

    pub fn preview_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Recompute the preview if the debounce deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Result<bool> {
        if !self.debouncer.poll(now) {
            return Ok(false);
        }
        self.refresh_preview()?;
        Ok(true)
    }

    /// Run the transform on the proxy right away.
    pub fn refresh_preview(&mut self) -> Result<Option<&RgbaImage>> {
        let (Some(source), Some(proxy)) = (&self.source, &self.proxy) else {
            return Ok(None);
        };
        let ctx = RenderContext::proxy(source.width(), proxy.width());
        let rendered = self.tool.render(proxy, ctx)?;
        self.preview = Some(rendered.unwrap_or_else(|| proxy.clone()));
        Ok(self.preview.as_ref())
    }

    /// Run the transform on the full-resolution source.
    pub fn render_full(&self) -> Result<Option<RgbaImage>> {
        let Some(source) = &self.source else {
            return Ok(None);
        };
        self.tool.render(&source.pixels, RenderContext::FULL)
    }

    /// Render at full resolution and write a new file next to the source
    /// (or into the destination override). `Ok(None)` when there is no image
    /// or the transform is a no-op.
    pub fn save(&self) -> Result<Option<PathBuf>> {
        let Some(source) = &self.source else {
            return Ok(None);
        };
        let Some(result) = self.render_full()? else {
            tracing::info!(tool = self.tool.name(), "nothing to save");
            return Ok(None);
        };
        let format = self.tool.save_format(&source.path);
        let opts = SaveOptions::new(format, self.settings.jpeg_quality)
            .with_exif_from(source.exif_source(self.settings.keep_exif));
        let namer = self.tool.namer().with_destination(self.destination.clone());
        io::save_next_to(&result, &source.path, &namer, &opts).map(Some)
    }
}

/// Working image with bounded undo for tools whose edits accumulate.
pub struct EditSession {
    source: SourceImage,
    current: Arc<RgbaImage>,
    history: ImageHistory,
    settings: Settings,
}

impl EditSession {
    pub fn open(path: &Path, settings: Settings) -> Result<Self> {
        Ok(Self::from_source(SourceImage::open(path)?, settings))
    }

    pub fn from_source(source: SourceImage, settings: Settings) -> Self {
        let current = Arc::new(source.pixels.clone());
        let history = ImageHistory::new(settings.undo_depth);
        Self { source, current, history, settings }
    }

    pub fn source(&self) -> &SourceImage {
        &self.source
    }

    pub fn current(&self) -> &RgbaImage {
        &self.current
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn undo_depth(&self) -> usize {
        self.history.len()
    }

    /// Apply an edit. A `None` result leaves the image and history untouched.
    pub fn apply<F>(&mut self, edit: F) -> Result<bool>
    where
        F: FnOnce(&RgbaImage) -> Result<Option<RgbaImage>>,
    {
        match edit(&self.current)? {
            Some(next) => {
                let prev = std::mem::replace(&mut self.current, Arc::new(next));
                self.history.push(prev);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(prev) => {
                self.current = prev;
                true
            }
            None => false,
        }
    }

    pub fn save(&self, namer: &OutputNamer, format: SaveFormat) -> Result<PathBuf> {
        let opts = SaveOptions::new(format, self.settings.jpeg_quality)
            .with_exif_from(self.source.exif_source(self.settings.keep_exif));
        io::save_next_to(&self.current, &self.source.path, namer, &opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::CounterStyle;
    use crate::ops::adjustments;
    use image::Rgba;
    use std::time::Duration;

    struct Negate;

    impl ImageTool for Negate {
        fn name(&self) -> &'static str {
            "negate"
        }
        fn namer(&self) -> OutputNamer {
            OutputNamer::new("_neg", CounterStyle::ZeroPadded)
        }
        fn render(&self, image: &RgbaImage, _ctx: RenderContext) -> Result<Option<RgbaImage>> {
            Ok(Some(adjustments::invert(image)))
        }
    }

    fn write_source(dir: &Path) -> PathBuf {
        let path = dir.join("src.png");
        RgbaImage::from_pixel(40, 20, Rgba([10, 20, 30, 255])).save(&path).unwrap();
        path
    }

    #[test]
    fn display_preview_uses_the_configured_theme() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.theme.base = [1, 2, 3];
        let mut session = ToolSession::new(Negate, settings);
        assert!(session.display_preview(50, 50).is_none());
        session.load(&write_source(dir.path())).unwrap();
        session.refresh_preview().unwrap();
        let frame = session.display_preview(50, 50).unwrap();
        assert_eq!(frame.dimensions(), (50, 50));
        assert_eq!(frame.get_pixel(0, 0), &Rgba([1, 2, 3, 255]));
        let mid = frame.get_pixel(25, 25);
        assert!(mid[0].abs_diff(245) <= 1 && mid[2].abs_diff(225) <= 1, "{:?}", mid);
    }

    #[test]
    fn preview_without_image_is_a_no_op() {
        let mut session = ToolSession::new(Negate, Settings::default());
        let now = Instant::now();
        session.request_preview(now);
        assert!(!session.preview_pending());
        assert!(session.refresh_preview().unwrap().is_none());
        assert!(session.save().unwrap().is_none());
    }

    #[test]
    fn debounced_preview_runs_on_the_proxy() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = ToolSession::new(Negate, Settings::default());
        session.load(&write_source(dir.path())).unwrap();
        assert_eq!(session.proxy().unwrap().dimensions(), (10, 5));

        let t0 = Instant::now();
        session.request_preview(t0);
        assert!(!session.poll(t0 + Duration::from_millis(10)).unwrap());
        assert!(session.poll(t0 + Duration::from_millis(60)).unwrap());
        let preview = session.preview().unwrap();
        assert_eq!(preview.dimensions(), (10, 5));
        assert_eq!(preview.get_pixel(0, 0), &Rgba([245, 235, 225, 255]));
    }

    #[test]
    fn save_renders_full_resolution_with_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = ToolSession::new(Negate, Settings::default());
        session.load(&write_source(dir.path())).unwrap();
        let out = session.save().unwrap().unwrap();
        assert_eq!(out, dir.path().join("src_neg01.png"));
        assert_eq!(image::open(&out).unwrap().width(), 40);
    }

    #[test]
    fn edit_session_undo_restores_previous_image() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = EditSession::open(&write_source(dir.path()), Settings::default()).unwrap();
        let original = session.current().clone();
        assert!(session.apply(|img| Ok(Some(adjustments::invert(img)))).unwrap());
        assert!(!session.apply(|_| Ok(None)).unwrap());
        assert_eq!(session.undo_depth(), 1);
        assert!(session.undo());
        assert_eq!(session.current(), &original);
        assert!(!session.undo());
    }
}
