// ============================================================================
// RESIZE - exact or percentage resampling, batch + legacy token CLI
// ============================================================================

use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::naming::{CounterStyle, OutputNamer};
use crate::ops::transform::{self, Interpolation};
use crate::tool::{ImageTool, RenderContext, ToolSession};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeMode {
    /// Pixel dimensions. A missing side is derived from the aspect ratio when
    /// `keep_aspect` is set, otherwise it keeps the original length.
    Exact {
        width: Option<u32>,
        height: Option<u32>,
        keep_aspect: bool,
    },
    /// Percentage of the original size.
    Percent(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ResizeFilter {
    #[default]
    Smooth,
    Nearest,
}

impl ResizeFilter {
    pub fn interpolation(self) -> Interpolation {
        match self {
            ResizeFilter::Smooth => Interpolation::Lanczos3,
            ResizeFilter::Nearest => Interpolation::Nearest,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resize {
    pub mode: ResizeMode,
    pub filter: ResizeFilter,
}

impl Resize {
    pub fn percent(p: u32) -> Self {
        Self { mode: ResizeMode::Percent(p), filter: ResizeFilter::Smooth }
    }

    pub fn exact(width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            mode: ResizeMode::Exact { width, height, keep_aspect: true },
            filter: ResizeFilter::Smooth,
        }
    }

    pub fn with_filter(mut self, filter: ResizeFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Output dimensions for a `w × h` source.
    pub fn target_size(&self, w: u32, h: u32) -> Result<(u32, u32)> {
        match self.mode {
            ResizeMode::Percent(0) => Err(Error::parameter("percentage must be greater than 0")),
            ResizeMode::Percent(p) => {
                let scale = |v: u32| ((v as u64 * p as u64 / 100) as u32).max(1);
                Ok((scale(w), scale(h)))
            }
            ResizeMode::Exact { width: None, height: None, .. } => {
                Err(Error::parameter("enter a width or a height"))
            }
            ResizeMode::Exact { width: Some(0), .. } | ResizeMode::Exact { height: Some(0), .. } => {
                Err(Error::parameter("width and height must be greater than 0"))
            }
            ResizeMode::Exact { width, height, keep_aspect } => {
                let derive = |given: u32, orig_given: u32, orig_other: u32| {
                    ((orig_other as u64 * given as u64 / orig_given.max(1) as u64) as u32).max(1)
                };
                Ok(match (width, height) {
                    (Some(nw), Some(nh)) => (nw, nh),
                    (Some(nw), None) if keep_aspect => (nw, derive(nw, w, h)),
                    (None, Some(nh)) if keep_aspect => (derive(nh, h, w), nh),
                    (nw, nh) => (nw.unwrap_or(w), nh.unwrap_or(h)),
                })
            }
        }
    }
}

impl ImageTool for Resize {
    fn name(&self) -> &'static str {
        "resize"
    }

    fn namer(&self) -> OutputNamer {
        OutputNamer::new("_resized", CounterStyle::Separated)
    }

    fn render(&self, image: &RgbaImage, ctx: RenderContext) -> Result<Option<RgbaImage>> {
        let (w, h) = image.dimensions();
        let (tw, th) = match self.mode {
            ResizeMode::Percent(_) => self.target_size(w, h)?,
            ResizeMode::Exact { .. } => {
                // Exact sizes are in source pixels; a proxy shrinks them by the same ratio.
                let source_w = (w as f32 / ctx.scale).round() as u32;
                let source_h = (h as f32 / ctx.scale).round() as u32;
                let (tw, th) = self.target_size(source_w, source_h)?;
                (
                    (ctx.px(tw as f32).round() as u32).max(1),
                    (ctx.px(th as f32).round() as u32).max(1),
                )
            }
        };
        Ok(Some(transform::resize(image, tw, th, self.filter.interpolation())))
    }
}

/// Resize every file, stopping at the first failure. Outputs go next to each
/// source unless `destination` is given.
pub fn resize_files(
    paths: &[PathBuf],
    params: Resize,
    settings: &Settings,
    destination: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let mut session = ToolSession::new(params, settings.clone());
    session.set_destination(destination.map(Path::to_path_buf));
    let mut written = Vec::with_capacity(paths.len());
    for path in paths {
        session.load(path)?;
        if let Some(out) = session.save()? {
            written.push(out);
        }
    }
    tracing::info!(count = written.len(), "resize batch finished");
    Ok(written)
}

// ============================================================================
// Legacy token CLI:  qfast r|p wNNN [hNNN] [m] <source> [target_dir]
// ============================================================================

pub const LEGACY_HELP: &str = "\
QFast Image Resizer - CLI Help Guide
------------------------------------
Usage: qfast [mode] [parameters] [source_file] [target_directory(optional)]

Modes:
  r : Resolution Mode (Pixel based)
  p : Percent Mode (Percentage based)

Parameters:
  wXXX : Set Width (e.g., w800) or Percentage (e.g., w50)
  hXXX : Set Height (e.g., h600) - Only for Resolution Mode
  m    : Keep Metadata (EXIF)

Examples:
  qfast r w800 photo.jpg           -> Resize photo to 800px width (aspect ratio kept)
  qfast r w1920 h1080 m photo.jpg  -> Resize to 1920x1080 and keep metadata
  qfast p w50 photo.jpg            -> Resize photo to 50% of its original size
  qfast r w400 photo.jpg /tmp/     -> Resize and save to /tmp directory
";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LegacyCommand {
    Help,
    Run(LegacyResize),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacyResize {
    pub params: Resize,
    pub source: PathBuf,
    pub target_dir: Option<PathBuf>,
    pub keep_exif: bool,
}

/// Whether `first` selects the legacy token syntax. Only the mode tokens do;
/// `qfast --help` belongs to the subcommand parser.
pub fn is_legacy_invocation(first: &str) -> bool {
    matches!(first.to_ascii_lowercase().as_str(), "r" | "p")
}

fn is_help_token(arg: &str) -> bool {
    matches!(arg.to_ascii_lowercase().as_str(), "help" | "-h" | "--help")
}

/// Parse the token form. Existing files and directories are recognised
/// before the `w`/`h` prefixes so a file named `hello.png` is a source.
/// A bare mode token, or a mode followed by a help flag, asks for help.
pub fn parse_legacy(args: &[String]) -> Result<LegacyCommand> {
    let Some(first) = args.first() else {
        return Ok(LegacyCommand::Help);
    };
    let mode = first.to_ascii_lowercase();
    if args.len() == 1 || args[1..].iter().any(|a| is_help_token(a)) {
        return Ok(LegacyCommand::Help);
    }
    if mode != "r" && mode != "p" {
        return Err(Error::parameter(
            "Invalid mode! Use 'r' for Resolution or 'p' for Percent.",
        ));
    }

    let mut width = None;
    let mut height = None;
    let mut source = None;
    let mut target_dir = None;
    let mut keep_exif = false;

    for arg in &args[1..] {
        let path = Path::new(arg);
        let lower = arg.to_ascii_lowercase();
        if path.is_file() {
            source = Some(path.to_path_buf());
        } else if path.is_dir() {
            target_dir = Some(path.to_path_buf());
        } else if lower == "m" {
            keep_exif = true;
        } else if let Some(v) = lower.strip_prefix('w') {
            width = Some(parse_number(v, "width")?);
        } else if let Some(v) = lower.strip_prefix('h') {
            height = Some(parse_number(v, "height")?);
        } else {
            tracing::warn!(token = %arg, "ignoring unrecognised resize token");
        }
    }

    let source = source.ok_or_else(|| Error::parameter("Source file not found or not specified."))?;
    let width = width.ok_or_else(|| Error::parameter("Width or Percentage (wXXX) must be specified."))?;
    let params = if mode == "r" {
        Resize::exact(Some(width), height)
    } else {
        Resize::percent(width)
    };
    Ok(LegacyCommand::Run(LegacyResize { params, source, target_dir, keep_exif }))
}

fn parse_number(v: &str, what: &str) -> Result<u32> {
    v.parse::<u32>()
        .map_err(|_| Error::parameter(format!("{} must be a whole number, got '{}'", what, v)))
}

/// Execute a parsed legacy command, returning the written file.
pub fn run_legacy(cmd: &LegacyResize, settings: &Settings) -> Result<PathBuf> {
    let mut settings = settings.clone();
    settings.keep_exif = cmd.keep_exif;
    let written = resize_files(
        std::slice::from_ref(&cmd.source),
        cmd.params,
        &settings,
        cmd.target_dir.as_deref(),
    )?;
    written
        .into_iter()
        .next()
        .ok_or_else(|| Error::parameter("resize produced no output"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn percent_at_100_keeps_pixels() {
        let img = RgbaImage::from_fn(7, 5, |x, y| Rgba([x as u8 * 30, y as u8 * 40, 9, 255]));
        let out = Resize::percent(100).render(&img, RenderContext::FULL).unwrap().unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn percent_truncates_and_never_hits_zero() {
        assert_eq!(Resize::percent(50).target_size(101, 3).unwrap(), (50, 1));
        assert_eq!(Resize::percent(1).target_size(10, 10).unwrap(), (1, 1));
        assert!(Resize::percent(0).target_size(10, 10).is_err());
    }

    #[test]
    fn missing_side_follows_aspect_ratio() {
        assert_eq!(Resize::exact(Some(800), None).target_size(1000, 500).unwrap(), (800, 400));
        assert_eq!(Resize::exact(None, Some(250)).target_size(1000, 500).unwrap(), (500, 250));
        let free = Resize {
            mode: ResizeMode::Exact { width: Some(800), height: None, keep_aspect: false },
            filter: ResizeFilter::Nearest,
        };
        assert_eq!(free.target_size(1000, 500).unwrap(), (800, 500));
        assert!(Resize::exact(None, None).target_size(10, 10).is_err());
    }

    #[test]
    fn proxy_render_scales_exact_target() {
        let proxy = RgbaImage::new(250, 200);
        let ctx = RenderContext { scale: 0.25 };
        let out = Resize::exact(Some(500), None).render(&proxy, ctx).unwrap().unwrap();
        assert_eq!(out.dimensions(), (125, 100));
    }

    #[test]
    fn legacy_tokens_parse() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("photo.png");
        RgbaImage::new(4, 4).save(&src).unwrap();
        let args: Vec<String> = ["r", "w800", "h600", "m", src.to_str().unwrap(), dir.path().to_str().unwrap()]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let LegacyCommand::Run(cmd) = parse_legacy(&args).unwrap() else {
            panic!("expected a run command");
        };
        assert_eq!(cmd.params, Resize::exact(Some(800), Some(600)));
        assert!(cmd.keep_exif);
        assert_eq!(cmd.source, src);
        assert_eq!(cmd.target_dir.as_deref(), Some(dir.path()));
    }

    #[test]
    fn legacy_errors() {
        let s = |v: &[&str]| v.iter().map(|x| x.to_string()).collect::<Vec<_>>();
        assert!(parse_legacy(&s(&["x", "w10"])).is_err());
        assert!(parse_legacy(&s(&["r", "w10", "/definitely/not/here.png"])).is_err());
        assert_eq!(parse_legacy(&s(&["r", "--help"])).unwrap(), LegacyCommand::Help);
        assert_eq!(parse_legacy(&s(&["p"])).unwrap(), LegacyCommand::Help);
        assert!(is_legacy_invocation("P"));
        assert!(!is_legacy_invocation("crop"));
        assert!(!is_legacy_invocation("--help"));
        assert!(!is_legacy_invocation("-h"));
        assert!(!is_legacy_invocation("help"));
    }

    #[test]
    fn legacy_run_writes_separated_counter() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("pic.png");
        RgbaImage::from_pixel(100, 50, Rgba([1, 2, 3, 255])).save(&src).unwrap();
        let cmd = LegacyResize {
            params: Resize::percent(50),
            source: src.clone(),
            target_dir: None,
            keep_exif: false,
        };
        let first = run_legacy(&cmd, &Settings::default()).unwrap();
        let second = run_legacy(&cmd, &Settings::default()).unwrap();
        assert_eq!(first, dir.path().join("pic_resized_1.png"));
        assert_eq!(second, dir.path().join("pic_resized_2.png"));
        assert_eq!(image::open(&first).unwrap().width(), 50);
    }
}
