// ============================================================================
// QFast CLI - every tool driven headless from the command line
// ============================================================================
//
// Usage examples:
//   qfast resize --percent 50 shots/*.jpg
//   qfast crop photo.jpg --x 100 --y 80 --width 400 --height 400
//   qfast convert -f webp -q 80 *.png --out-dir converted/
//   qfast gif anim.gif --skip 2 --speed 2 --colors 64
//   qfast qr gen "https://example.org" -o code.png
//   qfast r w800 h600 photo.jpg out/            (legacy resizer tokens)
//
// Each subcommand maps onto one tool in `crate::tools`; saved files follow
// that tool's naming rules, so nothing is ever overwritten.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::error::{Error, ProcessError, Result};
use crate::io::SaveFormat;
use crate::ops::clipboard;
use crate::ops::text::{LoadedFont, TextStyle};
use crate::ops::transform::Rect;
use crate::tool::ToolSession;
use crate::tools::add_text::AddText;
use crate::tools::adjust::Adjust;
use crate::tools::censor::{CensorEditor, CensorMode, CensorShape};
use crate::tools::color_picker::{self, ColorPicker, PickedColor};
use crate::tools::color_removal::ColorRemover;
use crate::tools::convert::{self, ConvertOptions};
use crate::tools::crop::Crop;
use crate::tools::gif_opt::{self, GifInfo, GifOptions};
use crate::tools::resize::{self, LegacyCommand, Resize, ResizeFilter, ResizeMode};
use crate::tools::sheet::{Sheet, SheetBackground, SheetLayout};
use crate::tools::watermark::{self, Anchor, Mark, Watermark};
use crate::tools::{self, BatchReport, exif, flip_rotate, invert, ocr, qr};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// QFastTools: quick single-purpose image utilities.
#[derive(Parser, Debug)]
#[command(
    name = "qfast",
    version,
    about = "Quick image utilities: resize, crop, convert, censor, QR, OCR and more",
    long_about = "Each subcommand runs one tool and writes its result next to the input\n\
                  with a tool-specific suffix (photo_cropped01.jpg, photo.converted.webp, ...).\n\n\
                  The legacy resizer syntax is still accepted:\n  \
                  qfast r w800 [h600] [m] <source> [target_dir]\n  \
                  qfast p w50 <source>\n  \
                  qfast r --help"
)]
pub struct CliArgs {
    /// Settings file to use instead of the per-user settings.json.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print per-file timing information.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resize by percentage or to an exact size.
    Resize {
        /// Input file(s). Glob patterns accepted.
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<String>,
        #[arg(short, long, conflicts_with_all = ["width", "height"])]
        percent: Option<u32>,
        #[arg(short = 'W', long)]
        width: Option<u32>,
        #[arg(short = 'H', long)]
        height: Option<u32>,
        /// Use both dimensions as given instead of keeping the aspect ratio.
        #[arg(long)]
        stretch: bool,
        /// Nearest-neighbour sampling (pixel art).
        #[arg(long)]
        nearest: bool,
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },

    /// Cut out a rectangle given in source pixels.
    Crop {
        input: PathBuf,
        #[arg(long, default_value_t = 0)]
        x: u32,
        #[arg(long, default_value_t = 0)]
        y: u32,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
    },

    /// Repeat the image on a printable grid.
    Sheet {
        input: PathBuf,
        /// 2x2, 2x3, 2x4, 3x3, 3x4 or 4x4.
        #[arg(short, long, default_value = "2x2")]
        layout: String,
        /// Gap between tiles, percent of the tile width.
        #[arg(short, long, default_value_t = 5)]
        spacing: u32,
        #[arg(long)]
        black: bool,
    },

    /// Flip and rotate in steps: h, v, cw, ccw.
    Flip {
        input: PathBuf,
        #[arg(required = true, num_args = 1..)]
        steps: Vec<String>,
    },

    /// Stamp text onto the image.
    Text {
        input: PathBuf,
        text: String,
        #[arg(long, default_value_t = 0.0)]
        x: f32,
        #[arg(long, default_value_t = 0.0)]
        y: f32,
        #[arg(short, long, default_value_t = 40.0)]
        size: f32,
        #[arg(short, long, default_value = "#FFFFFF")]
        color: String,
        /// Font family; defaults to the one in settings.
        #[arg(long)]
        font: Option<String>,
        #[arg(long)]
        bold: bool,
        #[arg(long)]
        italic: bool,
        #[arg(long)]
        underline: bool,
    },

    /// Hue, brightness, contrast and friends.
    Adjust {
        input: PathBuf,
        /// 0..=255 of a full hue turn.
        #[arg(long)]
        hue: Option<u8>,
        /// Percent, 10..=300.
        #[arg(long)]
        brightness: Option<u32>,
        /// Percent, 10..=300.
        #[arg(long)]
        contrast: Option<u32>,
        /// Tenths, 0..=30 (10 = unchanged).
        #[arg(long)]
        saturation: Option<u32>,
        /// 0..=100
        #[arg(long)]
        blur: Option<u32>,
        /// Tenths, 10..=50 (10 = unchanged).
        #[arg(long)]
        sharpen: Option<u32>,
        /// 0..=100
        #[arg(long)]
        sepia: Option<u32>,
        /// 0..=100
        #[arg(long)]
        vignette: Option<u32>,
    },

    /// Pixelate or blur a region.
    Censor {
        input: PathBuf,
        #[arg(long)]
        x: u32,
        #[arg(long)]
        y: u32,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        #[arg(long)]
        ellipse: bool,
        /// Blur instead of pixelating.
        #[arg(long)]
        blur: bool,
        #[arg(short, long, default_value_t = 25)]
        strength: u32,
    },

    /// Color negative.
    Invert {
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<String>,
    },

    /// Show or strip EXIF metadata.
    Exif {
        #[command(subcommand)]
        action: ExifAction,
    },

    /// Make every pixel close to the clicked color transparent.
    Remove {
        input: PathBuf,
        x: u32,
        y: u32,
        #[arg(short, long, default_value_t = 10)]
        tolerance: u8,
    },

    /// Convert between formats, optionally merging into one PDF.
    Convert {
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<String>,
        /// jpg, png, webp, bmp, tiff, gif, pdf, avif
        #[arg(short, long)]
        format: String,
        #[arg(short, long, value_name = "1-100")]
        quality: Option<u8>,
        #[arg(short, long, default_value_t = 100)]
        scale: u32,
        #[arg(long)]
        merge_pdf: bool,
        #[arg(long)]
        strip_exif: bool,
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },

    /// Shrink an animated GIF.
    Gif {
        input: PathBuf,
        #[arg(long, default_value_t = 100)]
        scale: u32,
        #[arg(long, default_value_t = 256)]
        colors: u32,
        /// Keep every n-th frame.
        #[arg(long, default_value_t = 1)]
        skip: u32,
        #[arg(long, default_value_t = 1.0)]
        speed: f32,
        #[arg(long)]
        grayscale: bool,
        /// Only print size, frame and color counts.
        #[arg(long)]
        info: bool,
    },

    /// Generate or read QR codes.
    Qr {
        #[command(subcommand)]
        action: QrAction,
    },

    /// Stamp a text or logo watermark on a batch of images.
    Watermark {
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<String>,
        #[arg(long, conflicts_with = "logo")]
        text: Option<String>,
        #[arg(long)]
        logo: Option<PathBuf>,
        #[arg(long, default_value_t = 60.0)]
        size: f32,
        #[arg(long, default_value = "#FFFFFF")]
        color: String,
        /// Font family for --text; defaults to the one in settings.
        #[arg(long)]
        font: Option<String>,
        #[arg(long)]
        bold: bool,
        #[arg(long)]
        italic: bool,
        #[arg(long)]
        underline: bool,
        /// Logo width as percent of the image width.
        #[arg(long, default_value_t = 20)]
        scale: u32,
        /// bottom-right, top-right, bottom-left, top-left or center.
        #[arg(long, default_value = "bottom-right")]
        anchor: String,
        #[arg(long, default_value_t = 70)]
        opacity: u32,
    },

    /// Read pixel colors from a full-screen snapshot, a file or the clipboard.
    Pick {
        /// Points to sample as X,Y, in order.
        #[arg(required = true, num_args = 1.., value_name = "X,Y")]
        points: Vec<String>,
        /// Image to sample instead of the screen.
        #[arg(short, long, conflicts_with = "clipboard")]
        input: Option<PathBuf>,
        /// Sample the clipboard image instead of the screen.
        #[arg(long)]
        clipboard: bool,
        /// Copy the last hex code to the clipboard.
        #[arg(long)]
        copy: bool,
    },

    /// Extract text with tesseract.
    Ocr {
        input: PathBuf,
        /// Tesseract language code (eng, tur, ...).
        #[arg(short, long)]
        lang: Option<String>,
        /// Also write the text to `<name>_ocr.txt`.
        #[arg(long)]
        save: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ExifAction {
    View { input: PathBuf },
    Clean {
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum QrAction {
    Gen {
        text: String,
        #[arg(short, long)]
        output: PathBuf,
        /// Logo placed in the middle of the code.
        #[arg(long)]
        logo: Option<PathBuf>,
    },
    Read { input: PathBuf },
}

// ============================================================================
// Public entry point
// ============================================================================

/// Parse the process arguments and run. `0` = success, `1` = any failure.
pub fn main_entry() -> ExitCode {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    if let Some(first) = raw.first()
        && resize::is_legacy_invocation(first)
    {
        return run_legacy(&raw);
    }
    run(CliArgs::parse())
}

/// Run one parsed command and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    let settings = match Settings::load(args.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let start = Instant::now();
    let result = dispatch(args.command, &settings);
    if args.verbose {
        println!("done in {:.0}ms", start.elapsed().as_secs_f64() * 1000.0);
    }
    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("command failed: {}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_legacy(raw: &[String]) -> ExitCode {
    let outcome = resize::parse_legacy(raw).and_then(|cmd| match cmd {
        LegacyCommand::Help => {
            println!("{}", resize::LEGACY_HELP);
            Ok(())
        }
        LegacyCommand::Run(job) => {
            let settings = Settings::load(None)?;
            let out = resize::run_legacy(&job, &settings)?;
            println!("Saved: {}", out.display());
            Ok(())
        }
    });
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Per-command processing
// ============================================================================

/// `Ok(false)` means the command ran but some inputs failed.
fn dispatch(command: Command, settings: &Settings) -> Result<bool> {
    match command {
        Command::Resize { inputs, percent, width, height, stretch, nearest, out_dir } => {
            let mode = match percent {
                Some(p) => ResizeMode::Percent(p),
                None => ResizeMode::Exact { width, height, keep_aspect: !stretch },
            };
            let filter = if nearest { ResizeFilter::Nearest } else { ResizeFilter::Smooth };
            let params = Resize { mode, filter };
            if let Some(dir) = &out_dir {
                std::fs::create_dir_all(dir)?;
            }
            let paths = resolve_inputs(&inputs)?;
            print_written(&resize::resize_files(&paths, params, settings, out_dir.as_deref())?);
            Ok(true)
        }

        Command::Crop { input, x, y, width, height } => {
            save_with(Crop::new(Rect::new(x, y, width, height)), &input, settings)
        }

        Command::Sheet { input, layout, spacing, black } => {
            let layout = SheetLayout::from_label(&layout)
                .ok_or_else(|| Error::parameter(format!("unknown layout '{}'", layout)))?;
            let background = if black { SheetBackground::Black } else { SheetBackground::White };
            save_with(Sheet { layout, spacing_percent: spacing, background }, &input, settings)
        }

        Command::Flip { input, steps } => {
            let steps = steps
                .iter()
                .map(|s| flip_rotate::parse_step(s))
                .collect::<Result<Vec<_>>>()?;
            print_written(&[flip_rotate::apply_steps(&input, &steps, settings)?]);
            Ok(true)
        }

        Command::Text { input, text, x, y, size, color, font, bold, italic, underline } => {
            let family = font.as_deref().unwrap_or(&settings.font_family);
            let mut tool = AddText::new(LoadedFont::system(family, bold, italic)?);
            tool.text = text;
            tool.position = (x, y);
            tool.style = TextStyle { size, color: parse_color(&color)?, bold, italic, underline };
            save_with(tool, &input, settings)
        }

        Command::Adjust {
            input, hue, brightness, contrast, saturation, blur, sharpen, sepia, vignette,
        } => {
            let d = Adjust::default();
            let tool = Adjust {
                hue: hue.unwrap_or(d.hue),
                brightness: brightness.unwrap_or(d.brightness),
                contrast: contrast.unwrap_or(d.contrast),
                saturation: saturation.unwrap_or(d.saturation),
                blur: blur.unwrap_or(d.blur),
                sharpen: sharpen.unwrap_or(d.sharpen),
                sepia: sepia.unwrap_or(d.sepia),
                vignette: vignette.unwrap_or(d.vignette),
            };
            save_with(tool, &input, settings)
        }

        Command::Censor { input, x, y, width, height, ellipse, blur, strength } => {
            let mut editor = CensorEditor::open(&input, settings.clone())?;
            editor.params.shape = if ellipse { CensorShape::Ellipse } else { CensorShape::Rectangle };
            editor.params.mode = if blur { CensorMode::Blur } else { CensorMode::Pixelate };
            editor.params.strength = strength;
            if !editor.censor(Rect::new(x, y, width, height))? {
                return Err(Error::geometry("region is too small or outside the image"));
            }
            print_written(&[editor.save()?]);
            Ok(true)
        }

        Command::Invert { inputs } => {
            let paths = resolve_inputs(&inputs)?;
            print_written(&invert::invert_files(&paths, settings)?);
            Ok(true)
        }

        Command::Exif { action: ExifAction::View { input } } => {
            let entries = exif::read_entries(&input)?;
            if entries.is_empty() {
                println!("No EXIF data found.");
            }
            for entry in &entries {
                println!("{:<28} {}", entry.tag, entry.value);
            }
            Ok(true)
        }

        Command::Exif { action: ExifAction::Clean { inputs } } => {
            let mut report = BatchReport::default();
            for path in resolve_inputs(&inputs)? {
                report.record(&path, exif::clean(&path, settings));
            }
            Ok(print_report(&report))
        }

        Command::Remove { input, x, y, tolerance } => {
            let mut remover = ColorRemover::open(&input, settings.clone())?;
            remover.set_tolerance(tolerance);
            let cleared = remover.remove_at(x, y)?;
            if cleared == 0 {
                println!("Nothing matched at ({}, {}).", x, y);
                return Ok(true);
            }
            println!("Cleared {} pixels.", cleared);
            print_written(&[remover.save()?]);
            Ok(true)
        }

        Command::Convert { inputs, format, quality, scale, merge_pdf, strip_exif, out_dir } => {
            let format = SaveFormat::from_extension(&format)
                .ok_or_else(|| Error::UnsupportedFormat(format.clone()))?;
            let mut opts = ConvertOptions::new(format, settings);
            if let Some(q) = quality {
                opts.quality = q.clamp(1, 100);
            }
            opts.scale_percent = scale;
            opts.merge_pdf = merge_pdf;
            opts.keep_exif = !strip_exif && settings.keep_exif;
            if let Some(dir) = &out_dir {
                std::fs::create_dir_all(dir)?;
            }
            opts.destination = out_dir;

            let paths = tools::filter_by_extension(&resolve_inputs(&inputs)?, convert::ACCEPTED_EXTENSIONS);
            if paths.is_empty() {
                return Err(Error::Process(ProcessError::Empty("no convertible images".to_string())));
            }
            let report = convert::run(&paths, &opts, |done, total| {
                if total > 1 {
                    println!("[{}/{}]", done, total);
                }
            })?;
            Ok(print_report(&report))
        }

        Command::Gif { input, scale, colors, skip, speed, grayscale, info } => {
            let before = GifInfo::read(&input)?;
            print_gif_info(&input, &before);
            if info {
                return Ok(true);
            }
            let opts = GifOptions { scale_percent: scale, colors, skip, speed, grayscale };
            let out = gif_opt::optimize(&input, &opts)?;
            print_gif_info(&out, &GifInfo::read(&out)?);
            Ok(true)
        }

        Command::Qr { action: QrAction::Gen { text, output, logo } } => {
            let Some(code) = qr::generate_with_logo(&text, logo.as_deref())? else {
                return Err(Error::Process(ProcessError::Empty("QR text is empty".to_string())));
            };
            print_written(&[qr::save(&code, &output)?]);
            Ok(true)
        }

        Command::Qr { action: QrAction::Read { input } } => {
            println!("{}", qr::decode_file(&input)?);
            Ok(true)
        }

        Command::Watermark {
            inputs, text, logo, size, color, font, bold, italic, underline, scale, anchor, opacity,
        } => {
            let mark = match (text, logo) {
                (Some(text), _) => Mark::Text {
                    text,
                    font: LoadedFont::system(font.as_deref().unwrap_or(&settings.font_family), bold, italic)?,
                    style: TextStyle { size, color: parse_color(&color)?, bold, italic, underline },
                },
                (None, Some(path)) => Mark::Logo {
                    image: image::open(&path)
                        .map_err(|source| Error::Load { path: path.clone(), source })?
                        .into_rgba8(),
                    scale_percent: scale,
                },
                (None, None) => return Err(Error::parameter("give --text or --logo")),
            };
            let mut mark = Watermark::new(mark);
            mark.anchor = Anchor::parse(&anchor)
                .ok_or_else(|| Error::parameter(format!("unknown anchor '{}'", anchor)))?;
            mark.opacity = opacity;
            let paths = tools::filter_by_extension(&resolve_inputs(&inputs)?, watermark::ACCEPTED_EXTENSIONS);
            Ok(print_report(&watermark::watermark_files(&paths, mark, settings)))
        }

        Command::Pick { points, input, clipboard: from_clipboard, copy } => {
            let points = points.iter().map(|p| parse_point(p)).collect::<Result<Vec<_>>>()?;
            let snapshot = match input {
                Some(path) => image::open(&path)
                    .map_err(|source| Error::Load { path, source })?
                    .into_rgba8(),
                None if from_clipboard => clipboard::image_from_clipboard().ok_or_else(|| {
                    Error::Process(ProcessError::Empty("no image on the clipboard".to_string()))
                })?,
                None => color_picker::capture_screen()?,
            };
            let mut picker = ColorPicker::new(snapshot, settings);
            for (x, y) in points {
                let color = picker.click(x, y)?;
                println!("({}, {})  {}  {}", x, y, color.hex(), color.rgb());
            }
            if picker.history().len() > 1 {
                let recent: Vec<String> = picker.history().iter().map(|c| c.hex()).collect();
                println!("history: {}", recent.join(" "));
            }
            if copy && let Some(last) = picker.history().latest() {
                clipboard::copy_text(&last.hex())?;
            }
            Ok(true)
        }

        Command::Ocr { input, lang, save } => {
            let mut engine = ocr::OcrEngine::from_settings(settings);
            if let Some(lang) = lang {
                engine = engine.with_language(lang);
            }
            let text = engine.recognize(&input)?;
            println!("{}", text);
            if save {
                print_written(&[ocr::save_text(&text, &input)?]);
            }
            Ok(true)
        }
    }
}

/// Load one file into a tool session and save the full-resolution result.
fn save_with<T: crate::tool::ImageTool>(tool: T, input: &Path, settings: &Settings) -> Result<bool> {
    let mut session = ToolSession::new(tool, settings.clone());
    session.load(input)?;
    match session.save()? {
        Some(out) => print_written(&[out]),
        None => println!("Nothing to save: the settings leave the image unchanged."),
    }
    Ok(true)
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);
        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let before = result.len();
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                }
                if result.len() == before {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => eprintln!("warning: invalid glob '{}': {}", pattern, e),
        }
    }

    if result.is_empty() {
        return Err(Error::Process(ProcessError::NotFound(
            "no input files matched the given pattern(s)".to_string(),
        )));
    }
    Ok(result)
}

/// `X,Y` → pixel coordinates.
fn parse_point(s: &str) -> Result<(u32, u32)> {
    s.split_once(',')
        .and_then(|(x, y)| Some((x.trim().parse().ok()?, y.trim().parse().ok()?)))
        .ok_or_else(|| Error::parameter(format!("'{}' is not an X,Y point", s)))
}

/// `#RRGGBB` (or `RRGGBB`) → opaque RGBA.
fn parse_color(s: &str) -> Result<[u8; 4]> {
    let c = PickedColor::parse_hex(s)
        .ok_or_else(|| Error::parameter(format!("'{}' is not a #RRGGBB color", s)))?;
    Ok([c.r, c.g, c.b, 255])
}

fn print_written(paths: &[PathBuf]) {
    for p in paths {
        println!("Saved: {}", p.display());
    }
}

/// Print a batch outcome; `false` when anything failed.
fn print_report(report: &BatchReport) -> bool {
    print_written(&report.written);
    for (path, e) in &report.failed {
        eprintln!("  error: {}: {}", path.display(), e);
    }
    println!("{} succeeded, {} failed", report.succeeded(), report.failed.len());
    report.failed.is_empty()
}

fn print_gif_info(path: &Path, info: &GifInfo) {
    let colors = info
        .color_count
        .map(|c| c.to_string())
        .unwrap_or_else(|| "?".to_string());
    println!(
        "{}: {}x{}, {} frames, {} colors, {:.2} MB",
        path.display(),
        info.width,
        info.height,
        info.frame_count,
        colors,
        info.size_mb()
    );
}
