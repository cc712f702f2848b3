// ============================================================================
// CONVERTER - batch format conversion, optional downscale, PDF merge
// ============================================================================

use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::config::Settings;
use crate::error::{Error, ProcessError, Result};
use crate::io::{self, SaveFormat, SaveOptions, SourceImage};
use crate::naming::{CounterStyle, OutputNamer};
use crate::ops::transform::{self, Interpolation};
use crate::tools::BatchReport;

/// Input extensions the converter queues. AVIF is left out: the `image`
/// build has no AVIF decoder, so such files would only fail to load.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "tif", "tiff", "gif"];

#[derive(Clone, Debug, PartialEq)]
pub struct ConvertOptions {
    pub format: SaveFormat,
    /// 1..=100, also drives the PNG compression level.
    pub quality: u8,
    /// 10..=100; below 100 the image is downscaled first.
    pub scale_percent: u32,
    pub keep_exif: bool,
    /// Merge every input into one PDF instead of one file each.
    pub merge_pdf: bool,
    pub destination: Option<PathBuf>,
}

impl ConvertOptions {
    pub fn new(format: SaveFormat, settings: &Settings) -> Self {
        Self {
            format,
            quality: settings.convert_quality,
            scale_percent: 100,
            keep_exif: settings.keep_exif,
            merge_pdf: false,
            destination: None,
        }
    }

    fn quality(&self) -> u8 {
        self.quality.clamp(1, 100)
    }

    /// `min(9, quality / 11)`
    pub fn png_level(&self) -> u8 {
        (self.quality() / 11).min(9)
    }

    fn scale(&self) -> u32 {
        self.scale_percent.clamp(10, 100)
    }

    fn namer(&self) -> OutputNamer {
        let ext = match self.format {
            SaveFormat::Jpeg => "jpeg",
            other => other.extension(),
        };
        OutputNamer::new(".converted", CounterStyle::Plain)
            .with_extension(ext)
            .with_destination(self.destination.clone())
    }
}

/// Downscale to `percent` of the original size with Lanczos3 (each side ≥ 1).
pub fn scale_image(image: &RgbaImage, percent: u32) -> RgbaImage {
    if percent >= 100 {
        return image.clone();
    }
    let w = ((image.width() as u64 * percent as u64 / 100) as u32).max(1);
    let h = ((image.height() as u64 * percent as u64 / 100) as u32).max(1);
    transform::resize(image, w, h, Interpolation::Lanczos3)
}

/// Convert one file and write it under a fresh `.convertedN` name.
pub fn convert_file(path: &Path, opts: &ConvertOptions) -> Result<PathBuf> {
    let source = SourceImage::open(path)?;
    let pixels = scale_image(&source.pixels, opts.scale());
    let save = SaveOptions::new(opts.format, opts.quality())
        .with_png_level(opts.png_level())
        .with_exif_from(source.exif_source(opts.keep_exif));
    let bytes = io::encode(&pixels, &save)?;
    io::write_reserved(path, &opts.namer(), &bytes)
}

/// Convert every file, reporting `(done, total)` after each one.
pub fn convert_batch(
    paths: &[PathBuf],
    opts: &ConvertOptions,
    mut progress: impl FnMut(usize, usize),
) -> BatchReport {
    let total = paths.len();
    let mut report = BatchReport::default();
    for (i, path) in paths.iter().enumerate() {
        report.record(path, convert_file(path, opts));
        progress(i + 1, total);
    }
    tracing::info!(
        format = opts.format.extension(),
        ok = report.succeeded(),
        failed = report.failed.len(),
        "conversion finished"
    );
    report
}

/// All inputs as pages of one PDF, named after the first file.
pub fn merge_pdf(
    paths: &[PathBuf],
    opts: &ConvertOptions,
    mut progress: impl FnMut(usize, usize),
) -> Result<PathBuf> {
    let Some(first) = paths.first() else {
        return Err(Error::Process(ProcessError::Empty("no files to merge".to_string())));
    };
    let total = paths.len();
    let mut pages = Vec::with_capacity(total);
    for (i, path) in paths.iter().enumerate() {
        let source = SourceImage::open(path)?;
        let scaled = scale_image(&source.pixels, opts.scale());
        pages.push(io::flatten_onto(&scaled, [255, 255, 255]));
        progress(i + 1, total);
    }
    let title = first
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "merged".to_string());
    let bytes = io::write_pdf(&title, &pages)?;
    let namer = OutputNamer::new(".converted", CounterStyle::Plain)
        .with_extension("pdf")
        .with_destination(opts.destination.clone());
    let out = io::write_reserved(first, &namer, &bytes)?;
    tracing::info!(pages = total, output = %out.display(), "PDF merged");
    Ok(out)
}

/// Run the converter as configured: a PDF merge or a per-file batch.
pub fn run(
    paths: &[PathBuf],
    opts: &ConvertOptions,
    progress: impl FnMut(usize, usize),
) -> Result<BatchReport> {
    if opts.format == SaveFormat::Pdf && opts.merge_pdf {
        let out = merge_pdf(paths, opts, progress)?;
        return Ok(BatchReport { written: vec![out], failed: Vec::new() });
    }
    Ok(convert_batch(paths, opts, progress))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn png_level_follows_quality() {
        let mut opts = ConvertOptions::new(SaveFormat::Png, &Settings::default());
        assert_eq!(opts.png_level(), 7);
        opts.quality = 100;
        assert_eq!(opts.png_level(), 9);
        opts.quality = 5;
        assert_eq!(opts.png_level(), 0);
    }

    #[test]
    fn scale_truncates_with_floor_of_one() {
        let img = RgbaImage::new(101, 3);
        assert_eq!(scale_image(&img, 50).dimensions(), (50, 1));
        assert_eq!(scale_image(&img, 100).dimensions(), (101, 3));
    }

    #[test]
    fn jpeg_target_uses_full_extension_and_flattens() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("icon.png");
        RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0])).save(&src).unwrap();
        let opts = ConvertOptions::new(SaveFormat::Jpeg, &Settings::default());
        let out = convert_file(&src, &opts).unwrap();
        assert_eq!(out, dir.path().join("icon.converted1.jpeg"));
        let px = image::open(&out).unwrap().to_rgb8();
        assert!(px.get_pixel(4, 4)[0] > 240);
    }

    #[test]
    fn batch_continues_after_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        let bad = dir.path().join("bad.png");
        RgbaImage::new(4, 4).save(&good).unwrap();
        std::fs::write(&bad, b"not an image").unwrap();
        let mut ticks = Vec::new();
        let opts = ConvertOptions::new(SaveFormat::Bmp, &Settings::default());
        let report = convert_batch(&[bad.clone(), good], &opts, |done, total| ticks.push((done, total)));
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, bad);
        assert_eq!(ticks, vec![(1, 2), (2, 2)]);
        // the failed attempt leaves no placeholder behind
        assert!(!dir.path().join("bad.converted1.bmp").exists());
    }

    #[test]
    fn pdf_merge_writes_one_file_named_after_the_first_input() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.jpg");
        RgbaImage::from_pixel(30, 20, Rgba([255, 0, 0, 128])).save(&a).unwrap();
        image::RgbImage::new(20, 30).save(&b).unwrap();
        let opts = ConvertOptions { merge_pdf: true, ..ConvertOptions::new(SaveFormat::Pdf, &Settings::default()) };
        let report = run(&[a, b], &opts, |_, _| {}).unwrap();
        assert_eq!(report.written, vec![dir.path().join("a.converted1.pdf")]);
        let bytes = std::fs::read(&report.written[0]).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn empty_merge_is_rejected() {
        let opts = ConvertOptions { merge_pdf: true, ..ConvertOptions::new(SaveFormat::Pdf, &Settings::default()) };
        assert!(merge_pdf(&[], &opts, |_, _| {}).is_err());
    }

    #[test]
    fn avif_inputs_are_not_queued_and_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let avif = dir.path().join("shot.avif");
        std::fs::write(&avif, b"\0\0\0\x1cftypavif").unwrap();
        let png = dir.path().join("shot.png");
        let queued = crate::tools::filter_by_extension(&[avif.clone(), png.clone()], ACCEPTED_EXTENSIONS);
        assert_eq!(queued, vec![png]);

        let opts = ConvertOptions::new(SaveFormat::Png, &Settings::default());
        let err = convert_file(&avif, &opts).unwrap_err();
        assert!(matches!(err, Error::Load { .. }), "{:?}", err);
    }
}
