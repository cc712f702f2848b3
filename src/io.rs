// ============================================================================
// IMAGE I/O - load sources, derive proxies, encode outputs, GIF/PDF codecs
// ============================================================================

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageOutputFormat, Rgb, RgbImage, Rgba, RgbaImage};
use little_exif::filetype::FileExtension;
use little_exif::metadata::Metadata;

use crate::error::{Error, Result};
use crate::naming::OutputNamer;

/// GIF frame delays below this are treated as "browser default".
const DEFAULT_FRAME_DELAY_MS: u32 = 100;

// ============================================================================
// Source images
// ============================================================================

/// An image loaded from disk. Pixels are normalised to RGBA8 for processing;
/// the original color mode and EXIF blob are kept for the save step.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub path: PathBuf,
    pub pixels: RgbaImage,
    pub color: ColorType,
    /// Raw EXIF (TIFF-structured) payload, when the file carries one.
    pub exif: Option<Vec<u8>>,
}

impl SourceImage {
    pub fn open(path: &Path) -> Result<Self> {
        let dynamic = image::open(path).map_err(|source| Error::Load {
            path: path.to_path_buf(),
            source,
        })?;
        let color = dynamic.color();
        let exif = read_exif_blob(path);
        tracing::debug!(
            path = %path.display(),
            width = dynamic.width(),
            height = dynamic.height(),
            ?color,
            has_exif = exif.is_some(),
            "loaded source image"
        );
        Ok(Self {
            path: path.to_path_buf(),
            pixels: dynamic.to_rgba8(),
            color,
            exif,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn has_alpha(&self) -> bool {
        self.color.has_alpha()
    }

    /// The source path, when EXIF forwarding is wanted and possible.
    pub fn exif_source(&self, keep_exif: bool) -> Option<&Path> {
        (keep_exif && self.exif.is_some()).then_some(self.path.as_path())
    }
}

fn read_exif_blob(path: &Path) -> Option<Vec<u8>> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader).ok()?;
    Some(exif.buf().to_vec())
}

/// Downscale by an integer divisor for interactive preview (Lanczos3, ≥1px).
pub fn make_proxy(image: &RgbaImage, divisor: u32) -> RgbaImage {
    let divisor = divisor.max(1);
    if divisor == 1 {
        return image.clone();
    }
    let w = (image.width() / divisor).max(1);
    let h = (image.height() / divisor).max(1);
    image::imageops::resize(image, w, h, FilterType::Lanczos3)
}

// ============================================================================
// Output formats
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveFormat {
    Jpeg,
    Png,
    Webp,
    Bmp,
    Tiff,
    Gif,
    Pdf,
    Avif,
}

impl SaveFormat {
    pub fn all() -> &'static [SaveFormat] {
        &[
            SaveFormat::Jpeg,
            SaveFormat::Png,
            SaveFormat::Webp,
            SaveFormat::Bmp,
            SaveFormat::Tiff,
            SaveFormat::Gif,
            SaveFormat::Pdf,
            SaveFormat::Avif,
        ]
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(SaveFormat::Jpeg),
            "png" => Some(SaveFormat::Png),
            "webp" => Some(SaveFormat::Webp),
            "bmp" => Some(SaveFormat::Bmp),
            "tif" | "tiff" => Some(SaveFormat::Tiff),
            "gif" => Some(SaveFormat::Gif),
            "pdf" => Some(SaveFormat::Pdf),
            "avif" => Some(SaveFormat::Avif),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn extension(self) -> &'static str {
        match self {
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Png => "png",
            SaveFormat::Webp => "webp",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Tiff => "tiff",
            SaveFormat::Gif => "gif",
            SaveFormat::Pdf => "pdf",
            SaveFormat::Avif => "avif",
        }
    }

    pub fn supports_alpha(self) -> bool {
        matches!(
            self,
            SaveFormat::Png | SaveFormat::Webp | SaveFormat::Tiff | SaveFormat::Gif | SaveFormat::Avif
        )
    }

    fn exif_container(self) -> Option<FileExtension> {
        match self {
            SaveFormat::Jpeg => Some(FileExtension::JPEG),
            SaveFormat::Png => Some(FileExtension::PNG { as_zTXt_chunk: true }),
            SaveFormat::Webp => Some(FileExtension::WEBP),
            SaveFormat::Tiff => Some(FileExtension::TIFF),
            _ => None,
        }
    }
}

/// PNG compression as a 0–9 level, mapped onto the encoder's presets.
fn png_compression(level: u8) -> png::Compression {
    match level {
        0..=2 => png::Compression::Fast,
        3..=6 => png::Compression::Default,
        _ => png::Compression::Best,
    }
}

#[derive(Clone, Debug)]
pub struct SaveOptions<'a> {
    pub format: SaveFormat,
    /// JPEG quality (1–100). Ignored by lossless encoders.
    pub quality: u8,
    /// PNG compression level (0–9).
    pub png_level: u8,
    /// Copy EXIF from this file into the output when the format allows it.
    pub exif_from: Option<&'a Path>,
}

impl<'a> SaveOptions<'a> {
    pub fn new(format: SaveFormat, quality: u8) -> Self {
        Self {
            format,
            quality: quality.clamp(1, 100),
            png_level: 6,
            exif_from: None,
        }
    }

    pub fn with_png_level(mut self, level: u8) -> Self {
        self.png_level = level.min(9);
        self
    }

    pub fn with_exif_from(mut self, source: Option<&'a Path>) -> Self {
        self.exif_from = source;
        self
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Composite onto an opaque background color, dropping alpha.
pub fn flatten_onto(image: &RgbaImage, background: [u8; 3]) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        let a = p[3] as u32;
        let inv = 255 - a;
        let mix = |c: u8, bg: u8| ((c as u32 * a + bg as u32 * inv + 127) / 255) as u8;
        Rgb([mix(p[0], background[0]), mix(p[1], background[1]), mix(p[2], background[2])])
    })
}

pub fn is_opaque(image: &RgbaImage) -> bool {
    image.pixels().all(|p| p[3] == 255)
}

/// Encode to an in-memory file. PDF output goes through [`write_pdf`].
pub fn encode(image: &RgbaImage, opts: &SaveOptions) -> Result<Vec<u8>> {
    let (w, h) = image.dimensions();
    let mut buf: Vec<u8> = Vec::new();

    match opts.format {
        SaveFormat::Jpeg => {
            let rgb = flatten_onto(image, [255, 255, 255]);
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, opts.quality);
            encoder.encode(rgb.as_raw(), w, h, ColorType::Rgb8)?;
        }
        SaveFormat::Png => {
            let opaque = is_opaque(image);
            let mut encoder = png::Encoder::new(&mut buf, w, h);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_compression(png_compression(opts.png_level));
            let data: Cow<[u8]> = if opaque {
                encoder.set_color(png::ColorType::Rgb);
                Cow::Owned(DynamicImage::ImageRgba8(image.clone()).to_rgb8().into_raw())
            } else {
                encoder.set_color(png::ColorType::Rgba);
                Cow::Borrowed(image.as_raw())
            };
            let png_err = |e: png::EncodingError| Error::UnsupportedFormat(format!("PNG encode: {}", e));
            let mut writer = encoder.write_header().map_err(png_err)?;
            writer.write_image_data(&data).map_err(png_err)?;
            writer.finish().map_err(png_err)?;
        }
        SaveFormat::Webp => {
            DynamicImage::ImageRgba8(image.clone())
                .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::WebP)?;
        }
        SaveFormat::Bmp => {
            let rgb = flatten_onto(image, [255, 255, 255]);
            let mut encoder = BmpEncoder::new(&mut buf);
            encoder.encode(rgb.as_raw(), w, h, ColorType::Rgb8)?;
        }
        SaveFormat::Tiff => {
            let tiff_err = |e: tiff::TiffError| Error::UnsupportedFormat(format!("TIFF encode: {}", e));
            let mut cursor = Cursor::new(&mut buf);
            let mut tiff_enc = tiff::encoder::TiffEncoder::new(&mut cursor).map_err(tiff_err)?;
            if is_opaque(image) {
                let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
                tiff_enc
                    .write_image_with_compression::<tiff::encoder::colortype::RGB8, _>(
                        w,
                        h,
                        tiff::encoder::compression::Lzw,
                        rgb.as_raw(),
                    )
                    .map_err(tiff_err)?;
            } else {
                tiff_enc
                    .write_image_with_compression::<tiff::encoder::colortype::RGBA8, _>(
                        w,
                        h,
                        tiff::encoder::compression::Lzw,
                        image.as_raw(),
                    )
                    .map_err(tiff_err)?;
            }
        }
        SaveFormat::Gif => {
            let frame = GifFrame { image: image.clone(), delay_ms: 0 };
            encode_gif(&mut buf, std::slice::from_ref(&frame), 256, false)?;
        }
        SaveFormat::Pdf => {
            let rgb = flatten_onto(image, [255, 255, 255]);
            buf = write_pdf("image", std::slice::from_ref(&rgb))?;
        }
        SaveFormat::Avif => {
            return Err(Error::UnsupportedFormat(
                "AVIF encoding is not available in this build".to_string(),
            ));
        }
    }

    if let Some(source) = opts.exif_from {
        forward_exif(source, &mut buf, opts.format);
    }
    Ok(buf)
}

/// Copy EXIF from `source` into an encoded buffer. Failures only warn; the
/// image is still saved without metadata.
fn forward_exif(source: &Path, bytes: &mut Vec<u8>, format: SaveFormat) {
    let Some(container) = format.exif_container() else {
        tracing::debug!(?format, "format cannot carry EXIF, skipping");
        return;
    };
    let source_is_tiff = matches!(SaveFormat::from_path(source), Some(SaveFormat::Tiff));
    if source_is_tiff {
        // TIFF tag layout does not round-trip through little_exif reliably.
        return;
    }
    let metadata = match Metadata::new_from_path(source) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(source = %source.display(), "could not read EXIF: {}", e);
            return;
        }
    };
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        metadata.write_to_vec(bytes, container)
    }));
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("failed to write EXIF: {}", e),
        Err(_) => tracing::error!("EXIF writer panicked; saving without metadata"),
    }
}

/// Encode and write to an explicit path, replacing whatever is there.
pub fn write_image(image: &RgbaImage, path: &Path, opts: &SaveOptions) -> Result<()> {
    let bytes = encode(image, opts)?;
    std::fs::write(path, bytes).map_err(|e| Error::save(path, e))
}

/// Reserve a collision-free name next to `source` and write the image there.
pub fn save_next_to(
    image: &RgbaImage,
    source: &Path,
    namer: &OutputNamer,
    opts: &SaveOptions,
) -> Result<PathBuf> {
    let bytes = encode(image, opts)?;
    write_reserved(source, namer, &bytes)
}

/// Write pre-encoded bytes into a freshly reserved output path.
pub fn write_reserved(source: &Path, namer: &OutputNamer, bytes: &[u8]) -> Result<PathBuf> {
    let reservation = namer.reserve(source)?;
    std::fs::write(reservation.path(), bytes).map_err(|e| Error::save(reservation.path(), e))?;
    let path = reservation.commit();
    tracing::info!(output = %path.display(), bytes = bytes.len(), "saved");
    Ok(path)
}

/// Save format for a single-image tool: the source's own format when it is
/// writable, else PNG.
pub fn format_for_source(source: &Path) -> SaveFormat {
    match SaveFormat::from_path(source) {
        Some(SaveFormat::Avif) | Some(SaveFormat::Pdf) | None => SaveFormat::Png,
        Some(f) => f,
    }
}

// ============================================================================
// GIF frames
// ============================================================================

#[derive(Debug, Clone)]
pub struct GifFrame {
    pub image: RgbaImage,
    pub delay_ms: u32,
}

/// Decode every frame of a GIF, composited according to its disposal
/// methods so each frame is a complete picture.
pub fn decode_gif_frames(path: &Path) -> Result<Vec<GifFrame>> {
    let file = File::open(path)?;
    let gif_err = |e: gif::DecodingError| Error::Load {
        path: path.to_path_buf(),
        source: image::ImageError::IoError(std::io::Error::other(e.to_string())),
    };
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = options.read_info(BufReader::new(file)).map_err(gif_err)?;

    let width = decoder.width() as u32;
    let height = decoder.height() as u32;

    let mut frames = Vec::new();
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    let mut prev_canvas = canvas.clone();

    while let Some(frame) = decoder.read_next_frame().map_err(gif_err)? {
        let (fx0, fy0) = (frame.left as u32, frame.top as u32);
        let (fw, fh) = (frame.width as u32, frame.height as u32);
        let delay_ms = match frame.delay as u32 * 10 {
            0 => DEFAULT_FRAME_DELAY_MS,
            d => d,
        };
        let disposal = frame.dispose;

        if disposal == gif::DisposalMethod::Previous {
            prev_canvas = canvas.clone();
        }

        for fy in 0..fh {
            for fx in 0..fw {
                let (cx, cy) = (fx0 + fx, fy0 + fy);
                if cx >= width || cy >= height {
                    continue;
                }
                let idx = ((fy * fw + fx) * 4) as usize;
                if let Some(px) = frame.buffer.get(idx..idx + 4)
                    && px[3] > 0
                {
                    canvas.put_pixel(cx, cy, Rgba([px[0], px[1], px[2], px[3]]));
                }
            }
        }

        frames.push(GifFrame { image: canvas.clone(), delay_ms });

        match disposal {
            gif::DisposalMethod::Background => {
                for fy in 0..fh {
                    for fx in 0..fw {
                        let (cx, cy) = (fx0 + fx, fy0 + fy);
                        if cx < width && cy < height {
                            canvas.put_pixel(cx, cy, Rgba([0, 0, 0, 0]));
                        }
                    }
                }
            }
            gif::DisposalMethod::Previous => canvas = prev_canvas.clone(),
            _ => {}
        }
    }

    if frames.is_empty() {
        return Err(Error::Process(crate::error::ProcessError::Empty(
            "GIF contains no frames".to_string(),
        )));
    }
    Ok(frames)
}

/// Encode frames as a looping GIF with per-frame local palettes.
/// `max_colors` is clamped to 2–256. Delays are rounded to centiseconds.
pub fn encode_gif<W: std::io::Write>(
    writer: W,
    frames: &[GifFrame],
    max_colors: usize,
    animated: bool,
) -> Result<()> {
    let Some(first) = frames.first() else {
        return Err(Error::Process(crate::error::ProcessError::Empty(
            "no frames to encode".to_string(),
        )));
    };
    let (w, h) = first.image.dimensions();
    if w > u16::MAX as u32 || h > u16::MAX as u32 {
        return Err(Error::parameter("image dimensions exceed GIF maximum (65535x65535)"));
    }
    let gif_err = |e: gif::EncodingError| Error::UnsupportedFormat(format!("GIF encode: {}", e));
    let colors = max_colors.clamp(2, 256);

    let mut encoder = gif::Encoder::new(writer, w as u16, h as u16, &[]).map_err(gif_err)?;
    if animated {
        encoder.set_repeat(gif::Repeat::Infinite).map_err(gif_err)?;
    }

    for frame in frames {
        let (palette, indices, transparent) = quantize_rgba(&frame.image, colors);
        let gif_frame = gif::Frame {
            width: w as u16,
            height: h as u16,
            delay: ((frame.delay_ms + 5) / 10).min(u16::MAX as u32) as u16,
            dispose: gif::DisposalMethod::Background,
            transparent,
            palette: Some(palette),
            buffer: Cow::Owned(indices),
            ..Default::default()
        };
        encoder.write_frame(&gif_frame).map_err(gif_err)?;
    }
    Ok(())
}

/// Quantize an RGBA image to indexed color with NeuQuant.
/// Returns `(flat RGB palette, indices, transparent index)`.
fn quantize_rgba(image: &RgbaImage, max_colors: usize) -> (Vec<u8>, Vec<u8>, Option<u8>) {
    let nq = color_quant::NeuQuant::new(10, max_colors, image.as_raw());

    let mut palette = Vec::with_capacity(max_colors * 3);
    let mut alpha_zero: Option<u8> = None;
    for i in 0..max_colors {
        match nq.lookup(i) {
            Some(color) => {
                palette.extend_from_slice(&color[..3]);
                if color[3] == 0 && alpha_zero.is_none() {
                    alpha_zero = Some(i as u8);
                }
            }
            None => palette.extend_from_slice(&[0, 0, 0]),
        }
    }

    let has_transparency = image.pixels().any(|p| p[3] == 0);
    let indices = image
        .pixels()
        .map(|p| nq.index_of(&[p[0], p[1], p[2], p[3]]) as u8)
        .collect();

    (palette, indices, alpha_zero.filter(|_| has_transparency))
}

// ============================================================================
// PDF
// ============================================================================

/// Build a PDF with one page per image, each page sized to its image at
/// 72 dpi.
pub fn write_pdf(title: &str, pages: &[RgbImage]) -> Result<Vec<u8>> {
    use printpdf::{
        Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
        RawImageFormat, XObjectTransform,
    };

    if pages.is_empty() {
        return Err(Error::Process(crate::error::ProcessError::Empty(
            "no pages for PDF".to_string(),
        )));
    }

    const DPI: f32 = 72.0;
    const MM_PER_INCH: f32 = 25.4;

    let mut doc = PdfDocument::new(title);
    let mut pdf_pages = Vec::with_capacity(pages.len());
    for page in pages {
        let (w, h) = page.dimensions();
        let raw = RawImage {
            pixels: RawImageData::U8(page.as_raw().clone()),
            width: w as usize,
            height: h as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };
        let id = doc.add_image(&raw);
        let ops = vec![Op::UseXobject {
            id,
            transform: XObjectTransform {
                translate_x: Some(Pt(0.0)),
                translate_y: Some(Pt(0.0)),
                scale_x: Some(1.0),
                scale_y: Some(1.0),
                dpi: Some(DPI),
                rotate: None,
            },
        }];
        let page_w = Mm(w as f32 / DPI * MM_PER_INCH);
        let page_h = Mm(h as f32 / DPI * MM_PER_INCH);
        pdf_pages.push(PdfPage::new(page_w, page_h, ops));
    }
    doc.with_pages(pdf_pages);

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        tracing::debug!(count = warnings.len(), "PDF writer reported warnings");
    }
    Ok(bytes)
}
