// ============================================================================
// GIF OPTIMIZER - drop frames, rescale, reduce palette, retime
// ============================================================================

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{Error, ProcessError, Result};
use crate::io::{self, GifFrame};
use crate::naming::{CounterStyle, OutputNamer};
use crate::ops::adjustments;
use crate::ops::transform::{self, Interpolation};

/// Shortest delay written to the output.
pub const MIN_FRAME_DELAY_MS: u32 = 20;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GifOptions {
    /// 10..=100
    pub scale_percent: u32,
    /// 2..=256
    pub colors: u32,
    /// Keep frames where `index % skip == 0`; 1 keeps all. 1..=10.
    pub skip: u32,
    /// Playback speed multiplier, 0.5..=3.0.
    pub speed: f32,
    pub grayscale: bool,
}

impl Default for GifOptions {
    fn default() -> Self {
        Self {
            scale_percent: 100,
            colors: 256,
            skip: 1,
            speed: 1.0,
            grayscale: false,
        }
    }
}

impl GifOptions {
    fn clamped(self) -> Self {
        Self {
            scale_percent: self.scale_percent.clamp(10, 100),
            colors: self.colors.clamp(2, 256),
            skip: self.skip.clamp(1, 10),
            speed: if self.speed.is_finite() { self.speed.clamp(0.5, 3.0) } else { 1.0 },
            grayscale: self.grayscale,
        }
    }
}

/// Output delay for a kept frame: the dropped neighbours' time is folded in,
/// then the speed factor applies.
pub fn frame_delay(delay_ms: u32, skip: u32, speed: f32) -> u32 {
    let d = (delay_ms as f64 * skip as f64 / speed as f64) as u32;
    d.max(MIN_FRAME_DELAY_MS)
}

pub fn namer() -> OutputNamer {
    OutputNamer::new("_optimized", CounterStyle::Separated).with_extension("gif")
}

/// Apply skip, scale, grayscale and retiming to decoded frames.
pub fn optimize_frames(frames: &[GifFrame], opts: &GifOptions) -> Vec<GifFrame> {
    let opts = opts.clamped();
    frames
        .iter()
        .enumerate()
        .filter(|(i, _)| *i as u32 % opts.skip == 0)
        .map(|(_, frame)| {
            let mut image = frame.image.clone();
            if opts.scale_percent < 100 {
                let w = ((image.width() as u64 * opts.scale_percent as u64 / 100) as u32).max(1);
                let h = ((image.height() as u64 * opts.scale_percent as u64 / 100) as u32).max(1);
                image = transform::resize(&image, w, h, Interpolation::Lanczos3);
            }
            if opts.grayscale {
                image = adjustments::grayscale(&image);
            }
            GifFrame {
                image,
                delay_ms: frame_delay(frame.delay_ms, opts.skip, opts.speed),
            }
        })
        .collect()
}

/// Decode, optimize and write `{stem}_optimized_N.gif` next to `path`.
pub fn optimize(path: &Path, opts: &GifOptions) -> Result<PathBuf> {
    let frames = io::decode_gif_frames(path)?;
    let optimized = optimize_frames(&frames, opts);
    if optimized.is_empty() {
        return Err(Error::Process(ProcessError::Empty("no frames left after skipping".to_string())));
    }
    let mut bytes = Vec::new();
    io::encode_gif(&mut bytes, &optimized, opts.clamped().colors as usize, true)?;
    let out = io::write_reserved(path, &namer(), &bytes)?;
    tracing::info!(
        frames_in = frames.len(),
        frames_out = optimized.len(),
        bytes = bytes.len(),
        output = %out.display(),
        "GIF optimized"
    );
    Ok(out)
}

/// Summary shown before optimizing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GifInfo {
    pub width: u32,
    pub height: u32,
    pub frame_count: usize,
    /// Distinct colors of the first frame; `None` when above 256.
    pub color_count: Option<usize>,
    pub file_size: u64,
}

impl GifInfo {
    pub fn read(path: &Path) -> Result<Self> {
        let frames = io::decode_gif_frames(path)?;
        let file_size = std::fs::metadata(path)?.len();
        let Some(first) = frames.first().map(|f| &f.image) else {
            return Err(Error::Process(ProcessError::Empty("GIF has no frames".to_string())));
        };
        let mut colors = HashSet::new();
        for p in first.pixels() {
            colors.insert([p[0], p[1], p[2]]);
            if colors.len() > 256 {
                break;
            }
        }
        Ok(Self {
            width: first.width(),
            height: first.height(),
            frame_count: frames.len(),
            color_count: (colors.len() <= 256).then_some(colors.len()),
            file_size,
        })
    }

    pub fn size_mb(&self) -> f64 {
        self.file_size as f64 / (1024.0 * 1024.0)
    }
}
