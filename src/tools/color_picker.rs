use std::collections::VecDeque;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

use image::RgbaImage;

use crate::config::Settings;
use crate::error::{Error, Result};

/// Default number of remembered picks.
pub const HISTORY_LEN: usize = 24;

/// A screenshot command that writes a full-screen PNG. `{out}` in an
/// argument is replaced by the output path; without one the path is
/// appended as the last argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScreenGrabber {
    pub program: String,
    pub args: Vec<String>,
}

impl ScreenGrabber {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Candidates for this platform, in the order they are tried.
    pub fn platform_defaults() -> Vec<Self> {
        #[cfg(target_os = "macos")]
        {
            vec![Self::new("screencapture", &["-x"])]
        }
        #[cfg(target_os = "windows")]
        {
            vec![Self::new(
                "powershell",
                &[
                    "-NoProfile",
                    "-Command",
                    "Add-Type -AssemblyName System.Windows.Forms; Add-Type -AssemblyName System.Drawing; \
                     $b = [System.Windows.Forms.SystemInformation]::VirtualScreen; \
                     $bmp = New-Object Drawing.Bitmap($b.Width, $b.Height); \
                     [Drawing.Graphics]::FromImage($bmp).CopyFromScreen($b.Location, [Drawing.Point]::Empty, $b.Size); \
                     $bmp.Save('{out}')",
                ],
            )]
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            let mut list = vec![Self::new("scrot", &["--overwrite"]), Self::new("import", &["-window", "root"])];
            if std::env::var_os("WAYLAND_DISPLAY").is_some() {
                list.insert(0, Self::new("grim", &[]));
            }
            list
        }
    }

    fn command(&self, out: &Path) -> Command {
        let out_str = out.to_string_lossy();
        let mut cmd = Command::new(&self.program);
        let mut placed = false;
        for arg in &self.args {
            if arg.contains("{out}") {
                placed = true;
                cmd.arg(arg.replace("{out}", &out_str));
            } else {
                cmd.arg(arg);
            }
        }
        if !placed {
            cmd.arg(out);
        }
        cmd
    }

    fn failure(&self, detail: String) -> Error {
        Error::ExternalTool { tool: self.program.clone(), detail }
    }
}

/// Full-screen snapshot. Each platform candidate is tried in turn; one that
/// is not installed is skipped.
pub fn capture_screen() -> Result<RgbaImage> {
    capture_with(&ScreenGrabber::platform_defaults())
}

pub fn capture_with(grabbers: &[ScreenGrabber]) -> Result<RgbaImage> {
    let scratch = tempfile::tempdir()?;
    let out = scratch.path().join("screen.png");
    let mut last = None;
    for grabber in grabbers {
        let status = match grabber.command(&out).status() {
            Ok(status) => status,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(tool = %grabber.program, "screen grabber not installed");
                last = Some(grabber.failure("not installed".to_string()));
                continue;
            }
            Err(e) => return Err(grabber.failure(format!("could not start: {}", e))),
        };
        if !status.success() {
            tracing::warn!(tool = %grabber.program, %status, "screen capture failed");
            last = Some(grabber.failure(format!("exited with {}", status)));
            continue;
        }
        let img = image::open(&out)
            .map_err(|source| Error::Load { path: out.clone(), source })?
            .into_rgba8();
        tracing::info!(tool = %grabber.program, width = img.width(), height = img.height(), "screen captured");
        return Ok(img);
    }
    Err(last.unwrap_or_else(|| Error::ExternalTool {
        tool: "screenshot".to_string(),
        detail: "no screen capture command for this platform".to_string(),
    }))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PickedColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl PickedColor {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#RRGGBB`, uppercase.
    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// `rgb(r, g, b)`
    pub fn rgb(&self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }

    pub fn parse_hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix('#').unwrap_or(s);
        if s.len() != 6 || !s.is_ascii() {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).ok();
        Some(Self::new(byte(0)?, byte(2)?, byte(4)?))
    }
}

impl fmt::Display for PickedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

/// Color under `(x, y)` of a snapshot. Alpha is ignored.
pub fn pick(snapshot: &RgbaImage, x: u32, y: u32) -> Option<PickedColor> {
    snapshot
        .get_pixel_checked(x, y)
        .map(|p| PickedColor::new(p[0], p[1], p[2]))
}

/// Most-recent-first list of picks with a fixed length.
#[derive(Clone, Debug)]
pub struct ColorHistory {
    entries: VecDeque<PickedColor>,
    capacity: usize,
}

impl Default for ColorHistory {
    fn default() -> Self {
        Self::new(HISTORY_LEN)
    }
}

impl ColorHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { entries: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.color_history)
    }

    /// Insert at the front, shifting older picks back. Re-picking the most
    /// recent color changes nothing.
    pub fn push(&mut self, color: PickedColor) -> bool {
        if self.entries.front() == Some(&color) {
            return false;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(color);
        true
    }

    pub fn latest(&self) -> Option<PickedColor> {
        self.entries.front().copied()
    }

    pub fn get(&self, index: usize) -> Option<PickedColor> {
        self.entries.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PickedColor> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A snapshot to click on plus the picks made so far.
pub struct ColorPicker {
    snapshot: RgbaImage,
    history: ColorHistory,
}

impl ColorPicker {
    pub fn new(snapshot: RgbaImage, settings: &Settings) -> Self {
        Self { snapshot, history: ColorHistory::from_settings(settings) }
    }

    /// Sample `(x, y)` and record it.
    pub fn click(&mut self, x: u32, y: u32) -> Result<PickedColor> {
        let color = pick(&self.snapshot, x, y).ok_or_else(|| {
            Error::geometry(format!(
                "({}, {}) is outside the {}x{} snapshot",
                x,
                y,
                self.snapshot.width(),
                self.snapshot.height()
            ))
        })?;
        self.history.push(color);
        Ok(color)
    }

    pub fn history(&self) -> &ColorHistory {
        &self.history
    }
}
