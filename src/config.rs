// ============================================================================
// SETTINGS - tool defaults and the display theme, read once and passed down
// ============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Colors used when a preview is letterboxed into a display area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub window: [u8; 3],
    pub base: [u8; 3],
    pub button: [u8; 3],
    pub text: [u8; 3],
    pub highlight: [u8; 3],
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            window: [40, 40, 40],
            base: [30, 30, 30],
            button: [55, 55, 55],
            text: [255, 255, 255],
            highlight: [42, 130, 218],
        }
    }
}

/// Defaults shared by every tool. Unknown keys in the file are ignored and
/// missing keys fall back to [`Settings::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Forward the source EXIF blob into saved files when the format allows it.
    pub keep_exif: bool,
    /// JPEG quality for single-image tools (crop, adjust, censor...).
    pub jpeg_quality: u8,
    /// Default quality for the batch converter.
    pub convert_quality: u8,
    /// Linear proxy divisor for most tools (1/4).
    pub proxy_divisor: u32,
    /// Proxy divisor for the photo-sheet tool (1/5).
    pub sheet_proxy_divisor: u32,
    pub debounce_ms: u64,
    pub undo_depth: usize,
    pub color_history: usize,
    pub font_family: String,
    pub tesseract_bin: String,
    pub ocr_language: String,
    pub theme: Theme,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            keep_exif: true,
            jpeg_quality: 95,
            convert_quality: 85,
            proxy_divisor: 4,
            sheet_proxy_divisor: 5,
            debounce_ms: 50,
            undo_depth: 10,
            color_history: 24,
            font_family: "sans-serif".to_string(),
            tesseract_bin: "tesseract".to_string(),
            ocr_language: "eng".to_string(),
            theme: Theme::default(),
        }
    }
}

impl Settings {
    /// Platform location of `settings.json`.
    ///
    /// On Linux:   $XDG_CONFIG_HOME/QFastTools/settings.json (or ~/.config/...)
    /// On Windows: %APPDATA%\QFastTools\settings.json
    /// On macOS:   ~/Library/Application Support/QFastTools/settings.json
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(PathBuf::from(appdata).join("QFastTools").join("settings.json"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("QFastTools")
                    .join("settings.json"),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?;
            Some(config_dir.join("QFastTools").join("settings.json"))
        }
    }

    /// Load settings from an explicit file, or from [`Settings::settings_path`]
    /// when `explicit` is `None`. A missing default file yields defaults; a
    /// missing explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::settings_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json(content: &str) -> std::result::Result<Self, serde_json::Error> {
        let mut settings: Settings = serde_json::from_str(content)?;
        settings.sanitize();
        Ok(settings)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Clamp values a hand-edited file could push out of range.
    fn sanitize(&mut self) {
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        self.convert_quality = self.convert_quality.clamp(1, 100);
        self.proxy_divisor = self.proxy_divisor.max(1);
        self.sheet_proxy_divisor = self.sheet_proxy_divisor.max(1);
        self.undo_depth = self.undo_depth.max(1);
        self.color_history = self.color_history.max(1);
    }
}
