// ============================================================================
// OCR - run the external tesseract engine and tidy its output
// ============================================================================

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::io;
use crate::naming::{CounterStyle, OutputNamer};

static PARAGRAPH_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{2,}").expect("static pattern"));
static SPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").expect("static pattern"));

/// Languages offered by default; the engine accepts any code it has data for.
pub const LANGUAGES: &[(&str, &str)] = &[("English", "eng"), ("Turkish", "tur")];

/// Re-flow engine output: single line breaks become spaces, blank lines stay
/// as paragraph breaks, runs of blanks collapse, edges are trimmed.
pub fn clean_text(raw: &str) -> String {
    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
    PARAGRAPH_BREAK
        .split(&normalized)
        .map(|para| SPACE_RUN.replace_all(&para.replace('\n', " "), " ").trim().to_string())
        .filter(|para| !para.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OcrEngine {
    binary: PathBuf,
    language: String,
}

impl OcrEngine {
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self { binary: binary.into(), language: language.into() }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.tesseract_bin, &settings.ocr_language)
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn failure(&self, detail: impl Into<String>) -> Error {
        Error::ExternalTool {
            tool: self.binary.display().to_string(),
            detail: detail.into(),
        }
    }

    /// Raw engine output for `image`, produced in a scratch directory.
    pub fn recognize_raw(&self, image: &Path) -> Result<String> {
        let scratch = tempfile::tempdir()?;
        let base = scratch.path().join("out");
        tracing::info!(image = %image.display(), lang = %self.language, "running OCR");
        let output = Command::new(&self.binary)
            .arg(image)
            .arg(&base)
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| self.failure(format!("could not start: {}", e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(format!("{} ({})", stderr.trim(), output.status)));
        }
        std::fs::read_to_string(base.with_extension("txt"))
            .map_err(|e| self.failure(format!("no text output: {}", e)))
    }

    /// Recognised text after [`clean_text`].
    pub fn recognize(&self, image: &Path) -> Result<String> {
        let text = clean_text(&self.recognize_raw(image)?);
        tracing::debug!(chars = text.len(), "OCR finished");
        Ok(text)
    }
}

/// Write the text next to the image as `{stem}_ocr.txt` (then `_ocr_1.txt`, …).
pub fn save_text(text: &str, source: &Path) -> Result<PathBuf> {
    let namer = OutputNamer::new("_ocr", CounterStyle::FirstBare).with_extension("txt");
    io::write_reserved(source, &namer, text.as_bytes())
}
