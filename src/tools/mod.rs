// ============================================================================
// TOOLS - parameter sets, pipelines and batch helpers, one per utility
// ============================================================================

pub mod add_text;
pub mod adjust;
pub mod censor;
pub mod color_picker;
pub mod color_removal;
pub mod convert;
pub mod crop;
pub mod exif;
pub mod flip_rotate;
pub mod gif_opt;
pub mod invert;
pub mod ocr;
pub mod qr;
pub mod resize;
pub mod sheet;
pub mod watermark;

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Outcome of a batch that keeps going past individual failures.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, Error)>,
}

impl BatchReport {
    pub fn record(&mut self, input: &Path, result: Result<PathBuf>) {
        match result {
            Ok(out) => self.written.push(out),
            Err(e) => {
                tracing::warn!(path = %input.display(), "skipped: {}", e);
                self.failed.push((input.to_path_buf(), e));
            }
        }
    }

    pub fn succeeded(&self) -> usize {
        self.written.len()
    }
}

/// Keep only paths whose extension (case-insensitive) is in `accepted`.
pub fn filter_by_extension(paths: &[PathBuf], accepted: &[&str]) -> Vec<PathBuf> {
    paths
        .iter()
        .filter(|p| has_extension(p, accepted))
        .cloned()
        .collect()
}

pub fn has_extension(path: &Path, accepted: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| accepted.iter().any(|a| a.eq_ignore_ascii_case(e)))
}
