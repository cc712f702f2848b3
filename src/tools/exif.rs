// ============================================================================
// EXIF - list embedded metadata, or re-encode the pixels without it
// ============================================================================

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::error::Result;
use crate::io::{self, SaveOptions, SourceImage};
use crate::naming::{CounterStyle, OutputNamer};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExifEntry {
    pub tag: String,
    pub value: String,
}

pub fn namer() -> OutputNamer {
    OutputNamer::new("_exif_cleaned", CounterStyle::ZeroPadded)
}

/// Every EXIF field of `path` as display strings, in file order. A readable
/// file without metadata gives an empty list.
pub fn read_entries(path: &Path) -> Result<Vec<ExifEntry>> {
    let mut reader = BufReader::new(File::open(path)?);
    let exif = match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(e) => {
            tracing::debug!(path = %path.display(), "no EXIF: {}", e);
            return Ok(Vec::new());
        }
    };
    Ok(exif
        .fields()
        .map(|f| ExifEntry {
            tag: f.tag.to_string(),
            value: f.display_value().with_unit(&exif).to_string(),
        })
        .collect())
}

/// Write a metadata-free copy next to `path`.
pub fn clean(path: &Path, settings: &Settings) -> Result<PathBuf> {
    let source = SourceImage::open(path)?;
    let format = io::format_for_source(path);
    let opts = SaveOptions::new(format, settings.jpeg_quality);
    let out = io::save_next_to(&source.pixels, path, &namer(), &opts)?;
    tracing::info!(removed = source.exif.is_some(), output = %out.display(), "EXIF cleaned");
    Ok(out)
}
