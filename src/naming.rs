// ============================================================================
// OUTPUT NAMER - collision-free destination paths for every tool
// ============================================================================
//
//   photo.jpg          + "_cropped"  → photo_cropped01.jpg, photo_cropped02.jpg …
//   photo_cropped01.jpg + "_cropped" → photo_cropped02.jpg  (token is stripped first)
//   photo.png          + ".converted" → photo.converted1.webp
//
// `reserve()` creates the chosen file with `create_new`, so a name handed out
// once can never be handed out again, even across rapid successive saves.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Upper bound on counter probing before giving up.
const MAX_COUNTER: u32 = 100_000;

/// How the counter is rendered after the suffix token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CounterStyle {
    /// `01`, `02`, … `99`, `100`
    ZeroPadded,
    /// `1`, `2`, …
    Plain,
    /// `_1`, `_2`, …
    Separated,
    /// bare name first, then `_1`, `_2`, …
    FirstBare,
}

impl CounterStyle {
    fn first(self) -> u32 {
        match self {
            CounterStyle::FirstBare => 0,
            _ => 1,
        }
    }

    fn render(self, n: u32) -> String {
        match self {
            CounterStyle::ZeroPadded => format!("{:02}", n),
            CounterStyle::Plain => n.to_string(),
            CounterStyle::Separated => format!("_{}", n),
            CounterStyle::FirstBare if n == 0 => String::new(),
            CounterStyle::FirstBare => format!("_{}", n),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputNamer {
    token: String,
    style: CounterStyle,
    /// Forced extension (without dot), e.g. `png` for the color remover.
    extension: Option<String>,
    /// Extension used only when the source has none.
    fallback_extension: Option<String>,
    destination: Option<PathBuf>,
}

impl OutputNamer {
    pub fn new(token: impl Into<String>, style: CounterStyle) -> Self {
        Self {
            token: token.into(),
            style,
            extension: None,
            fallback_extension: None,
            destination: None,
        }
    }

    pub fn with_extension(mut self, ext: impl Into<String>) -> Self {
        self.extension = Some(ext.into().trim_start_matches('.').to_string());
        self
    }

    pub fn with_fallback_extension(mut self, ext: impl Into<String>) -> Self {
        self.fallback_extension = Some(ext.into().trim_start_matches('.').to_string());
        self
    }

    /// Write into `dir` instead of the source's own directory.
    pub fn with_destination(mut self, dir: Option<PathBuf>) -> Self {
        self.destination = dir;
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// The source stem with any previous token (and everything after it)
    /// removed.
    pub fn base_stem(&self, source: &Path) -> String {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !self.token.is_empty()
            && let Some(idx) = stem.find(&self.token)
        {
            return stem[..idx].to_string();
        }
        stem
    }

    fn extension_for(&self, source: &Path) -> Option<String> {
        self.extension
            .clone()
            .or_else(|| {
                source
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
            })
            .or_else(|| self.fallback_extension.clone())
    }

    fn directory_for(&self, source: &Path) -> PathBuf {
        match &self.destination {
            Some(dir) => dir.clone(),
            None => source
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    /// The `n`th candidate path, whether or not it exists.
    pub fn candidate(&self, source: &Path, n: u32) -> PathBuf {
        let mut name = format!(
            "{}{}{}",
            self.base_stem(source),
            self.token,
            self.style.render(n)
        );
        if let Some(ext) = self.extension_for(source) {
            name.push('.');
            name.push_str(&ext);
        }
        self.directory_for(source).join(name)
    }

    /// First candidate that does not exist right now. Does not claim it.
    pub fn next_free(&self, source: &Path) -> Result<PathBuf> {
        for n in self.style.first()..=MAX_COUNTER {
            let path = self.candidate(source, n);
            if !path.exists() {
                return Ok(path);
            }
        }
        Err(self.exhausted(source))
    }

    /// Claim the first free candidate by creating it empty. The returned
    /// reservation deletes the placeholder again unless it is committed.
    pub fn reserve(&self, source: &Path) -> Result<Reservation> {
        let dir = self.directory_for(source);
        if self.destination.is_some() {
            fs::create_dir_all(&dir)?;
        }
        for n in self.style.first()..=MAX_COUNTER {
            let path = self.candidate(source, n);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Reservation { path, committed: false }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(Error::save(&path, e)),
            }
        }
        Err(self.exhausted(source))
    }

    fn exhausted(&self, source: &Path) -> Error {
        Error::save(
            self.candidate(source, MAX_COUNTER),
            "no free file name left for this suffix",
        )
    }
}

/// A placeholder file created by [`OutputNamer::reserve`].
#[derive(Debug)]
pub struct Reservation {
    path: PathBuf,
    committed: bool,
}

impl Reservation {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the file; the caller has written its content.
    pub fn commit(mut self) -> PathBuf {
        self.committed = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}
