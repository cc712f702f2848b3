// ============================================================================
// ERRORS - one enum for every user-triggered action (load, process, save, OCR)
// ============================================================================

use std::path::PathBuf;

use thiserror::Error;

/// Reasons a transform refuses its input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProcessError {
    /// Zero-area crop, selection outside the image, and the like.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("nothing to process: {0}")]
    Empty(String),

    #[error("not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("could not save {path}: {reason}")]
    Save { path: PathBuf, reason: String },

    #[error("{tool} failed: {detail}")]
    ExternalTool { tool: String, detail: String },

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("settings error: {0}")]
    Config(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn save(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::Save { path: path.into(), reason: reason.to_string() }
    }

    pub fn geometry(msg: impl Into<String>) -> Self {
        Error::Process(ProcessError::InvalidGeometry(msg.into()))
    }

    pub fn parameter(msg: impl Into<String>) -> Self {
        Error::Process(ProcessError::InvalidParameter(msg.into()))
    }
}
