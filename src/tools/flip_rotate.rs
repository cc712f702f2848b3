use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::io;
use crate::naming::{CounterStyle, OutputNamer};
use crate::ops::transform::Transpose;
use crate::tool::EditSession;

pub fn namer() -> OutputNamer {
    OutputNamer::new("_modified", CounterStyle::ZeroPadded)
}

/// Flip/rotate steps compose on the working image; each one can be undone.
pub struct FlipRotateEditor {
    session: EditSession,
}

impl FlipRotateEditor {
    pub fn open(path: &Path, settings: Settings) -> Result<Self> {
        Ok(Self { session: EditSession::open(path, settings)? })
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn apply(&mut self, step: Transpose) -> Result<()> {
        tracing::debug!(step = step.label(), "flip/rotate");
        self.session.apply(|img| Ok(Some(step.apply(img))))?;
        Ok(())
    }

    pub fn undo(&mut self) -> bool {
        self.session.undo()
    }

    pub fn save(&self) -> Result<PathBuf> {
        let format = io::format_for_source(&self.session.source().path);
        self.session.save(&namer(), format)
    }
}

/// Parse a step name as accepted on the command line.
pub fn parse_step(name: &str) -> Result<Transpose> {
    match name.to_ascii_lowercase().as_str() {
        "h" | "flip-h" | "horizontal" => Ok(Transpose::FlipHorizontal),
        "v" | "flip-v" | "vertical" => Ok(Transpose::FlipVertical),
        "cw" | "rotate-cw" => Ok(Transpose::RotateCw),
        "ccw" | "rotate-ccw" => Ok(Transpose::RotateCcw),
        other => Err(Error::parameter(format!(
            "unknown step '{}': use h, v, cw or ccw",
            other
        ))),
    }
}

/// Apply `steps` in order and save once.
pub fn apply_steps(path: &Path, steps: &[Transpose], settings: &Settings) -> Result<PathBuf> {
    let mut editor = FlipRotateEditor::open(path, settings.clone())?;
    for &step in steps {
        editor.apply(step)?;
    }
    editor.save()
}
