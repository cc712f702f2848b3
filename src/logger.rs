//! Session logger - routes `tracing` events into a single file in the OS data
//! directory.
//!
//! The file is **truncated at each launch**, so it only ever holds output
//! from the most recent session.
//!
//! Log location:
//!   Windows:  `%APPDATA%\QFastTools\qfasttools.log`
//!   Linux:    `~/.local/share/QFastTools/qfasttools.log`
//!   macOS:    `~/Library/Application Support/QFastTools/qfasttools.log`
//!
//! The filter comes from `RUST_LOG` and defaults to `info`. Panics are
//! mirrored into the log before the default hook runs.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use tracing_subscriber::EnvFilter;

static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Returns the path to the current session log file.
pub fn log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

/// Initialise the session logger at the default location. Logging problems
/// are reported on stderr and never abort the program.
pub fn init() {
    init_at(&log_file_path());
}

/// Initialise the session logger writing to `path`.
///
/// * Creates (or truncates) the log file.
/// * Installs the global `tracing` subscriber (first call wins).
/// * Installs a panic hook that writes the panic message to the log.
pub fn init_at(path: &Path) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = match open_truncated(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            return;
        }
    };
    let _ = LOG_PATH.set(path.to_path_buf());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .is_ok();
    if !installed {
        return;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log = %path.display(),
        "QFastTools session started"
    );

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("PANIC: {}", info);
        prev(info);
    }));
}

fn open_truncated(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}

fn log_file_path() -> PathBuf {
    data_dir().join("QFastTools").join("qfasttools.log")
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support");
        }
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    // Last resort: current working directory
    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_truncates_previous_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("session.log");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "old session output\n").unwrap();

        init_at(&path);

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("old session output"));
    }
}
