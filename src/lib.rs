// ============================================================================
// QFastTools - single-purpose image utilities
// ============================================================================
//
// Layout:
//   error.rs    - crate error enum
//   config.rs   - Settings (tool defaults) and the Theme value
//   logger.rs   - session log + panic hook
//   io.rs       - load / proxy / encode / GIF + PDF codecs
//   naming.rs   - collision-free output paths
//   history.rs  - bounded undo rings
//   preview.rs  - display mapping + debounce timer
//   tool.rs     - ImageTool trait, ToolSession, EditSession
//   ops/        - pixel algorithms
//   tools/      - one module per utility
//   cli.rs      - `qfast` subcommands
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod io;
pub mod logger;
pub mod naming;
pub mod ops;
pub mod preview;
pub mod tool;
pub mod tools;

pub use error::{Error, ProcessError, Result};
