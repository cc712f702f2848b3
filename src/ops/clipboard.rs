use image::RgbaImage;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
//  System clipboard helpers (OS-level copy/paste via arboard)
// ---------------------------------------------------------------------------

fn clipboard_error(e: arboard::Error) -> Error {
    Error::ExternalTool { tool: "clipboard".to_string(), detail: e.to_string() }
}

/// Put plain text (a color code, recognised text) on the system clipboard.
pub fn copy_text(text: &str) -> Result<()> {
    let mut clip = arboard::Clipboard::new().map_err(clipboard_error)?;
    clip.set_text(text.to_string()).map_err(clipboard_error)
}

/// Try to read an image from the system clipboard. Handles raw image data
/// (e.g. a screenshot) and text that is a path to an image file.
pub fn image_from_clipboard() -> Option<RgbaImage> {
    let mut clip = arboard::Clipboard::new().ok()?;
    if let Ok(data) = clip.get_image()
        && let Some(img) = RgbaImage::from_raw(data.width as u32, data.height as u32, data.bytes.into_owned())
    {
        return Some(img);
    }
    let text = clip.get_text().ok()?;
    let path = std::path::Path::new(text.trim());
    if path.is_file() {
        return image::open(path).ok().map(|img| img.to_rgba8());
    }
    None
}
