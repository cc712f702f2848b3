// ============================================================================
// PIXEL OPERATIONS - pure functions over RGBA8 buffers
// ============================================================================
//
//   transform.rs     - flip / rotate / resize / crop, Rect
//   adjustments.rs   - per-pixel color stages (hue, brightness, sepia, ...)
//   filters.rs       - Gaussian blur, smooth, sharpen
//   effects.rs       - pixelate, vignette, masks, compositing
//   color_removal.rs - color-to-transparent
//   clipboard.rs     - system clipboard (arboard)
//   text.rs          - font lookup and text rasterization
// ============================================================================

pub mod adjustments;
pub mod clipboard;
pub mod color_removal;
pub mod effects;
pub mod filters;
pub mod text;
pub mod transform;
