//! Derivative filenames.
//!
//! A derivative lives next to its source and its name *is* the cache key:
//! there is no manifest, so the name must be a pure function of the source
//! name and the operation parameters, and two different requests must never
//! produce the same name.
//!
//! | Operation | Pattern | Example |
//! |---|---|---|
//! | Resize | `<base>-<w>x<h>-c-<anchor>.<ext>` | `photo-100x50-c-center.jpg` |
//! | Resize, no crop | `<base>-<w>x<h>-c-f.<ext>` | `photo-100x0-c-f.jpg` |
//! | Letterbox | `<base>-lbox-<w>x<h>-<rrggbb>.<ext>` | `photo-lbox-300x200-ff0000.png` |
//! | Letterbox, transparent | `<base>-lbox-<w>x<h>-trans.<ext>` | `photo-lbox-300x200-trans.png` |
//! | Retina | `<base>@<factor>x.<ext>` | `photo@2x.jpg`, `photo@1.5x.jpg` |
//!
//! Requested dimensions are embedded verbatim, so a zero (inferred) dimension
//! stays `0` in the name.

use crate::imaging::{CropAnchor, OperationParams, Rgb};
use std::path::Path;

/// A source filename split at its last dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceName {
    /// Filename without the extension (e.g. `photo` from `photo.jpg`).
    pub base: String,
    /// Extension as written, without the dot. Empty if there is none.
    pub ext: String,
}

/// Split the final path component into base name and extension.
///
/// Returns `None` when the path has no usable filename (`/`, `..`).
pub fn split_filename(path: &Path) -> Option<SourceName> {
    let base = path.file_stem()?.to_str()?.to_string();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_string();
    Some(SourceName { base, ext })
}

fn with_extension(stem: String, ext: &str) -> String {
    if ext.is_empty() {
        stem
    } else {
        format!("{stem}.{ext}")
    }
}

pub fn resize_filename(base: &str, ext: &str, width: u32, height: u32, anchor: CropAnchor) -> String {
    with_extension(
        format!("{base}-{width}x{height}-c-{}", anchor.filename_token()),
        ext,
    )
}

pub fn letterbox_filename(base: &str, ext: &str, width: u32, height: u32, color: Option<Rgb>) -> String {
    let color = color.map_or_else(|| "trans".to_string(), Rgb::to_hex);
    with_extension(format!("{base}-lbox-{width}x{height}-{color}"), ext)
}

/// `f64`'s `Display` prints `2.0` as `2` and `1.5` as `1.5`, which is exactly
/// the token we want.
pub fn retina_filename(base: &str, ext: &str, factor: f64) -> String {
    with_extension(format!("{base}@{factor}x"), ext)
}

/// Name of the derivative `params` produces from `base.ext`.
pub fn derivative_filename(base: &str, ext: &str, params: &OperationParams) -> String {
    match *params {
        OperationParams::Resize {
            width,
            height,
            anchor,
        } => resize_filename(base, ext, width, height, anchor),
        OperationParams::Letterbox {
            width,
            height,
            color,
        } => letterbox_filename(base, ext, width, height, color),
        OperationParams::Retina { factor } => retina_filename(base, ext, factor),
    }
}
