//! Image processing backend traits and shared types.
//!
//! [`ImageBackend`] is the image-editor capability every derivative needs:
//! identify, detect animation, crop+scale, and letterbox-composite. The
//! optional [`FrameEditor`] capability re-encodes multi-frame sources frame by
//! frame; the orchestrator is handed one (or not) at construction time.
//!
//! The production implementation of both is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::{CropParams, LetterboxParams};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("Image editor unavailable: {0}")]
    EditorUnavailable(String),
    #[error("Encode failed: {0}")]
    EncodeFailure(String),
    #[error("Animated source needs a frame editor: {}", .0.display())]
    AnimationUnsupported(PathBuf),
    #[error("Output too large: {width}x{height}")]
    TooLarge { width: u32, height: u32 },
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Single-frame image editing.
pub trait ImageBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Whether the source holds more than one frame.
    fn is_animated(&self, path: &Path) -> Result<bool, BackendError>;

    /// Copy the planned source rectangle, scale it, and save.
    fn crop_resize(&self, params: &CropParams) -> Result<(), BackendError>;

    /// Scale the whole source onto a pre-filled canvas and save.
    fn letterbox(&self, params: &LetterboxParams) -> Result<(), BackendError>;
}

/// Per-frame editing for animated sources.
pub trait FrameEditor: Sync {
    /// Apply the same crop+scale to every frame, keeping frame timing.
    fn crop_resize_frames(&self, params: &CropParams) -> Result<(), BackendError>;
}
