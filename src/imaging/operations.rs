//! The [`Operation`] abstraction shared by resize, letterbox and retina.
//!
//! An operation does two things:
//!
//! 1. **Name** its output from the source base name and extension. This is
//!    pure and cheap; the orchestrator calls it on every request to find out
//!    whether the derivative already exists.
//! 2. **Execute**: read the source dimensions, plan the geometry with the
//!    [`calculations`](super::calculations) functions, and hand a fully
//!    planned request to the backend.
//!
//! Vector sources are refused up front by every operation, and so is any
//! output larger than the pixel budget in
//! [`calculations`](super::calculations).

use super::backend::{BackendError, FrameEditor, ImageBackend};
use super::calculations::fits_output_budget;
use super::format::is_svg;
use super::letterbox::Letterbox;
use super::params::{OperationParams, Quality};
use super::resize::Resize;
use super::retina::Retina;
use std::path::Path;
use tracing::warn;

/// The capabilities an operation may use, plus the encode quality the
/// orchestrator picked for the target format.
#[derive(Clone, Copy)]
pub struct Editors<'a> {
    pub backend: &'a dyn ImageBackend,
    /// Per-frame editor for animated sources, when one is available.
    pub frames: Option<&'a dyn FrameEditor>,
    pub quality: Quality,
}

pub trait Operation {
    /// Derivative filename for a source named `base.ext`.
    fn filename(&self, base: &str, ext: &str) -> String;

    /// Produce `target` from `source`.
    fn execute(&self, editors: &Editors<'_>, source: &Path, target: &Path)
    -> Result<(), BackendError>;

    /// [`execute`](Operation::execute), logging the failure instead of
    /// returning it.
    fn run(&self, editors: &Editors<'_>, source: &Path, target: &Path) -> bool {
        match self.execute(editors, source, target) {
            Ok(()) => true,
            Err(e) => {
                warn!(source = %source.display(), target = %target.display(), "{e}");
                false
            }
        }
    }
}

/// Refuse vector sources; this engine only handles rasters.
pub(super) fn reject_svg(source: &Path) -> Result<(), BackendError> {
    if is_svg(source) {
        return Err(BackendError::UnsupportedFormat(source.to_path_buf()));
    }
    Ok(())
}

/// Refuse outputs too large to allocate, before any pixel work.
pub(super) fn check_output_size(dims: (u32, u32)) -> Result<(), BackendError> {
    if !fits_output_budget(dims) {
        return Err(BackendError::TooLarge {
            width: dims.0,
            height: dims.1,
        });
    }
    Ok(())
}

impl OperationParams {
    fn with_operation<T>(&self, f: impl FnOnce(&dyn Operation) -> T) -> T {
        match *self {
            OperationParams::Resize {
                width,
                height,
                anchor,
            } => f(&Resize {
                width,
                height,
                anchor,
            }),
            OperationParams::Letterbox {
                width,
                height,
                color,
            } => f(&Letterbox {
                width,
                height,
                color,
            }),
            OperationParams::Retina { factor } => f(&Retina { factor }),
        }
    }
}

impl Operation for OperationParams {
    fn filename(&self, base: &str, ext: &str) -> String {
        self.with_operation(|op| op.filename(base, ext))
    }

    fn execute(
        &self,
        editors: &Editors<'_>,
        source: &Path,
        target: &Path,
    ) -> Result<(), BackendError> {
        self.with_operation(|op| op.execute(editors, source, target))
    }
}
