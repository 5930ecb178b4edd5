//! Resize: scale-then-crop to an exact target box.

use super::backend::BackendError;
use super::calculations::{calculate_crop_geometry, infer_dimensions};
use super::operations::{Editors, Operation, check_output_size, reject_svg};
use super::params::{CropAnchor, CropParams};
use crate::naming::resize_filename;
use std::path::Path;
use tracing::error;

/// Crop to `width`×`height` around `anchor`. Zero dimensions are inferred
/// from the source aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resize {
    pub width: u32,
    pub height: u32,
    pub anchor: CropAnchor,
}

impl Operation for Resize {
    fn filename(&self, base: &str, ext: &str) -> String {
        resize_filename(base, ext, self.width, self.height, self.anchor)
    }

    fn execute(
        &self,
        editors: &Editors<'_>,
        source: &Path,
        target: &Path,
    ) -> Result<(), BackendError> {
        reject_svg(source)?;

        let src = editors.backend.identify(source)?.as_tuple();
        let dst = infer_dimensions(src, (self.width, self.height));
        check_output_size(dst)?;
        let params = CropParams {
            source: source.to_path_buf(),
            output: target.to_path_buf(),
            geometry: calculate_crop_geometry(src, dst, self.anchor),
            quality: editors.quality,
        };

        if editors.backend.is_animated(source)? {
            let Some(frames) = editors.frames else {
                // Resizing only the first frame would silently drop the animation
                error!(
                    source = %source.display(),
                    "animated source but no frame editor is available"
                );
                return Err(BackendError::AnimationUnsupported(source.to_path_buf()));
            };
            return frames.crop_resize_frames(&params);
        }

        editors.backend.crop_resize(&params)
    }
}
