//! Retina: uniform upscale, no cropping.

use super::backend::BackendError;
use super::calculations::{CropGeometry, calculate_retina_dimensions};
use super::operations::{Editors, Operation, check_output_size, reject_svg};
use super::params::CropParams;
use crate::naming::retina_filename;
use std::path::Path;

/// Default multiplier when the caller does not pick one.
pub const DEFAULT_RETINA_FACTOR: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Retina {
    pub factor: f64,
}

impl Default for Retina {
    fn default() -> Self {
        Self {
            factor: DEFAULT_RETINA_FACTOR,
        }
    }
}

impl Operation for Retina {
    fn filename(&self, base: &str, ext: &str) -> String {
        retina_filename(base, ext, self.factor)
    }

    fn execute(
        &self,
        editors: &Editors<'_>,
        source: &Path,
        target: &Path,
    ) -> Result<(), BackendError> {
        reject_svg(source)?;

        let src = editors.backend.identify(source)?.as_tuple();
        let dst = calculate_retina_dimensions(src, self.factor);
        check_output_size(dst)?;
        editors.backend.crop_resize(&CropParams {
            source: source.to_path_buf(),
            output: target.to_path_buf(),
            geometry: CropGeometry::full(src, dst),
            quality: editors.quality,
        })
    }
}
