//! Letterbox: scale to fit and pad, never crop.

use super::backend::BackendError;
use super::calculations::calculate_letterbox_placement;
use super::operations::{Editors, Operation, check_output_size, reject_svg};
use super::params::{LetterboxParams, Rgb};
use crate::naming::letterbox_filename;
use std::path::Path;

/// Fit the source inside a `width`×`height` canvas padded with `color`,
/// or with transparent pixels when `color` is `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub width: u32,
    pub height: u32,
    pub color: Option<Rgb>,
}

impl Operation for Letterbox {
    fn filename(&self, base: &str, ext: &str) -> String {
        letterbox_filename(base, ext, self.width, self.height, self.color)
    }

    fn execute(
        &self,
        editors: &Editors<'_>,
        source: &Path,
        target: &Path,
    ) -> Result<(), BackendError> {
        reject_svg(source)?;
        check_output_size((self.width, self.height))?;

        let src = editors.backend.identify(source)?.as_tuple();
        editors.backend.letterbox(&LetterboxParams {
            source: source.to_path_buf(),
            output: target.to_path_buf(),
            width: self.width,
            height: self.height,
            placement: calculate_letterbox_placement(src, (self.width, self.height)),
            background: self.color,
            quality: editors.quality,
        })
    }
}
