//! Parameter types for derivative operations.
//!
//! These types describe *what* to produce, not *how*. They are the interface
//! between the [`operations`](super::operations) layer (which plans geometry and
//! names the output) and the [`backend`](super::backend) (which does the pixel
//! work). Keeping them plain data lets tests swap in a recording backend.
//!
//! ## Types
//!
//! - [`Quality`]: encode-time scalar (0–100, default 82). Clamped on construction.
//! - [`CropAnchor`]: which region of the source survives a resize crop.
//! - [`Rgb`]: solid letterbox background, parsed from `#rrggbb` / `#rgb`.
//! - [`OperationParams`]: the closed set of operations a caller can request.
//! - [`CropParams`] / [`LetterboxParams`]: fully planned backend requests.

use super::calculations::{CropGeometry, Placement};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Encoding quality on the 0–100 scale.
///
/// Lossy encoders use it directly; PNG converts it into a compression effort
/// (see [`Format::png_compression_effort`](super::format::Format::png_compression_effort)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.min(100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(82)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    #[error("unknown crop anchor '{0}' (expected default, center, top, bottom, left, right, top-center or bottom-center)")]
    UnknownAnchor(String),
    #[error("invalid color '{0}' (expected #rrggbb or #rgb)")]
    InvalidColor(String),
    #[error("letterbox needs a non-zero width and height, got {0}x{1}")]
    InvalidDimensions(u32, u32),
    #[error("retina factor must be a positive number, got {0}")]
    InvalidFactor(f64),
}

/// Crop anchor for [`OperationParams::Resize`].
///
/// `Default` means "no crop": the whole source is scaled into the target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CropAnchor {
    #[default]
    Default,
    Center,
    Top,
    Bottom,
    Left,
    Right,
    TopCenter,
    BottomCenter,
}

impl CropAnchor {
    pub const ALL: [CropAnchor; 8] = [
        CropAnchor::Default,
        CropAnchor::Center,
        CropAnchor::Top,
        CropAnchor::Bottom,
        CropAnchor::Left,
        CropAnchor::Right,
        CropAnchor::TopCenter,
        CropAnchor::BottomCenter,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CropAnchor::Default => "default",
            CropAnchor::Center => "center",
            CropAnchor::Top => "top",
            CropAnchor::Bottom => "bottom",
            CropAnchor::Left => "left",
            CropAnchor::Right => "right",
            CropAnchor::TopCenter => "top-center",
            CropAnchor::BottomCenter => "bottom-center",
        }
    }

    /// Token embedded in derivative filenames. The uncropped anchor is `f`.
    pub fn filename_token(self) -> &'static str {
        match self {
            CropAnchor::Default => "f",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for CropAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CropAnchor {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        CropAnchor::ALL
            .into_iter()
            .find(|a| a.as_str() == wanted)
            .ok_or_else(|| ParamError::UnknownAnchor(s.to_string()))
    }
}

/// Solid background color for letterbox padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Lowercase `rrggbb` without the leading `#`.
    pub fn to_hex(self) -> String {
        format!("{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl FromStr for Rgb {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParamError::InvalidColor(s.to_string());
        let trimmed = s.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
        match hex.len() {
            6 => Ok(Rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            // #rgb shorthand: each digit is doubled
            3 => Ok(Rgb(
                channel(&hex[0..1])? * 17,
                channel(&hex[1..2])? * 17,
                channel(&hex[2..3])? * 17,
            )),
            _ => Err(invalid()),
        }
    }
}

/// The operations a caller can request for a source image.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationParams {
    /// Scale-then-crop to exactly `width`×`height`. A zero dimension is
    /// inferred from the source aspect ratio.
    Resize {
        width: u32,
        height: u32,
        anchor: CropAnchor,
    },
    /// Scale-to-fit inside `width`×`height` and pad; never crops.
    Letterbox {
        width: u32,
        height: u32,
        color: Option<Rgb>,
    },
    /// Uniform upscale by `factor`.
    Retina { factor: f64 },
}

impl OperationParams {
    /// Reject requests no operation can satisfy.
    ///
    /// Resize accepts zeros (they are inferred from the source); letterbox
    /// needs a real canvas and retina a positive, finite factor.
    pub fn validate(&self) -> Result<(), ParamError> {
        match *self {
            OperationParams::Resize { .. } => Ok(()),
            OperationParams::Letterbox { width, height, .. } if width == 0 || height == 0 => {
                Err(ParamError::InvalidDimensions(width, height))
            }
            OperationParams::Letterbox { .. } => Ok(()),
            OperationParams::Retina { factor } if !(factor.is_finite() && factor > 0.0) => {
                Err(ParamError::InvalidFactor(factor))
            }
            OperationParams::Retina { .. } => Ok(()),
        }
    }
}

/// A planned crop+scale: copy `geometry`'s source rectangle into a
/// `dst_w`×`dst_h` image and save it.
#[derive(Debug, Clone, PartialEq)]
pub struct CropParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub geometry: CropGeometry,
    pub quality: Quality,
}

/// A planned letterbox: scale the whole source to `placement`'s size and
/// composite it onto a `width`×`height` canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct LetterboxParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub placement: Placement,
    /// `None` pads with fully transparent pixels.
    pub background: Option<Rgb>,
    pub quality: Quality,
}
