//! Output formats and their encoders.
//!
//! The derivative keeps the source's extension, and the extension alone picks
//! the encoder. [`Format`] is a closed set; [`Format::encoder`] is the dispatch
//! table from format to encode function.

use super::backend::BackendError;
use super::params::Quality;
use image::DynamicImage;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Raster formats the engine can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Jpeg,
    Png,
    Gif,
    Webp,
}

/// Encode `img` into `writer` at `quality`.
pub type EncodeFn = fn(&DynamicImage, &mut dyn Write, Quality) -> Result<(), BackendError>;

const EXTENSIONS: &[(&str, Format)] = &[
    ("jpg", Format::Jpeg),
    ("jpeg", Format::Jpeg),
    ("jpe", Format::Jpeg),
    ("png", Format::Png),
    ("gif", Format::Gif),
    ("webp", Format::Webp),
];

impl Format {
    /// Look up a format by file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        EXTENSIONS
            .iter()
            .find(|(e, _)| e.eq_ignore_ascii_case(ext))
            .map(|(_, f)| *f)
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn encoder(self) -> EncodeFn {
        match self {
            Format::Jpeg => encode_jpeg,
            Format::Png => encode_png,
            Format::Gif => encode_gif,
            Format::Webp => encode_webp,
        }
    }

    /// Convert a 0–100 quality into PNG's 0–9 compression effort.
    ///
    /// Values of 9 or less are taken to already be on the effort scale.
    /// Above that, `effort = round(10 - quality / 10)`, so higher quality
    /// means less compression work.
    pub fn png_compression_effort(quality: Quality) -> u8 {
        let q = quality.value();
        if q > 9 {
            (10.0 - q as f64 / 10.0).round().clamp(0.0, 9.0) as u8
        } else {
            q as u8
        }
    }
}

/// Whether `path` is a vector image this engine refuses to process.
///
/// Checks the extension first, then sniffs the head of the file for an
/// `<svg` tag so mislabelled uploads are caught too.
pub fn is_svg(path: &Path) -> bool {
    let by_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg") || e.eq_ignore_ascii_case("svgz"));
    if by_extension {
        return true;
    }
    let Ok(file) = File::open(path) else {
        return false;
    };
    let mut head = Vec::with_capacity(512);
    if file.take(512).read_to_end(&mut head).is_err() {
        return false;
    }
    String::from_utf8_lossy(&head).contains("<svg")
}

fn encode_failure(format: &str, err: impl std::fmt::Display) -> BackendError {
    BackendError::EncodeFailure(format!("{format} encode failed: {err}"))
}

fn encode_jpeg(img: &DynamicImage, writer: &mut dyn Write, quality: Quality) -> Result<(), BackendError> {
    // JPEG has no alpha channel; transparent pixels flatten to black
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let encoder = JpegEncoder::new_with_quality(writer, quality.value().clamp(1, 100) as u8);
    rgb.write_with_encoder(encoder)
        .map_err(|e| encode_failure("JPEG", e))
}

fn encode_png(img: &DynamicImage, writer: &mut dyn Write, quality: Quality) -> Result<(), BackendError> {
    let compression = match Format::png_compression_effort(quality) {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    };
    let encoder = PngEncoder::new_with_quality(writer, compression, PngFilter::Adaptive);
    img.write_with_encoder(encoder)
        .map_err(|e| encode_failure("PNG", e))
}

fn encode_gif(img: &DynamicImage, writer: &mut dyn Write, _quality: Quality) -> Result<(), BackendError> {
    let mut encoder = GifEncoder::new(writer);
    encoder
        .encode_frame(image::Frame::new(img.to_rgba8()))
        .map_err(|e| encode_failure("GIF", e))
}

fn encode_webp(img: &DynamicImage, writer: &mut dyn Write, _quality: Quality) -> Result<(), BackendError> {
    // The pure-Rust WebP encoder is lossless only, so quality has no effect
    let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
    rgba.write_with_encoder(WebPEncoder::new_lossless(writer))
        .map_err(|e| encode_failure("WebP", e))
}
