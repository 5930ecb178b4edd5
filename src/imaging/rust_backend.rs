//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, WebP) | `image::ImageReader` with content sniffing |
//! | Identify | `ImageReader::into_dimensions` (header only) |
//! | Animation detection | `GifDecoder::into_frames`, `WebPDecoder::has_animation` |
//! | Crop + scale | `DynamicImage::crop_imm` + `resize_exact` (`Lanczos3`) |
//! | Letterbox canvas | `RgbaImage::from_pixel` + `imageops::overlay` |
//! | Encode | [`Format::encoder`] dispatch, written via [`write_atomic`] |
//!
//! The per-frame path for animated GIFs lives in [`frames`](super::frames).

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::format::Format;
use super::params::{CropParams, LetterboxParams, Quality, Rgb};
use crate::atomic::write_atomic;
use image::codecs::gif::GifDecoder;
use image::codecs::webp::WebPDecoder;
use image::imageops::{self, FilterType};
use image::{AnimationDecoder, DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn open_reader(path: &Path) -> Result<ImageReader<BufReader<File>>, BackendError> {
    ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| {
            BackendError::EditorUnavailable(format!("Failed to open {}: {}", path.display(), e))
        })
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    open_reader(path)?.decode().map_err(|e| {
        BackendError::EditorUnavailable(format!("Failed to decode {}: {}", path.display(), e))
    })
}

/// Encode `img` by the output path's extension and move it into place atomically.
fn save_image(img: &DynamicImage, path: &Path, quality: Quality) -> Result<(), BackendError> {
    let format =
        Format::from_path(path).ok_or_else(|| BackendError::UnsupportedFormat(path.to_path_buf()))?;
    let encode = format.encoder();
    write_atomic(path, |writer| encode(img, writer, quality))
}

fn canvas_fill(background: Option<Rgb>) -> Rgba<u8> {
    match background {
        Some(Rgb(r, g, b)) => Rgba([r, g, b, 255]),
        None => Rgba([0, 0, 0, 0]),
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = open_reader(path)?.into_dimensions().map_err(|e| {
            BackendError::EditorUnavailable(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn is_animated(&self, path: &Path) -> Result<bool, BackendError> {
        let undecodable = |e: image::ImageError| {
            BackendError::EditorUnavailable(format!("Failed to decode {}: {}", path.display(), e))
        };
        match open_reader(path)?.format() {
            Some(ImageFormat::Gif) => {
                let decoder =
                    GifDecoder::new(BufReader::new(File::open(path)?)).map_err(undecodable)?;
                Ok(decoder.into_frames().take(2).count() > 1)
            }
            Some(ImageFormat::WebP) => {
                let decoder =
                    WebPDecoder::new(BufReader::new(File::open(path)?)).map_err(undecodable)?;
                Ok(decoder.has_animation())
            }
            _ => Ok(false),
        }
    }

    fn crop_resize(&self, params: &CropParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let g = params.geometry;
        let scaled = img
            .crop_imm(g.src_x, g.src_y, g.src_w, g.src_h)
            .resize_exact(g.dst_w, g.dst_h, FilterType::Lanczos3);
        save_image(&scaled, &params.output, params.quality)
    }

    fn letterbox(&self, params: &LetterboxParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let p = params.placement;

        let fill = canvas_fill(params.background);
        let mut canvas = RgbaImage::from_pixel(params.width, params.height, fill);
        let scaled = img
            .resize_exact(p.width, p.height, FilterType::Lanczos3)
            .to_rgba8();
        // overlay clips anything that would land outside the canvas
        imageops::overlay(&mut canvas, &scaled, i64::from(p.x), i64::from(p.y));

        save_image(&DynamicImage::ImageRgba8(canvas), &params.output, params.quality)
    }
}
