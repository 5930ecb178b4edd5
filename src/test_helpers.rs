//! Shared test utilities: synthetic source images on disk.
//!
//! Every helper writes a small, valid file with a gradient (or, for GIFs, a
//! distinct color per frame) so crops and scales are observable.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let photo = tmp.path().join("photo.jpg");
//! create_test_jpeg(&photo, 200, 200);
//! ```

use image::codecs::gif::{GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::{Delay, Frame, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::Path;

/// Delay used for every frame of [`create_test_gif`].
pub const TEST_FRAME_DELAY_MS: u32 = 100;

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Create a small valid JPEG file with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = gradient(width, height);
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Create an opaque PNG file with the given dimensions.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
    });
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

/// Create a looping GIF with `frames` frames of distinct solid colors.
pub fn create_test_gif(path: &Path, width: u32, height: u32, frames: usize) {
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = GifEncoder::new(file);
    encoder.set_repeat(Repeat::Infinite).unwrap();
    let frames: Vec<Frame> = (0..frames)
        .map(|i| {
            let shade = (i * 80 % 256) as u8;
            Frame::from_parts(
                RgbaImage::from_pixel(width, height, Rgba([shade, 255 - shade, 0, 255])),
                0,
                0,
                Delay::from_numer_denom_ms(TEST_FRAME_DELAY_MS, 1),
            )
        })
        .collect();
    encoder.encode_frames(frames).unwrap();
}

/// Write a minimal SVG document.
pub fn create_test_svg(path: &Path) {
    std::fs::write(
        path,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect width="10" height="10"/></svg>"#,
    )
    .unwrap();
}
