//! Animated-frame compositor.
//!
//! Resize hands animated sources here instead of the single-frame path so the
//! animation survives: every frame gets the same crop rectangle and the same
//! scale, keeps its delay, and the frames are re-encoded as a looping GIF.
//! Only GIF output is supported; anything else is [`BackendError::AnimationUnsupported`].

use super::backend::{BackendError, FrameEditor};
use super::calculations::CropGeometry;
use super::format::Format;
use super::params::CropParams;
use super::rust_backend::RustBackend;
use crate::atomic::write_atomic;
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::imageops::{self, FilterType};
use image::{AnimationDecoder, Frame};
use std::fs::File;
use std::io::BufReader;

/// Move a frame offset into the cropped, scaled coordinate space.
fn shift_offset(offset: u32, crop_start: u32, scale: f64) -> u32 {
    (offset.saturating_sub(crop_start) as f64 * scale).round() as u32
}

fn transform_frame(frame: Frame, g: &CropGeometry) -> Frame {
    let scale_x = g.dst_w as f64 / g.src_w as f64;
    let scale_y = g.dst_h as f64 / g.src_h as f64;
    let left = shift_offset(frame.left(), g.src_x, scale_x);
    let top = shift_offset(frame.top(), g.src_y, scale_y);
    let delay = frame.delay();

    let buffer = frame.into_buffer();
    let cropped = imageops::crop_imm(&buffer, g.src_x, g.src_y, g.src_w, g.src_h).to_image();
    let scaled = imageops::resize(&cropped, g.dst_w, g.dst_h, FilterType::Lanczos3);
    Frame::from_parts(scaled, left, top, delay)
}

impl FrameEditor for RustBackend {
    fn crop_resize_frames(&self, params: &CropParams) -> Result<(), BackendError> {
        if Format::from_path(&params.output) != Some(Format::Gif) {
            return Err(BackendError::AnimationUnsupported(params.source.clone()));
        }

        let undecodable = |e: image::ImageError| {
            BackendError::EditorUnavailable(format!(
                "Failed to decode frames of {}: {}",
                params.source.display(),
                e
            ))
        };
        let decoder = GifDecoder::new(BufReader::new(File::open(&params.source)?))
            .map_err(undecodable)?;
        let frames = decoder.into_frames().collect_frames().map_err(undecodable)?;

        let resized: Vec<Frame> = frames
            .into_iter()
            .map(|frame| transform_frame(frame, &params.geometry))
            .collect();

        write_atomic(&params.output, |writer| {
            let encode_failure =
                |e: image::ImageError| BackendError::EncodeFailure(format!("GIF encode failed: {e}"));
            let mut encoder = GifEncoder::new(writer);
            encoder.set_repeat(Repeat::Infinite).map_err(encode_failure)?;
            encoder.encode_frames(resized).map_err(encode_failure)
        })
    }
}
