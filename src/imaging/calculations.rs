//! Pure calculation functions for derivative geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//! Ratios are computed in `f64`; pixel values are rounded once at the end and
//! clamped so every rectangle stays inside its source or canvas.

use super::params::CropAnchor;

/// Source rectangle and destination size for a crop+scale.
///
/// The backend copies `(src_x, src_y, src_w, src_h)` out of the source and
/// scales it to exactly `dst_w`×`dst_h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropGeometry {
    pub src_x: u32,
    pub src_y: u32,
    pub src_w: u32,
    pub src_h: u32,
    pub dst_w: u32,
    pub dst_h: u32,
}

impl CropGeometry {
    /// The whole source scaled into `target`.
    pub fn full(source: (u32, u32), target: (u32, u32)) -> Self {
        Self {
            src_x: 0,
            src_y: 0,
            src_w: source.0,
            src_h: source.1,
            dst_w: target.0,
            dst_h: target.1,
        }
    }
}

/// Where the scaled image lands on a letterbox canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Fill in a zero target dimension from the source aspect ratio.
///
/// # Examples
/// ```
/// # use imgderiv::imaging::calculations::infer_dimensions;
/// assert_eq!(infer_dimensions((400, 200), (100, 0)), (100, 50));
/// assert_eq!(infer_dimensions((400, 200), (0, 100)), (200, 100));
/// ```
pub fn infer_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let src_ratio = src_w as f64 / src_h as f64;

    match target {
        (0, 0) => source,
        (w, 0) => (w, ((w as f64 / src_ratio).round() as u32).max(1)),
        (0, h) => (((h as f64 * src_ratio).round() as u32).max(1), h),
        other => other,
    }
}

/// Compute the crop rectangle that fills `target` exactly from `source`.
///
/// With [`CropAnchor::Default`] nothing is cropped and the whole source is
/// scaled into the box, even if that distorts the aspect ratio. Every other
/// anchor keeps the full extent of one axis and crops the other:
///
/// - target relatively wider than the source → full width, the anchor picks `src_y`
/// - otherwise → full height, the anchor picks `src_x`
///
/// Anchors that only speak about one axis (`left`/`right`, `top`/`bottom`)
/// fall back to horizontal centering and a vertical offset of one sixth of the
/// slack, which keeps faces in portrait crops.
pub fn calculate_crop_geometry(
    source: (u32, u32),
    target: (u32, u32),
    anchor: CropAnchor,
) -> CropGeometry {
    if anchor == CropAnchor::Default {
        return CropGeometry::full(source, target);
    }

    let (src_w, src_h) = (source.0 as f64, source.1 as f64);
    let (dst_w, dst_h) = target;

    let src_ratio = src_w / src_h;
    let dest_ratio = dst_w as f64 / dst_h as f64;
    // Crop width when the height is kept, crop height when the width is kept
    let src_wt = src_h * dest_ratio;
    let src_ht = src_w / dest_ratio;

    let mut src_x = src_w / 2.0 - src_wt / 2.0;
    let mut src_y = (src_h - src_ht) / 6.0;

    match anchor {
        CropAnchor::Center => {
            src_x = (src_w - src_wt) / 2.0;
            src_y = (src_h - src_ht) / 2.0;
        }
        CropAnchor::Top => src_y = 0.0,
        CropAnchor::Bottom => src_y = src_h - src_ht,
        CropAnchor::TopCenter => src_y = (src_h - src_ht) / 4.0,
        CropAnchor::BottomCenter => src_y = src_h - src_ht - (src_h - src_ht) / 4.0,
        CropAnchor::Left => src_x = 0.0,
        CropAnchor::Right => src_x = src_w - src_wt,
        CropAnchor::Default => {}
    }

    if dest_ratio > src_ratio {
        let (y, h) = clamp_span(src_y, src_ht, source.1);
        CropGeometry {
            src_x: 0,
            src_y: y,
            src_w: source.0,
            src_h: h,
            dst_w,
            dst_h,
        }
    } else {
        let (x, w) = clamp_span(src_x, src_wt, source.0);
        CropGeometry {
            src_x: x,
            src_y: 0,
            src_w: w,
            src_h: source.1,
            dst_w,
            dst_h,
        }
    }
}

/// Round an (offset, length) pair and keep it inside `0..limit`.
fn clamp_span(offset: f64, length: f64, limit: u32) -> (u32, u32) {
    let length = (length.round() as u32).clamp(1, limit.max(1));
    let offset = (offset.round().max(0.0) as u32).min(limit.saturating_sub(length));
    (offset, length)
}

/// Compute the letterbox placement of `source` inside `canvas`.
///
/// The source is scaled to touch the canvas on its dominant axis and centered
/// on the other. The scaled size is clamped to the canvas, so rounding can
/// never push content past an edge.
pub fn calculate_letterbox_placement(source: (u32, u32), canvas: (u32, u32)) -> Placement {
    let (src_w, src_h) = (source.0 as f64, source.1 as f64);
    let (w, h) = canvas;

    let old_aspect = src_w / src_h;
    let new_aspect = w as f64 / h as f64;

    if new_aspect > old_aspect {
        // Target is relatively wider: full height, pad left and right
        let factor = h as f64 / src_h;
        let scaled_w = ((src_w * factor).round() as u32).clamp(1, w);
        Placement {
            x: (w - scaled_w) / 2,
            y: 0,
            width: scaled_w,
            height: h,
        }
    } else {
        // Target is relatively taller: full width, pad top and bottom
        let factor = w as f64 / src_w;
        let scaled_h = ((src_h * factor).round() as u32).clamp(1, h);
        Placement {
            x: 0,
            y: (h - scaled_h) / 2,
            width: w,
            height: scaled_h,
        }
    }
}

/// Output dimensions for a retina derivative.
///
/// # Examples
/// ```
/// # use imgderiv::imaging::calculations::calculate_retina_dimensions;
/// assert_eq!(calculate_retina_dimensions((100, 50), 2.0), (200, 100));
/// ```
pub fn calculate_retina_dimensions(source: (u32, u32), factor: f64) -> (u32, u32) {
    let scale = |v: u32| ((v as f64 * factor).round() as u32).max(1);
    (scale(source.0), scale(source.1))
}

/// Largest output image, in pixels (100 megapixels, 400 MB as RGBA8).
pub const MAX_OUTPUT_PIXELS: u64 = 100_000_000;

/// Longest output side. PNG and JPEG both top out at 65535.
pub const MAX_OUTPUT_SIDE: u32 = 65_535;

/// Whether an output of `dims` may be allocated at all.
///
/// # Examples
/// ```
/// # use imgderiv::imaging::calculations::fits_output_budget;
/// assert!(fits_output_budget((10_000, 10_000)));
/// assert!(!fits_output_budget((10_001, 10_000)));
/// assert!(!fits_output_budget((65_536, 1)));
/// ```
pub fn fits_output_budget(dims: (u32, u32)) -> bool {
    let (w, h) = dims;
    w <= MAX_OUTPUT_SIDE && h <= MAX_OUTPUT_SIDE && u64::from(w) * u64::from(h) <= MAX_OUTPUT_PIXELS
}
