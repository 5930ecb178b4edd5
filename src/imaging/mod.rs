//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Output | Crate / function |
//! |---|---|---|
//! | **Resize** | exact `w`×`h`, cropped around an anchor | `crop_imm` + `resize_exact` |
//! | **Letterbox** | exact `w`×`h`, padded, never cropped | `RgbaImage` canvas + `imageops::overlay` |
//! | **Retina** | source × factor | `resize_exact` |
//! | **Animated resize** | every GIF frame cropped alike | `GifDecoder` / `GifEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop/letterbox/retina geometry (unit testable)
//! - **Parameters**: Data structures describing requests and planned work
//! - **Format**: Closed format set and the encoder dispatch table
//! - **Backend**: [`ImageBackend`] / [`FrameEditor`] traits + [`RustBackend`]
//! - **Operations**: [`Operation`] trait and the three operations built on it

pub mod backend;
pub mod calculations;
pub mod format;
mod frames;
mod letterbox;
pub mod operations;
mod params;
mod resize;
mod retina;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, FrameEditor, ImageBackend};
pub use format::Format;
pub use letterbox::Letterbox;
pub use operations::{Editors, Operation};
pub use params::{
    CropAnchor, CropParams, LetterboxParams, OperationParams, ParamError, Quality, Rgb,
};
pub use resize::Resize;
pub use retina::{DEFAULT_RETINA_FACTOR, Retina};
pub use rust_backend::RustBackend;
