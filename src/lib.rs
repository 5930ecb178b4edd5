//! # imgderiv
//!
//! Deterministic image derivatives: resize-with-crop, letterbox, and retina
//! upscales, generated once and reused forever.
//!
//! # How a Request Flows
//!
//! ```text
//! reference ──► SourceRef ──► local source (sideload slot if remote)
//!                                        │
//!           Operation::filename(base, ext) ◄─┘
//!                      │
//!          render in the caller's form ──no URL──► error
//!                      │
//!          target exists? ──yes──► reuse
//!                      │no
//!          download if remote ──► Operation::execute ──► ImageBackend / FrameEditor ──► atomic write
//! ```
//!
//! The derivative's filename encodes the operation and all its parameters,
//! and it lives next to the source. That name is the only cache key: there is
//! no manifest or index to go stale.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`derive`] | The orchestrator: source resolution, skip-if-exists, fallback to the original on failure |
//! | [`imaging`] | Geometry, formats, the `Operation` trait, and the `image`-crate backend |
//! | [`naming`] | Derivative filenames |
//! | [`source`] | Path / site URL / absolute URL parsing and output-form mirroring |
//! | [`sideload`] | Content-addressed download cache for remote sources |
//! | [`atomic`] | Temp-file-and-rename writes |
//! | [`config`] | `config.toml` loading, validation, and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Pure-Rust Imaging
//!
//! Decoding, resampling (Lanczos3), and encoding all go through the `image`
//! crate. There is no ImageMagick or libvips to install; the binary is
//! self-contained.
//!
//! # Concurrency
//!
//! Calls are synchronous and independent. Two callers racing on the same
//! missing derivative both do the work and both write the same bytes; writes
//! go through [`atomic::write_atomic`], so neither a reader nor the other
//! writer ever sees a partial file.

pub mod atomic;
pub mod config;
pub mod derive;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod sideload;
pub mod source;

#[cfg(test)]
pub(crate) mod test_helpers;
