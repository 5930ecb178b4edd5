//! Derivative orchestration.
//!
//! [`Deriver`] is the one place with I/O policy. For each request it:
//!
//! 1. Parses the source reference. A remote source maps to its slot in the
//!    sideload cache.
//! 2. Names the derivative with the requested operation. The target lives
//!    next to the source and its name is the whole cache key.
//! 3. Renders the target in the same form the source came in (path,
//!    site-relative URL, absolute URL). A URL that cannot address the
//!    target is an error, never a filesystem path.
//! 4. Returns the existing target untouched unless `force` is set.
//! 5. Otherwise downloads a remote source if needed and runs the operation
//!    with the quality configured for the target's format.
//!
//! The plain entry points ([`Deriver::resize`]
//! and friends) never fail: on any error they log it and hand back the
//! original reference, so a page still renders with the unprocessed image.
//! [`Deriver::try_derive`] returns the error instead.
//!
//! Everything the orchestrator talks to is injected at construction time:
//! the image backend, the optional per-frame editor, and the fetcher.

use crate::config::EngineConfig;
use crate::imaging::{
    BackendError, CropAnchor, Editors, FrameEditor, ImageBackend, Operation, OperationParams,
    ParamError, Rgb, RustBackend,
};
use crate::naming::split_filename;
use crate::sideload::{Fetcher, SideloadError, UreqFetcher, sideload, sideload_path};
use crate::source::{SourceError, SourceLocation, SourceRef};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum DeriveError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Sideload(#[from] SideloadError),
    #[error("Invalid parameters: {0}")]
    Params(#[from] ParamError),
    #[error("Invalid source: {0}")]
    InvalidSource(#[from] SourceError),
    #[error("{} has no URL in the requested form", .0.display())]
    NotAddressable(PathBuf),
}

/// A derivative that exists on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Derivative {
    /// The derivative in the caller's form (path or URL).
    pub reference: String,
    /// Where it lives on disk.
    pub path: PathBuf,
    /// `false` when an existing file was reused.
    pub generated: bool,
}

pub struct Deriver<B: ImageBackend = RustBackend> {
    config: EngineConfig,
    backend: B,
    frames: Option<Box<dyn FrameEditor>>,
    fetcher: Box<dyn Fetcher>,
}

impl Deriver<RustBackend> {
    /// Production setup: the `image` crate for both single-frame and
    /// per-frame work, HTTP through `ureq`.
    pub fn with_defaults(config: EngineConfig) -> Self {
        Deriver::new(config, RustBackend::new()).with_frame_editor(RustBackend::new())
    }
}

impl<B: ImageBackend> Deriver<B> {
    /// A deriver without a frame editor; animated sources will fail.
    pub fn new(config: EngineConfig, backend: B) -> Self {
        Self {
            config,
            backend,
            frames: None,
            fetcher: Box::new(UreqFetcher),
        }
    }

    pub fn with_frame_editor(mut self, frames: impl FrameEditor + 'static) -> Self {
        self.frames = Some(Box::new(frames));
        self
    }

    pub fn with_fetcher(mut self, fetcher: impl Fetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Produce (or reuse) the derivative of `reference` described by `params`.
    pub fn try_derive(
        &self,
        reference: &str,
        params: &OperationParams,
        force: bool,
    ) -> Result<Derivative, DeriveError> {
        params.validate()?;

        let site = &self.config.site;
        let sideload_dir = self.config.sideload.resolved_dir(site);
        let source_ref = SourceRef::parse(reference, site)?;
        let source = match &source_ref.location {
            SourceLocation::Local(path) => path.clone(),
            SourceLocation::Remote(url) => sideload_path(&sideload_dir, url),
        };

        let name =
            split_filename(&source).ok_or_else(|| SourceError::NoFilename(source.clone()))?;
        let target = source.with_file_name(params.filename(&name.base, &name.ext));
        let rendered = source_ref
            .render(&target, site)
            .ok_or_else(|| DeriveError::NotAddressable(target.clone()))?;
        let derivative = |generated| Derivative {
            reference: rendered.clone(),
            path: target.clone(),
            generated,
        };

        if target.exists() && !force {
            debug!(target = %target.display(), "derivative exists, reusing");
            return Ok(derivative(false));
        }

        if let SourceLocation::Remote(url) = &source_ref.location {
            sideload(
                self.fetcher.as_ref(),
                &sideload_dir,
                url,
                self.config.sideload.timeout(),
            )?;
        }

        let editors = Editors {
            backend: &self.backend,
            frames: self.frames.as_deref(),
            quality: self.config.quality.for_path(&target),
        };
        params.execute(&editors, &source, &target)?;
        info!(source = %source.display(), target = %target.display(), "generated derivative");
        Ok(derivative(true))
    }

    /// Like [`try_derive`](Self::try_derive), falling back to `reference`
    /// on failure.
    pub fn derive(&self, reference: &str, params: &OperationParams, force: bool) -> String {
        match self.try_derive(reference, params, force) {
            Ok(derivative) => derivative.reference,
            Err(e) => {
                warn!(source = reference, "{e}; serving the original");
                reference.to_string()
            }
        }
    }

    pub fn resize(
        &self,
        reference: &str,
        width: u32,
        height: u32,
        anchor: CropAnchor,
        force: bool,
    ) -> String {
        let params = OperationParams::Resize {
            width,
            height,
            anchor,
        };
        self.derive(reference, &params, force)
    }

    pub fn letterbox(
        &self,
        reference: &str,
        width: u32,
        height: u32,
        color: Option<Rgb>,
        force: bool,
    ) -> String {
        let params = OperationParams::Letterbox {
            width,
            height,
            color,
        };
        self.derive(reference, &params, force)
    }

    /// Retina derivative; `factor` defaults to the configured one.
    pub fn retina(&self, reference: &str, factor: Option<f64>, force: bool) -> String {
        let params = OperationParams::Retina {
            factor: factor.unwrap_or(self.config.retina.factor),
        };
        self.derive(reference, &params, force)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SideloadConfig, SiteConfig};
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::sideload::sideload_path;
    use crate::sideload::tests::MockFetcher;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn config(root: &Path) -> EngineConfig {
        EngineConfig {
            site: SiteConfig {
                root: root.to_path_buf(),
                base_url: "https://example.com".to_string(),
            },
            sideload: SideloadConfig {
                dir: PathBuf::from("external"),
                timeout_secs: 5,
            },
            ..EngineConfig::default()
        }
    }

    fn center(width: u32, height: u32) -> OperationParams {
        OperationParams::Resize {
            width,
            height,
            anchor: CropAnchor::Center,
        }
    }

    /// Deriver over a 200x200 mock, with a local `photo.jpg` in `tmp`.
    fn setup(tmp: &TempDir) -> (Deriver<MockBackend>, PathBuf) {
        let source = tmp.path().join("photo.jpg");
        fs::write(&source, b"").unwrap();
        let deriver = Deriver::new(config(tmp.path()), MockBackend::with_dimensions(200, 200))
            .with_fetcher(MockFetcher::failing());
        (deriver, source)
    }

    #[test]
    fn second_call_reuses_existing_file() {
        let tmp = TempDir::new().unwrap();
        let (deriver, source) = setup(&tmp);
        let reference = source.to_str().unwrap();

        let first = deriver.try_derive(reference, &center(100, 50), false).unwrap();
        let second = deriver.try_derive(reference, &center(100, 50), false).unwrap();

        assert!(first.generated);
        assert!(!second.generated);
        assert_eq!(first.path, second.path);
        assert_eq!(first.path, tmp.path().join("photo-100x50-c-center.jpg"));
        assert_eq!(deriver.backend().pixel_ops(), 1);
    }

    #[test]
    fn force_regenerates() {
        let tmp = TempDir::new().unwrap();
        let (deriver, source) = setup(&tmp);
        let reference = source.to_str().unwrap();

        deriver.resize(reference, 100, 50, CropAnchor::Center, false);
        deriver.resize(reference, 100, 50, CropAnchor::Center, true);

        assert_eq!(deriver.backend().pixel_ops(), 2);
    }

    #[test]
    fn failure_falls_back_to_original() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("photo.jpg");
        fs::write(&source, b"").unwrap();
        let deriver = Deriver::new(config(tmp.path()), MockBackend::with_dimensions(10, 10).failing());
        let reference = source.to_str().unwrap();

        assert_eq!(deriver.retina(reference, None, false), reference);
        assert!(!tmp.path().join("photo@2x.jpg").exists());
    }

    #[test]
    fn svg_falls_back_without_touching_the_backend() {
        let tmp = TempDir::new().unwrap();
        let (deriver, _) = setup(&tmp);
        let svg = tmp.path().join("logo.svg");
        crate::test_helpers::create_test_svg(&svg);
        let reference = svg.to_str().unwrap();

        let result = deriver.try_derive(reference, &center(10, 10), false);

        assert!(matches!(
            result,
            Err(DeriveError::Backend(BackendError::UnsupportedFormat(_)))
        ));
        assert_eq!(deriver.letterbox(reference, 10, 10, None, false), reference);
        assert!(deriver.backend().get_operations().is_empty());
    }

    #[test]
    fn invalid_params_are_rejected_up_front() {
        let tmp = TempDir::new().unwrap();
        let (deriver, source) = setup(&tmp);

        let result = deriver.try_derive(
            source.to_str().unwrap(),
            &OperationParams::Letterbox {
                width: 0,
                height: 10,
                color: None,
            },
            false,
        );

        assert!(matches!(result, Err(DeriveError::Params(_))));
        assert!(deriver.backend().get_operations().is_empty());
    }

    #[test]
    fn url_forms_are_mirrored() {
        let tmp = TempDir::new().unwrap();
        let (deriver, _) = setup(&tmp);

        let absolute = deriver.resize(
            "https://example.com/photo.jpg",
            100,
            50,
            CropAnchor::Top,
            false,
        );
        assert_eq!(absolute, "https://example.com/photo-100x50-c-top.jpg");

        let relative = deriver.letterbox("/photo.jpg", 30, 20, Some(Rgb(255, 0, 0)), false);
        assert_eq!(relative, "/photo-lbox-30x20-ff0000.jpg");
    }

    #[test]
    fn remote_source_is_sideloaded_once() {
        let tmp = TempDir::new().unwrap();
        let fetcher = MockFetcher::serving(b"remote".to_vec());
        let deriver = Deriver::new(config(tmp.path()), MockBackend::with_dimensions(64, 64))
            .with_fetcher(fetcher.clone());
        let url = "https://cdn.test/img/cat.png";

        let first = deriver.retina(url, Some(1.5), false);
        let second = deriver.resize(url, 32, 32, CropAnchor::Default, false);

        assert_eq!(fetcher.call_count(), 1);
        let cached = sideload_path(&tmp.path().join("external"), url);
        assert!(cached.exists());
        let stem = cached.file_stem().unwrap().to_str().unwrap();
        assert_eq!(first, format!("https://example.com/external/{stem}@1.5x.png"));
        assert_eq!(second, format!("https://example.com/external/{stem}-32x32-c-f.png"));
    }

    #[test]
    fn fetch_failure_falls_back_to_url() {
        let tmp = TempDir::new().unwrap();
        let (deriver, _) = setup(&tmp);
        let url = "https://cdn.test/img/cat.png";

        assert!(matches!(
            deriver.try_derive(url, &center(10, 10), false),
            Err(DeriveError::Sideload(SideloadError::FetchFailure { .. }))
        ));
        assert_eq!(deriver.resize(url, 10, 10, CropAnchor::Center, false), url);
    }

    #[test]
    fn remote_source_without_base_url_falls_back_to_url() {
        let tmp = TempDir::new().unwrap();
        let fetcher = MockFetcher::serving(b"remote".to_vec());
        let mut cfg = config(tmp.path());
        cfg.site.base_url = String::new();
        let deriver = Deriver::new(cfg, MockBackend::with_dimensions(64, 64))
            .with_fetcher(fetcher.clone());
        let url = "https://cdn.test/img/cat.png";

        assert!(matches!(
            deriver.try_derive(url, &OperationParams::Retina { factor: 2.0 }, false),
            Err(DeriveError::NotAddressable(_))
        ));
        assert_eq!(deriver.retina(url, None, false), url);
        assert_eq!(fetcher.call_count(), 0);
        assert_eq!(deriver.backend().pixel_ops(), 0);
    }

    #[test]
    fn sideload_dir_outside_the_root_falls_back_to_url() {
        let tmp = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let fetcher = MockFetcher::serving(b"remote".to_vec());
        let mut cfg = config(tmp.path());
        cfg.sideload.dir = cache.path().to_path_buf();
        let deriver = Deriver::new(cfg, MockBackend::with_dimensions(64, 64))
            .with_fetcher(fetcher.clone());
        let url = "https://cdn.test/img/cat.png";

        assert_eq!(deriver.resize(url, 8, 8, CropAnchor::Center, false), url);
        assert_eq!(fetcher.call_count(), 0);
    }

    #[test]
    fn oversized_retina_falls_back_to_original() {
        let tmp = TempDir::new().unwrap();
        let (deriver, source) = setup(&tmp);
        let reference = source.to_str().unwrap();

        assert!(matches!(
            deriver.try_derive(reference, &OperationParams::Retina { factor: 1e12 }, false),
            Err(DeriveError::Backend(BackendError::TooLarge { .. }))
        ));
        assert_eq!(deriver.retina(reference, Some(1e12), false), reference);
        assert_eq!(deriver.backend().pixel_ops(), 0);
    }

    #[test]
    fn quality_follows_target_format() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("photo.png");
        fs::write(&source, b"").unwrap();
        let mut cfg = config(tmp.path());
        cfg.quality.png = 40;
        let deriver = Deriver::new(cfg, MockBackend::with_dimensions(50, 50));

        deriver.resize(source.to_str().unwrap(), 10, 10, CropAnchor::Left, false);

        assert!(matches!(
            deriver.backend().get_operations().last(),
            Some(RecordedOp::CropResize { quality: 40, .. })
        ));
    }

    #[test]
    fn animated_source_uses_injected_frame_editor() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("anim.gif");
        fs::write(&source, b"").unwrap();
        let reference = source.to_str().unwrap();

        let without = Deriver::new(config(tmp.path()), MockBackend::with_dimensions(40, 40).animated());
        assert!(matches!(
            without.try_derive(reference, &center(20, 20), false),
            Err(DeriveError::Backend(BackendError::AnimationUnsupported(_)))
        ));
        assert_eq!(without.backend().pixel_ops(), 0);

        let with = Deriver::new(config(tmp.path()), MockBackend::with_dimensions(40, 40).animated())
            .with_frame_editor(MockBackend::with_dimensions(40, 40));
        let derivative = with.try_derive(reference, &center(20, 20), false).unwrap();
        assert!(derivative.generated);
        assert!(derivative.path.exists());
    }
}
