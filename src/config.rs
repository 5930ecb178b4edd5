//! Engine configuration module.
//!
//! Handles loading, validating, and merging a `config.toml`. The file is
//! sparse: stock defaults are the base layer and the user file overrides only
//! the keys it names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [quality]
//! jpeg = 82                 # 1-100
//! webp = 82                 # 1-100
//! png = 82                  # 0-100, converted to a 0-9 compression effort
//!
//! [site]
//! root = "."                # Directory that site URLs map onto
//! base_url = ""             # Absolute URL of `root`, e.g. "https://example.com"
//!
//! [sideload]
//! dir = "external"          # Remote image cache, relative to site.root
//! timeout_secs = 30
//!
//! [retina]
//! factor = 2.0
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{DEFAULT_RETINA_FACTOR, Format, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Engine configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Per-format encode quality.
    pub quality: QualityConfig,
    /// Where site URLs live on disk.
    pub site: SiteConfig,
    /// Remote source caching.
    pub sideload: SideloadConfig,
    /// Retina defaults.
    pub retina: RetinaConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl EngineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("quality.jpeg", self.quality.jpeg),
            ("quality.webp", self.quality.webp),
            ("quality.png", self.quality.png),
        ] {
            if value > 100 {
                return Err(ConfigError::Validation(format!("{key} must be 0-100")));
            }
        }
        if !(self.retina.factor.is_finite() && self.retina.factor > 0.0) {
            return Err(ConfigError::Validation(
                "retina.factor must be a positive number".into(),
            ));
        }
        if self.sideload.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "sideload.timeout_secs must be non-zero".into(),
            ));
        }
        let base = &self.site.base_url;
        let http = Url::parse(base).is_ok_and(|u| matches!(u.scheme(), "http" | "https"));
        if !base.is_empty() && !http {
            return Err(ConfigError::Validation(
                "site.base_url must be empty or an http:// or https:// URL".into(),
            ));
        }
        Ok(())
    }
}

/// Encode quality per output format (0 = worst, 100 = best).
///
/// GIF has no quality knob and ignores these values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QualityConfig {
    pub jpeg: u32,
    pub webp: u32,
    pub png: u32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        let q = Quality::default().value();
        Self {
            jpeg: q,
            webp: q,
            png: q,
        }
    }
}

impl QualityConfig {
    /// Quality for a target path, picked by its extension.
    pub fn for_path(&self, path: &Path) -> Quality {
        match Format::from_path(path) {
            Some(Format::Jpeg) => Quality::new(self.jpeg),
            Some(Format::Webp) => Quality::new(self.webp),
            Some(Format::Png) => Quality::new(self.png),
            Some(Format::Gif) | None => Quality::default(),
        }
    }
}

/// Mapping between site URLs and the filesystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Directory that `base_url` and `/`-relative URLs resolve into.
    pub root: PathBuf,
    /// Absolute URL of `root`, without a trailing slash. Empty disables
    /// absolute-URL output.
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            base_url: String::new(),
        }
    }
}

impl SiteConfig {
    /// `base_url` without any trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Remote source caching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SideloadConfig {
    /// Cache directory. Relative paths are resolved against `site.root`.
    pub dir: PathBuf,
    /// Fetch timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SideloadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("external"),
            timeout_secs: 30,
        }
    }
}

impl SideloadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Absolute-or-root-relative cache directory.
    pub fn resolved_dir(&self, site: &SiteConfig) -> PathBuf {
        if self.dir.is_absolute() {
            self.dir.clone()
        } else {
            site.root.join(&self.dir)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetinaConfig {
    /// Multiplier used when a retina request does not name one.
    pub factor: f64,
}

impl Default for RetinaConfig {
    fn default() -> Self {
        Self {
            factor: DEFAULT_RETINA_FACTOR,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers when several sources are processed.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(EngineConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<EngineConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: EngineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a `config.toml` file, or stock defaults when `path` is `None`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A named file that does not exist is an error.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = match path {
        Some(p) => Some(toml::from_str::<toml::Value>(&fs::read_to_string(p)?)?),
        None => None,
    };
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imgderiv Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Encode quality per output format (0 = worst, 100 = best)
# ---------------------------------------------------------------------------
[quality]
jpeg = 82
# WebP output is lossless; the value is accepted for symmetry.
webp = 82
# PNG is lossless too. Values above 9 become a 0-9 compression effort:
# effort = round(10 - quality / 10). Values 0-9 are used as the effort as-is.
png = 82

# ---------------------------------------------------------------------------
# Site layout
# ---------------------------------------------------------------------------
[site]
# Directory that URLs map onto. "/uploads/a.jpg" resolves to <root>/uploads/a.jpg.
root = "."

# Absolute URL of the root directory, e.g. "https://example.com".
# URLs starting with it are treated as local files, and derivatives of
# absolute-URL sources are returned as absolute URLs under it.
base_url = ""

# ---------------------------------------------------------------------------
# Remote sources
# ---------------------------------------------------------------------------
[sideload]
# Where remote images are cached (relative to site.root unless absolute).
# Each URL is downloaded once and stored as <sha256(url)>.<ext>.
dir = "external"

# Download timeout in seconds.
timeout_secs = 30

# ---------------------------------------------------------------------------
# Retina
# ---------------------------------------------------------------------------
[retina]
# Multiplier used when none is given on the command line.
factor = 2.0

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers when several sources are given.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
