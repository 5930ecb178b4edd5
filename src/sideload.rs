//! Remote source caching ("sideloading").
//!
//! Operations only read local files, so a remote source is downloaded into
//! the sideload directory first. The local name is `<sha256(url)>.<ext>`,
//! a pure function of the URL: checking the cache needs no network, and a
//! given URL is fetched at most once no matter how many derivatives use it.
//!
//! The network is behind the [`Fetcher`] trait so the orchestrator can be
//! handed a different transport (tests use a counting fake).

use crate::atomic::write_atomic;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

#[derive(Error, Debug)]
pub enum SideloadError {
    #[error("Failed to fetch {url}: {reason}")]
    FetchFailure { url: String, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Remote fetch capability.
pub trait Fetcher: Sync {
    /// Download `url` and return the response body.
    fn download(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, SideloadError>;
}

/// Blocking HTTP(S) fetcher on `ureq`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UreqFetcher;

impl Fetcher for UreqFetcher {
    fn download(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, SideloadError> {
        let failure = |reason: String| SideloadError::FetchFailure {
            url: url.to_string(),
            reason,
        };

        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        let response = agent.get(url).call().map_err(|e| failure(e.to_string()))?;
        if response.status() >= 400 {
            return Err(failure(format!("HTTP {}", response.status())));
        }
        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| failure(e.to_string()))?;
        Ok(body)
    }
}

/// Extensions kept from the URL; anything else is cached as `jpg`.
const KNOWN_EXTENSIONS: &[&str] = &["jpg", "jpeg", "jpe", "png", "gif", "webp", "svg", "svgz"];

const FALLBACK_EXTENSION: &str = "jpg";

/// Extension of the URL's last path segment, lowercased, or `jpg`.
fn url_extension(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|url| {
            let last = url.path_segments()?.next_back()?;
            Some(last.rsplit_once('.')?.1.to_string())
        })
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| KNOWN_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

/// Cache path for `url` inside `dir`.
pub fn sideload_path(dir: &Path, url: &str) -> PathBuf {
    let digest = Sha256::digest(url.as_bytes());
    dir.join(format!("{:x}.{}", digest, url_extension(url)))
}

/// Make `url` available locally, downloading it only if it is not cached yet.
pub fn sideload(
    fetcher: &dyn Fetcher,
    dir: &Path,
    url: &str,
    timeout: Duration,
) -> Result<PathBuf, SideloadError> {
    let path = sideload_path(dir, url);
    if path.exists() {
        debug!(url, path = %path.display(), "sideload cache hit");
        return Ok(path);
    }

    let body = fetcher.download(url, timeout)?;
    fs::create_dir_all(dir)?;
    write_atomic(&path, |w| w.write_all(&body).map_err(SideloadError::from))?;
    info!(url, path = %path.display(), bytes = body.len(), "sideloaded");
    Ok(path)
}
