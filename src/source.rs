//! Source references.
//!
//! Callers hand the engine whatever they have: a filesystem path, a
//! site-relative URL (`/uploads/photo.jpg`), an absolute URL on this site, or
//! an absolute URL somewhere else. [`SourceRef::parse`] sorts these into a
//! local file or a remote URL, and remembers the *form* so that the
//! derivative can be handed back the same way it came in.
//!
//! | Input | Location | Output form |
//! |---|---|---|
//! | `uploads/a.jpg`, `/srv/www/a.jpg` (exists) | that path | filesystem path |
//! | `/uploads/a.jpg` (no such file) | `<root>/uploads/a.jpg` | `/uploads/...` |
//! | `<base_url>/uploads/a.jpg` | `<root>/uploads/a.jpg` | `<base_url>/uploads/...` |
//! | `https://elsewhere/a.jpg` | remote, sideloaded | `<base_url>/external/...` |
//!
//! URLs go through [`url::Url`]: schemes and hosts compare case-insensitively,
//! dot segments are resolved, and path segments are percent-decoded on the
//! way in and encoded again on the way out.

use crate::config::SiteConfig;
use percent_encoding::percent_decode_str;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Origin that site-relative URLs are resolved against. Never contacted.
const SITE_ORIGIN: &str = "http://site.invalid/";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SourceError {
    #[error("empty source reference")]
    Empty,
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("URL path leaves the site root: {0}")]
    EscapesRoot(String),
    #[error("source has no filename: {}", .0.display())]
    NoFilename(PathBuf),
}

/// How the caller wrote the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceForm {
    Path,
    SiteUrl,
    AbsoluteUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Local(PathBuf),
    /// Must be sideloaded before any operation runs.
    Remote(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub form: SourceForm,
    pub location: SourceLocation,
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Non-empty path segments of `url`, still percent-encoded.
fn segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|s| s.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

/// The configured `base_url`, if there is one and it is usable.
fn site_base(site: &SiteConfig) -> Option<Url> {
    Url::parse(site.base_url()).ok().filter(is_http)
}

/// Path segments of `url` below `base`, when `url` is on the same site.
fn below<'a>(url: &'a Url, base: &Url) -> Option<Vec<&'a str>> {
    if url.scheme() != base.scheme()
        || url.host_str() != base.host_str()
        || url.port_or_known_default() != base.port_or_known_default()
    {
        return None;
    }
    let prefix = segments(base);
    let rest = segments(url);
    let inside = rest.len() >= prefix.len() && rest.iter().zip(&prefix).all(|(a, b)| a == b);
    inside.then(|| rest[prefix.len()..].to_vec())
}

/// Map percent-encoded URL path segments onto `root`.
///
/// Dot segments are already resolved by the parser; a segment that only
/// decodes to a separator or `..` is refused.
fn map_segments(root: &Path, segments: &[&str], original: &str) -> Result<PathBuf, SourceError> {
    let escapes = || SourceError::EscapesRoot(original.to_string());
    let mut path = root.to_path_buf();
    for segment in segments {
        let decoded = percent_decode_str(segment)
            .decode_utf8()
            .map_err(|_| escapes())?;
        match decoded.as_ref() {
            "" | "." => {}
            ".." => return Err(escapes()),
            s if s.contains(['/', '\\']) => return Err(escapes()),
            s => path.push(s),
        }
    }
    Ok(path)
}

/// `target` relative to the site root, as plain path segments.
fn relative_segments<'a>(target: &'a Path, site: &SiteConfig) -> Option<Vec<&'a str>> {
    let rel = target.strip_prefix(&site.root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(s) => parts.push(s.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(parts)
}

/// `base` with `parts` appended as encoded path segments.
fn join_segments(mut base: Url, parts: &[&str]) -> Option<Url> {
    base.set_query(None);
    base.set_fragment(None);
    base.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(parts);
    Some(base)
}

impl SourceRef {
    pub fn parse(reference: &str, site: &SiteConfig) -> Result<Self, SourceError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(SourceError::Empty);
        }

        if let Ok(url) = Url::parse(reference) {
            if is_http(&url) {
                return Self::absolute(&url, reference, site);
            }
            // Drive letters and `name:with-colon.jpg` also parse; only a
            // real `scheme://` is refused
            if reference.contains("://") {
                return Err(SourceError::UnsupportedScheme(url.scheme().to_string()));
            }
        }

        if reference.starts_with('/') && !Path::new(reference).exists() {
            return Ok(Self {
                form: SourceForm::SiteUrl,
                location: SourceLocation::Local(Self::site_path(reference, site)?),
            });
        }

        Ok(Self {
            form: SourceForm::Path,
            location: SourceLocation::Local(PathBuf::from(reference)),
        })
    }

    fn absolute(url: &Url, reference: &str, site: &SiteConfig) -> Result<Self, SourceError> {
        let on_site = site_base(site).and_then(|base| below(url, &base));
        let location = match on_site {
            Some(rest) => SourceLocation::Local(map_segments(&site.root, &rest, reference)?),
            None => SourceLocation::Remote(reference.to_string()),
        };
        Ok(Self {
            form: SourceForm::AbsoluteUrl,
            location,
        })
    }

    fn site_path(reference: &str, site: &SiteConfig) -> Result<PathBuf, SourceError> {
        let escapes = || SourceError::EscapesRoot(reference.to_string());
        let origin = Url::parse(SITE_ORIGIN).map_err(|_| escapes())?;
        let url = origin.join(reference).map_err(|_| escapes())?;
        // `//host/path` is protocol-relative and lands on another origin
        if url.origin() != origin.origin() {
            return Err(escapes());
        }
        map_segments(&site.root, &segments(&url), reference)
    }

    /// Write `target` back in this reference's form.
    ///
    /// `None` when a URL form cannot address `target`: it is outside the site
    /// root, or an absolute URL is wanted and no `base_url` is configured.
    pub fn render(&self, target: &Path, site: &SiteConfig) -> Option<String> {
        match self.form {
            SourceForm::Path => Some(target.display().to_string()),
            SourceForm::SiteUrl => {
                let origin = Url::parse(SITE_ORIGIN).ok()?;
                let url = join_segments(origin, &relative_segments(target, site)?)?;
                Some(url.path().to_string())
            }
            SourceForm::AbsoluteUrl => {
                let url = join_segments(site_base(site)?, &relative_segments(target, site)?)?;
                Some(url.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site(root: &Path, base_url: &str) -> SiteConfig {
        SiteConfig {
            root: root.to_path_buf(),
            base_url: base_url.to_string(),
        }
    }

    #[test]
    fn relative_path_stays_a_path() {
        let site = site(Path::new("/srv/www"), "https://example.com");
        let source = SourceRef::parse("uploads/photo.jpg", &site).unwrap();
        assert_eq!(source.form, SourceForm::Path);
        assert_eq!(
            source.location,
            SourceLocation::Local(PathBuf::from("uploads/photo.jpg"))
        );
        assert_eq!(
            source
                .render(Path::new("uploads/photo@2x.jpg"), &site)
                .as_deref(),
            Some("uploads/photo@2x.jpg")
        );
    }

    #[test]
    fn existing_absolute_path_is_a_path() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("photo.jpg");
        std::fs::write(&file, b"").unwrap();
        let site = site(tmp.path(), "");

        let source = SourceRef::parse(file.to_str().unwrap(), &site).unwrap();
        assert_eq!(source.form, SourceForm::Path);
        assert_eq!(source.location, SourceLocation::Local(file));
    }

    #[test]
    fn missing_rooted_path_is_a_site_url() {
        let site = site(Path::new("/srv/www"), "");
        let source = SourceRef::parse("/uploads/photo.jpg?ver=3", &site).unwrap();
        assert_eq!(source.form, SourceForm::SiteUrl);
        assert_eq!(
            source.location,
            SourceLocation::Local(PathBuf::from("/srv/www/uploads/photo.jpg"))
        );
        assert_eq!(
            source
                .render(Path::new("/srv/www/uploads/photo-10x10-c-f.jpg"), &site)
                .as_deref(),
            Some("/uploads/photo-10x10-c-f.jpg")
        );
    }

    #[test]
    fn percent_encoded_site_url_is_decoded_and_reencoded() {
        let site = site(Path::new("/srv/www"), "");
        let source = SourceRef::parse("/uploads/my%20photo.png", &site).unwrap();
        assert_eq!(
            source.location,
            SourceLocation::Local(PathBuf::from("/srv/www/uploads/my photo.png"))
        );
        assert_eq!(
            source
                .render(Path::new("/srv/www/uploads/my photo@2x.png"), &site)
                .as_deref(),
            Some("/uploads/my%20photo@2x.png")
        );
    }

    #[test]
    fn own_absolute_url_maps_to_root() {
        let site = site(Path::new("/srv/www"), "https://example.com/");
        let source = SourceRef::parse("https://example.com/uploads/photo.jpg", &site).unwrap();
        assert_eq!(source.form, SourceForm::AbsoluteUrl);
        assert_eq!(
            source.location,
            SourceLocation::Local(PathBuf::from("/srv/www/uploads/photo.jpg"))
        );
        assert_eq!(
            source
                .render(Path::new("/srv/www/uploads/photo@2x.jpg"), &site)
                .as_deref(),
            Some("https://example.com/uploads/photo@2x.jpg")
        );
    }

    #[test]
    fn own_site_matches_scheme_and_host_case_insensitively() {
        let site = site(Path::new("/srv/www"), "https://example.com");
        let source = SourceRef::parse("HTTPS://Example.COM:443/a.jpg", &site).unwrap();
        assert_eq!(
            source.location,
            SourceLocation::Local(PathBuf::from("/srv/www/a.jpg"))
        );
    }

    #[test]
    fn base_url_with_path_only_claims_its_subtree() {
        let site = site(Path::new("/srv/www"), "https://example.com/blog");
        let inside = SourceRef::parse("https://example.com/blog/img/a.jpg", &site).unwrap();
        assert_eq!(
            inside.location,
            SourceLocation::Local(PathBuf::from("/srv/www/img/a.jpg"))
        );
        assert_eq!(
            inside
                .render(Path::new("/srv/www/img/a@2x.jpg"), &site)
                .as_deref(),
            Some("https://example.com/blog/img/a@2x.jpg")
        );

        let sibling = SourceRef::parse("https://example.com/blogroll/a.jpg", &site).unwrap();
        assert!(matches!(sibling.location, SourceLocation::Remote(_)));
    }

    #[test]
    fn lookalike_host_is_remote() {
        let site = site(Path::new("/srv/www"), "https://example.com");
        let source = SourceRef::parse("https://example.com.evil/photo.jpg", &site).unwrap();
        assert!(matches!(source.location, SourceLocation::Remote(_)));
        let source = SourceRef::parse("http://example.com/photo.jpg", &site).unwrap();
        assert!(matches!(source.location, SourceLocation::Remote(_)));
    }

    #[test]
    fn foreign_url_is_remote() {
        let site = site(Path::new("/srv/www"), "https://example.com");
        let source = SourceRef::parse("https://cdn.test/a.png", &site).unwrap();
        assert_eq!(
            source,
            SourceRef {
                form: SourceForm::AbsoluteUrl,
                location: SourceLocation::Remote("https://cdn.test/a.png".to_string()),
            }
        );
        // Sideloaded under the root: rendered under base_url
        assert_eq!(
            source
                .render(Path::new("/srv/www/external/ab12-lbox-1x1-trans.png"), &site)
                .as_deref(),
            Some("https://example.com/external/ab12-lbox-1x1-trans.png")
        );
    }

    #[test]
    fn uppercase_scheme_is_still_http() {
        let site = site(Path::new("/srv/www"), "https://example.com");
        let source = SourceRef::parse("HTTPS://cdn.test/a.jpg", &site).unwrap();
        assert_eq!(source.form, SourceForm::AbsoluteUrl);
        assert!(matches!(source.location, SourceLocation::Remote(_)));
    }

    #[test]
    fn absolute_url_without_base_url_cannot_be_rendered() {
        let site = site(Path::new("/srv/www"), "");
        let source = SourceRef::parse("https://cdn.test/a.png", &site).unwrap();
        assert_eq!(source.render(Path::new("/srv/www/external/x.png"), &site), None);
    }

    #[test]
    fn url_forms_outside_the_root_cannot_be_rendered() {
        let site = site(Path::new("/srv/www"), "https://example.com");
        let source = SourceRef::parse("https://cdn.test/a.png", &site).unwrap();
        assert_eq!(source.render(Path::new("/var/cache/x.png"), &site), None);
        let source = SourceRef::parse("/uploads/a.png", &site).unwrap();
        assert_eq!(source.render(Path::new("/var/cache/x.png"), &site), None);
    }

    #[test]
    fn dot_segments_stay_inside_the_root() {
        let site = site(Path::new("/srv/www"), "https://example.com");
        let source = SourceRef::parse("/uploads/../../etc/passwd.jpg", &site).unwrap();
        assert_eq!(
            source.location,
            SourceLocation::Local(PathBuf::from("/srv/www/etc/passwd.jpg"))
        );
        let source = SourceRef::parse("https://example.com/../x.jpg", &site).unwrap();
        assert_eq!(
            source.location,
            SourceLocation::Local(PathBuf::from("/srv/www/x.jpg"))
        );
    }

    #[test]
    fn rejects_bad_references() {
        let site = site(Path::new("/srv/www"), "https://example.com");
        assert_eq!(SourceRef::parse("  ", &site), Err(SourceError::Empty));
        assert!(matches!(
            SourceRef::parse("ftp://host/a.jpg", &site),
            Err(SourceError::UnsupportedScheme(s)) if s == "ftp"
        ));
        assert!(matches!(
            SourceRef::parse("/uploads/..%2F..%2Fetc/passwd.jpg", &site),
            Err(SourceError::EscapesRoot(_))
        ));
        assert!(matches!(
            SourceRef::parse("https://example.com/a%2F..%2F..%2Fb.jpg", &site),
            Err(SourceError::EscapesRoot(_))
        ));
        assert!(matches!(
            SourceRef::parse("//cdn.test/a.jpg", &site),
            Err(SourceError::EscapesRoot(_))
        ));
    }
}
