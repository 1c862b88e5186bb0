//! A content-hash-keyed cache key, plus a canonicalized URL wrapper used to fold together
//! superficially-different spellings of the same remote resource (`github.com/a/b` vs.
//! `github.com/a/b.git`) before they're used as cache or content-store keys.

use std::fmt;

use sha2::{Digest, Sha256};
use url::Url;

/// A hex-encoded SHA-256 digest used as a cache/content-store key: the shared-package store
/// keys extracted wheel files by this, and repository response caches key on it too.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn digest(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A URL normalized for comparison purposes only (never for fetching): strips a trailing slash,
/// lower-cases GitHub hosts and paths, and drops a redundant `.git` suffix. Two URLs that
/// `CanonicalUrl::new` maps to the same value should be treated as the same repository by the VCS
/// handler's caching and by the lock-prioritizing overlay's "same source" checks.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct CanonicalUrl(Url);

impl CanonicalUrl {
    pub fn new(url: &Url) -> Self {
        let mut url = url.clone();

        if url.path().ends_with('/') {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.pop_if_empty();
            }
        }

        if url.host_str() == Some("github.com") {
            let _ = url.set_scheme(&url.scheme().to_ascii_lowercase());
            let path = url.path().to_ascii_lowercase();
            url.set_path(&path);
        }

        if let Some(stripped) = url.path().strip_suffix(".git") {
            let stripped = stripped.to_string();
            url.set_path(&stripped);
        }

        Self(url)
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::digest(self.0.as_str().as_bytes())
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(CacheKey::digest(b"hello"), CacheKey::digest(b"hello"));
        assert_ne!(CacheKey::digest(b"hello"), CacheKey::digest(b"world"));
    }

    #[test]
    fn canonicalizes_trailing_slash_and_git_suffix() {
        let a = CanonicalUrl::new(&Url::parse("https://github.com/pypa/sample.git").unwrap());
        let b = CanonicalUrl::new(&Url::parse("https://github.com/pypa/sample/").unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn lowercases_github_host_paths() {
        let a = CanonicalUrl::new(&Url::parse("https://github.com/PyPA/Sample").unwrap());
        let b = CanonicalUrl::new(&Url::parse("https://github.com/pypa/sample").unwrap());
        assert_eq!(a, b);
    }
}
