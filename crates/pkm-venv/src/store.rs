use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use pkm_cache_key::CacheKey;
use tracing::debug;

use crate::error::Error;

/// How [`SharedPackageStore::materialize`] placed a file into an environment; recorded so a
/// consistency check or `uninstall` can tell whether removing the env copy is safe (a hardlink
/// shares an inode with the store; deleting it never touches the store's copy either way, but
/// callers that want "did this actually save space" diagnostics can use this).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LinkMode {
    Hardlink,
    Symlink,
    Copy,
}

/// A content-addressed directory outside any single environment. Wheel extraction writes each
/// file once, keyed by its content hash, and every environment that needs that file gets a link
/// to it instead of its own copy.
///
/// Writers create under a temp name in the store and rename into place, so a reader racing a
/// writer either sees the old absence or the complete final file, never a partial one.
/// Idempotent: materializing a file whose hash is already present is a cheap link-or-copy, never
/// a re-write.
#[derive(Debug, Clone)]
pub struct SharedPackageStore {
    root: Utf8PathBuf,
}

impl SharedPackageStore {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &CacheKey) -> Utf8PathBuf {
        // Two-level fan-out (first 2 hex chars) keeps any single directory from accumulating
        // an unbounded number of entries, matching how content-addressed caches are usually laid
        // out (git's object store does the same thing).
        let hex = key.as_str();
        self.root.join(&hex[..2]).join(&hex[2..])
    }

    /// Writes `bytes` into the store under its content hash, unless already present. Returns the
    /// key so the caller can [`Self::materialize`] it into as many environments as it likes.
    pub fn put(&self, bytes: &[u8]) -> Result<CacheKey, Error> {
        let key = CacheKey::digest(bytes);
        let dest = self.path_for(&key);
        if dest.is_file() {
            return Ok(key);
        }
        fs::create_dir_all(dest.parent().expect("path_for always has a parent"))?;
        let tmp = tempfile::NamedTempFile::new_in(dest.parent().expect("path_for always has a parent"))?;
        fs::write(tmp.path(), bytes)?;
        tmp.persist(dest.as_std_path()).map_err(|err| err.error)?;
        Ok(key)
    }

    /// Places the stored content at `key` onto `dest`, preferring a hardlink, falling back to a
    /// symlink, and finally to a plain copy if the filesystem supports neither.
    pub fn materialize(&self, key: &CacheKey, dest: &Utf8Path) -> Result<LinkMode, Error> {
        let source = self.path_for(key);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let _ = fs::remove_file(dest);

        if fs::hard_link(&source, dest).is_ok() {
            return Ok(LinkMode::Hardlink);
        }
        debug!(%source, %dest, "hardlink failed, falling back to symlink");

        #[cfg(unix)]
        if fs_err::os::unix::fs::symlink(&source, dest).is_ok() {
            return Ok(LinkMode::Symlink);
        }
        debug!(%source, %dest, "symlink failed, falling back to copy");

        fs::copy(&source, dest)?;
        Ok(LinkMode::Copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_is_idempotent_by_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = SharedPackageStore::new(Utf8Path::from_path(dir.path()).unwrap().to_path_buf());
        let a = store.put(b"hello").unwrap();
        let b = store.put(b"hello").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn materialize_round_trips_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = SharedPackageStore::new(Utf8Path::from_path(dir.path()).unwrap().to_path_buf());
        let key = store.put(b"package contents").unwrap();

        let env_dir = tempfile::tempdir().unwrap();
        let dest = Utf8Path::from_path(env_dir.path()).unwrap().join("site-packages/pkg/__init__.py");
        store.materialize(&key, &dest).unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "package contents");
    }
}
