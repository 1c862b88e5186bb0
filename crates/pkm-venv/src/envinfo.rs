use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::Error;

fn etc_pkm(env_root: &Utf8Path) -> Utf8PathBuf {
    env_root.join("etc").join("pkm")
}

/// `<env>/etc/pkm/envinfo.toml`: identifies which application dependency an application
/// environment was materialized for, so a later `pkm install`/`show` in that environment knows
/// what it's an environment *of* without re-deriving it from the lockfile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvInfo {
    pub application: String,
}

impl EnvInfo {
    pub fn read(env_root: &Utf8Path) -> Result<Option<Self>, Error> {
        let path = etc_pkm(env_root).join("envinfo.toml");
        if !path.is_file() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)?;
        toml::from_str(&raw)
            .map(Some)
            .map_err(|source| Error::Toml { path, source: Box::new(source) })
    }

    pub fn write(&self, env_root: &Utf8Path) -> Result<(), Error> {
        let dir = etc_pkm(env_root);
        fs::create_dir_all(&dir)?;
        let path = dir.join("envinfo.toml");
        let raw = toml::to_string_pretty(self).map_err(|source| Error::Toml { path: path.clone(), source: Box::new(source) })?;
        fs::write(&path, raw)?;
        Ok(())
    }
}

/// `<env>/etc/pkm/packages-lock.toml`: the persisted decision set from the last successful solve
/// against this environment — consumed as the lock-prioritizing overlay's hint on the next
/// resolve, and written fresh after every successful install.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackagesLock {
    /// Normalized package name -> exact version string, deliberately schema-minimal: the
    /// lockfile format is a hint for re-solves, not a portable artifact.
    pub packages: FxHashMap<String, String>,
}

impl PackagesLock {
    pub fn read(env_root: &Utf8Path) -> Result<Self, Error> {
        let path = etc_pkm(env_root).join("packages-lock.toml");
        if !path.is_file() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)?;
        toml::from_str(&raw).map_err(|source| Error::Toml { path, source: Box::new(source) })
    }

    pub fn write(&self, env_root: &Utf8Path) -> Result<(), Error> {
        let dir = etc_pkm(env_root);
        fs::create_dir_all(&dir)?;
        let path = dir.join("packages-lock.toml");
        let raw = toml::to_string_pretty(self).map_err(|source| Error::Toml { path: path.clone(), source: Box::new(source) })?;
        fs::write(&path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_envinfo() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let info = EnvInfo { application: "myapp==1.0".to_string() };
        info.write(root).unwrap();
        let read_back = EnvInfo::read(root).unwrap().unwrap();
        assert_eq!(read_back.application, "myapp==1.0");
    }

    #[test]
    fn missing_lock_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let lock = PackagesLock::read(root).unwrap();
        assert!(lock.packages.is_empty());
    }
}
