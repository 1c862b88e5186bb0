use std::str::FromStr;

use camino::Utf8Path;
use fs_err as fs;
use pkm_pep508::Dependency;
use serde::Deserialize;

use crate::error::BuildError;

#[derive(Debug, Default, Deserialize)]
struct RawPyProjectToml {
    #[serde(rename = "build-system", default)]
    build_system: Option<RawBuildSystem>,
}

#[derive(Debug, Default, Deserialize)]
struct RawBuildSystem {
    #[serde(default)]
    requires: Vec<String>,
    #[serde(rename = "build-backend", default)]
    build_backend: Option<String>,
    #[serde(rename = "backend-path", default)]
    backend_path: Vec<String>,
}

/// The `[build-system]` table of a source tree's `pyproject.toml` (PEP 518), parsed into the
/// shape needed to decide whether the native or the PEP 517 hook build path applies.
#[derive(Debug, Clone)]
pub struct BuildSystem {
    pub requires: Vec<Dependency>,
    pub build_backend: Option<String>,
    pub backend_path: Vec<String>,
}

/// A project with no declared `build-backend` (or one that names pkm's own backend) is built
/// natively by [`BackendKind::Standard`]; everything else goes through the PEP 517 hook protocol
/// as [`BackendKind::External`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Standard,
    External,
}

impl BuildSystem {
    /// Reads `<source_tree>/pyproject.toml`. A source tree with no `pyproject.toml` at all, or
    /// one with no `[build-system]` table, is treated as `Standard` with no extra requirements —
    /// matching PEP 518's "source tree is not using this specification" fallback.
    pub fn from_source_tree(source_tree: &Utf8Path) -> Result<Self, BuildError> {
        let path = source_tree.join("pyproject.toml");
        if !path.is_file() {
            return Ok(Self { requires: Vec::new(), build_backend: None, backend_path: Vec::new() });
        }

        let contents = fs::read_to_string(&path)?;
        let parsed: RawPyProjectToml =
            toml::from_str(&contents).map_err(|err| BuildError::InvalidPyprojectToml(path.clone(), err))?;
        let raw = parsed.build_system.unwrap_or_default();

        let requires = raw
            .requires
            .iter()
            .map(|req| Dependency::from_str(req))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| BuildError::InvalidSourceDistribution(path.clone(), err.to_string()))?;

        Ok(Self { requires, build_backend: raw.build_backend, backend_path: raw.backend_path })
    }

    pub fn kind(&self) -> BackendKind {
        match &self.build_backend {
            None => BackendKind::Standard,
            Some(backend) if backend.starts_with("pkm.") => BackendKind::Standard,
            Some(_) => BackendKind::External,
        }
    }
}

/// The minimal `[project]` fields the standard builder needs. Reading the rest of the table
/// (dependencies, entry points, classifiers...) is a project-config concern handled elsewhere;
/// we pull just enough to name the artifact we build.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectIdentity {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
struct RawProjectTable {
    project: ProjectIdentity,
}

impl ProjectIdentity {
    pub fn from_source_tree(source_tree: &Utf8Path) -> Result<Self, BuildError> {
        let path = source_tree.join("pyproject.toml");
        let contents = fs::read_to_string(&path)?;
        let parsed: RawProjectTable =
            toml::from_str(&contents).map_err(|err| BuildError::InvalidPyprojectToml(path.clone(), err))?;
        Ok(parsed.project)
    }

    pub fn distribution_name(&self) -> String {
        self.name.replace('-', "_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_pyproject_toml_is_standard_with_no_requirements() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let build_system = BuildSystem::from_source_tree(root).unwrap();
        assert_eq!(build_system.kind(), BackendKind::Standard);
        assert!(build_system.requires.is_empty());
    }

    #[test]
    fn declared_setuptools_backend_is_external() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(
            root.join("pyproject.toml"),
            "[build-system]\nrequires = [\"setuptools>=61\"]\nbuild-backend = \"setuptools.build_meta\"\n",
        )
        .unwrap();
        let build_system = BuildSystem::from_source_tree(root).unwrap();
        assert_eq!(build_system.kind(), BackendKind::External);
        assert_eq!(build_system.requires.len(), 1);
    }

    #[test]
    fn pkm_native_backend_is_standard() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(
            root.join("pyproject.toml"),
            "[build-system]\nrequires = []\nbuild-backend = \"pkm.build_backend\"\n",
        )
        .unwrap();
        assert_eq!(BuildSystem::from_source_tree(root).unwrap().kind(), BackendKind::Standard);
    }
}
