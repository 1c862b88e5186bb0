use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use pkm_interpreter::Interpreter;
use pkm_version::VersionSpecifier;

use crate::bare::{canonical_interpreter_path, create_bare_venv};
use crate::envinfo::EnvInfo;
use crate::error::Error;

/// Which subtree of the zoo an environment lives under: general environments are named venvs
/// the user creates directly; application environments back a single installed application and
/// additionally carry an [`EnvInfo`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum EnvironmentKind {
    General,
    Application,
}

/// An environment the zoo knows about, valid or not. Valid means the presence of an interpreter
/// executable at a canonical path.
#[derive(Debug, Clone)]
pub struct ZooEntry {
    pub name: String,
    pub kind: EnvironmentKind,
    pub root: Utf8PathBuf,
    pub valid: bool,
}

/// Manages named environments under `<root>/envs/<name>` (general) and `<root>/apps/<name>`
/// (application).
#[derive(Debug, Clone)]
pub struct EnvironmentZoo {
    root: Utf8PathBuf,
}

impl EnvironmentZoo {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn subtree(&self, kind: EnvironmentKind) -> Utf8PathBuf {
        match kind {
            EnvironmentKind::General => self.root.join("envs"),
            EnvironmentKind::Application => self.root.join("apps"),
        }
    }

    pub fn env_root(&self, kind: EnvironmentKind, name: &str) -> Utf8PathBuf {
        self.subtree(kind).join(name)
    }

    /// Materializes a general environment at `<root>/envs/<name>` from the highest locally
    /// discovered interpreter satisfying `python_spec`.
    pub fn create_general(
        &self,
        name: &str,
        interpreters: &[Interpreter],
        python_spec: &VersionSpecifier,
    ) -> Result<pkm_distribution::Environment, Error> {
        let interpreter = pkm_interpreter::find_satisfying(interpreters, python_spec)
            .ok_or_else(|| Error::IncompatibleInterpreter(python_spec.clone()))?;
        create_bare_venv(&self.env_root(EnvironmentKind::General, name), &interpreter)
    }

    /// Materializes an application environment at `<root>/apps/<name>`: tries candidate
    /// interpreters in descending version order, keeping the first one for which `trial_solve`
    /// reports a solvable plan, then persists `envinfo.toml`.
    ///
    /// `trial_solve` is injected rather than called directly against a concrete resolver type so
    /// that `pkm-venv` doesn't need to depend on `pkm-resolver`/`pkm-pubgrub`; the CLI binary
    /// wires the real trial-solve closure against the application's repository.
    pub fn create_application(
        &self,
        name: &str,
        application: &str,
        interpreters: &[Interpreter],
        python_spec: &VersionSpecifier,
        mut trial_solve: impl FnMut(&Interpreter) -> bool,
    ) -> Result<pkm_distribution::Environment, Error> {
        let candidates = pkm_interpreter::candidates_descending(interpreters, python_spec);
        let interpreter = candidates
            .into_iter()
            .find(|interp| trial_solve(interp))
            .ok_or_else(|| Error::IncompatibleInterpreter(python_spec.clone()))?;

        let root = self.env_root(EnvironmentKind::Application, name);
        let env = create_bare_venv(&root, &interpreter)?;
        EnvInfo { application: application.to_string() }.write(&root)?;
        Ok(env)
    }

    /// Lists every environment under the requested subtree(s), valid or not.
    pub fn list(&self, kinds: &[EnvironmentKind]) -> Result<Vec<ZooEntry>, Error> {
        let mut entries = Vec::new();
        for &kind in kinds {
            let subtree = self.subtree(kind);
            if !subtree.is_dir() {
                continue;
            }
            for entry in fs::read_dir(&subtree)? {
                let entry = entry?;
                if !entry.file_type()?.is_dir() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                let root = Utf8Path::from_path(&entry.path()).expect("zoo paths are utf8").to_path_buf();
                let valid = canonical_interpreter_path(&root).is_file();
                entries.push(ZooEntry { name, kind, root, valid });
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Deletes an environment's directory entirely. Idempotent: deleting an already-absent
    /// environment is not an error.
    pub fn delete(&self, kind: EnvironmentKind, name: &str) -> Result<(), Error> {
        let root = self.env_root(kind, name);
        if root.is_dir() {
            fs::remove_dir_all(root)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_reports_invalid_for_empty_reserved_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let zoo = EnvironmentZoo::new(root.to_path_buf());
        fs::create_dir_all(root.join("envs").join("scratch")).unwrap();

        let entries = zoo.list(&[EnvironmentKind::General]).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].valid);
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let zoo = EnvironmentZoo::new(root.to_path_buf());
        zoo.delete(EnvironmentKind::General, "nonexistent").unwrap();
    }
}
