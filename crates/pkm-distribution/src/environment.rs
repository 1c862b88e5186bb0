use camino::{Utf8Path, Utf8PathBuf};

use pkm_pep508::MarkerEnvironment;

/// The standardized on-disk layout a wheel is unpacked into, rooted at an environment directory.
#[derive(Debug, Clone)]
pub struct EnvironmentLayout {
    pub root: Utf8PathBuf,
    pub purelib: Utf8PathBuf,
    pub platlib: Utf8PathBuf,
    pub scripts: Utf8PathBuf,
    pub data: Utf8PathBuf,
    pub include: Utf8PathBuf,
}

impl EnvironmentLayout {
    /// The conventional POSIX venv layout: `lib/pythonX.Y/site-packages`, `bin`, etc. Windows
    /// environments use `Lib/site-packages` and `Scripts`; callers select the right layout at
    /// environment-creation time based on the interpreter's platform.
    pub fn posix(root: impl AsRef<Utf8Path>, python_tag: &str) -> Self {
        let root = root.as_ref().to_path_buf();
        let lib = root.join("lib").join(python_tag).join("site-packages");
        Self {
            purelib: lib.clone(),
            platlib: lib,
            scripts: root.join("bin"),
            data: root.clone(),
            include: root.join("include"),
            root,
        }
    }

    pub fn windows(root: impl AsRef<Utf8Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let lib = root.join("Lib").join("site-packages");
        Self {
            purelib: lib.clone(),
            platlib: lib,
            scripts: root.join("Scripts"),
            data: root.clone(),
            include: root.join("Include"),
            root,
        }
    }
}

/// A directory rooted at an interpreter executable plus its introspected metadata: compatible
/// wheel tags, marker environment, and on-disk layout.
#[derive(Debug, Clone)]
pub struct Environment {
    pub interpreter: Utf8PathBuf,
    pub layout: EnvironmentLayout,
    pub markers: MarkerEnvironment,
    /// `(python_tag, abi_tag, platform_tag)` triples this interpreter's wheels may carry,
    /// ordered most-specific first (platform_tags::Tags equivalent).
    pub compatible_tags: Vec<(String, String, String)>,
}

impl Environment {
    pub fn is_compatible_with(&self, tags: &[(String, String, String)]) -> bool {
        tags.iter().any(|t| self.compatible_tags.contains(t))
    }
}

/// An empty directory reserved for future materialization by the environment zoo: it exists on
/// disk but has no interpreter yet, so none of `Environment`'s introspected fields are available.
#[derive(Debug, Clone)]
pub struct UninitializedEnvironment {
    pub root: Utf8PathBuf,
}

/// Either an environment ready to receive installs, or a reserved-but-empty directory awaiting
/// interpreter materialization.
#[derive(Debug, Clone)]
pub enum EnvironmentState {
    Ready(Environment),
    Uninitialized(UninitializedEnvironment),
}

impl EnvironmentState {
    pub fn as_ready(&self) -> Option<&Environment> {
        match self {
            Self::Ready(env) => Some(env),
            Self::Uninitialized(_) => None,
        }
    }
}
