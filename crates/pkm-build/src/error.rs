use camino::Utf8PathBuf;

use pkm_distribution::PackageDescriptor;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Venv(#[from] pkm_venv::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error("no local interpreter satisfies the project's `requires-python`")]
    IncompatibleInterpreter,
    #[error("unsupported source archive extension on `{0}`")]
    UnsupportedArchiveType(Utf8PathBuf),
    #[error("`{0}` is not a valid source distribution: {1}")]
    InvalidSourceDistribution(Utf8PathBuf, String),
    #[error("invalid `pyproject.toml` at `{0}`")]
    InvalidPyprojectToml(Utf8PathBuf, #[source] toml::de::Error),
    #[error("failed to install build requirements: {0}")]
    RequirementsInstall(String),
    #[error("build backend `{backend}` failed running `{hook}`:\n--- stdout:\n{stdout}\n--- stderr:\n{stderr}\n---")]
    HookFailed { backend: String, hook: &'static str, stdout: String, stderr: String },
    #[error("build backend `{backend}` does not define the required hook `{hook}`")]
    UndefinedRequiredHook { backend: String, hook: &'static str },
    #[error("build backend `{backend}` did not write the expected artifact after `{hook}`")]
    MissingOutput { backend: String, hook: &'static str },
    #[error("build cycle detected: {0:?} is already being built in this execution context")]
    Cycle(PackageDescriptor),
    #[error("build of `{0}` exceeded its deadline")]
    Timeout(PackageDescriptor),
}
