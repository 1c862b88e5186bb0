use camino::Utf8PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0} already exists and is not an environment created by pkm")]
    FileExists(Utf8PathBuf),
    #[error("no local interpreter satisfies `{0}`")]
    IncompatibleInterpreter(pkm_version::VersionSpecifier),
    #[error(transparent)]
    Interpreter(#[from] pkm_interpreter::QueryError),
    #[error("failed to (de)serialize {path}: {source}")]
    Toml { path: Utf8PathBuf, source: Box<dyn std::error::Error + Send + Sync> },
}
