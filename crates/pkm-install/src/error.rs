use camino::Utf8PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error("`{0}` has no `.dist-info` directory at its top level")]
    MissingDistInfo(Utf8PathBuf),
    #[error("`{path}` is missing the `{field}` field its METADATA must declare")]
    MissingMetadataField { path: Utf8PathBuf, field: &'static str },
    #[error("RECORD entry for `{0}` does not match the file on disk")]
    RecordMismatch(String),
    #[error("`{0}` already exists")]
    FileExists(Utf8PathBuf),
}
