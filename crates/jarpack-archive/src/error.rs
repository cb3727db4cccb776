use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid permission mode: {0:#o}")]
    InvalidMode(u32),

    #[error("invalid permission mode: '{0}'")]
    UnparsableMode(String),

    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: globset::Error,
    },

    #[error("failed to read '{path}': {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write '{path}': {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("zip error in '{path}': {source}")]
    Zip {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("failed to sanitize '{path}': {source}")]
    Sanitize { path: PathBuf, source: io::Error },

    #[error("failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("stream transformer failed for entry '{entry}': {source}")]
    Transform { entry: String, source: io::Error },
}

pub type Result<T> = std::result::Result<T, Error>;
