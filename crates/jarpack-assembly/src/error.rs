use std::path::PathBuf;

use crate::format::FormatError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("error adding artifact '{artifact}'{}: {source}", describe_destination(.destination))]
    ArchiveCreation {
        artifact: String,
        destination: Option<String>,
        source: jarpack_archive::Error,
    },

    #[error("error copying artifact '{artifact}' from '{from}' to '{to}': {source}")]
    Relocate {
        artifact: String,
        from: PathBuf,
        to: PathBuf,
        source: jarpack_fs::Error,
    },

    #[error("artifact '{artifact}' has no file to add")]
    MissingFile { artifact: String },

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Config(#[from] figment::Error),
}

impl Error {
    /// Whether the destination archive could not be built as requested.
    pub fn is_archive_creation(&self) -> bool {
        matches!(
            self,
            Self::ArchiveCreation { .. } | Self::Relocate { .. } | Self::MissingFile { .. }
        )
    }
}

fn describe_destination(destination: &Option<String>) -> String {
    match destination {
        Some(destination) => format!(" to '{destination}'"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
