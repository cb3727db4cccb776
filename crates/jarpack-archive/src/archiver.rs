//! The contract between artifact placement and the archive under construction.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;
use crate::filter::PathFilter;
use crate::mode::Mode;

/// Per-entry content rewriting hook.
///
/// Passed through to the archive writer untouched; the writer calls it once
/// for every regular file entry it emits from a file set.
pub trait StreamTransformer: Send + Sync {
    fn transform(&self, entry_name: &str, content: Vec<u8>) -> io::Result<Vec<u8>>;
}

impl<F> StreamTransformer for F
where
    F: Fn(&str, Vec<u8>) -> io::Result<Vec<u8>> + Send + Sync,
{
    fn transform(&self, entry_name: &str, content: Vec<u8>) -> io::Result<Vec<u8>> {
        self(entry_name, content)
    }
}

/// Destination archive under construction.
///
/// Implementations are shared across many artifact additions; callers must
/// serialize access to a single instance.
pub trait Archiver {
    /// Add `file` as a single entry named `destination`.
    ///
    /// `mode` takes precedence over the override file mode, which takes
    /// precedence over the writer's default.
    fn add_file(&mut self, file: &Path, destination: &str, mode: Option<Mode>) -> Result<()>;

    /// Add the filtered contents of a directory tree.
    fn add_file_set(&mut self, set: FileSet) -> Result<()>;

    /// Add the filtered members of an archive file.
    fn add_archived_file_set(&mut self, set: ArchivedFileSet, encoding: Option<&str>) -> Result<()>;

    /// The file the archive will be written to, if known.
    fn destination_file(&self) -> Option<&Path>;

    fn override_file_mode(&self) -> Option<Mode>;

    fn set_file_mode(&mut self, mode: Option<Mode>);

    fn override_directory_mode(&self) -> Option<Mode>;

    fn set_directory_mode(&mut self, mode: Option<Mode>);
}

/// Selection settings shared by [`FileSet`] and [`ArchivedFileSet`].
#[derive(Clone, Default)]
pub struct Selection {
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub prefix: String,
    pub transformer: Option<Arc<dyn StreamTransformer>>,
    pub use_default_excludes: bool,
}

impl Selection {
    pub fn filter(&self) -> Result<PathFilter> {
        PathFilter::new(&self.includes, &self.excludes, self.use_default_excludes)
    }
}

macro_rules! selection_builders {
    ($ty:ty) => {
        impl $ty {
            pub fn includes<I: IntoIterator<Item = S>, S: Into<String>>(mut self, patterns: I) -> Self {
                self.selection.includes = patterns.into_iter().map(Into::into).collect();
                self
            }

            pub fn excludes<I: IntoIterator<Item = S>, S: Into<String>>(mut self, patterns: I) -> Self {
                self.selection.excludes = patterns.into_iter().map(Into::into).collect();
                self
            }

            pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
                self.selection.prefix = prefix.into();
                self
            }

            pub fn transformer(mut self, transformer: Option<Arc<dyn StreamTransformer>>) -> Self {
                self.selection.transformer = transformer;
                self
            }

            pub fn use_default_excludes(mut self, enabled: bool) -> Self {
                self.selection.use_default_excludes = enabled;
                self
            }

            pub fn selection(&self) -> &Selection {
                &self.selection
            }
        }
    };
}

/// A directory tree to add.
#[derive(Clone)]
pub struct FileSet {
    pub directory: PathBuf,
    selection: Selection,
}

impl FileSet {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            selection: Selection {
                use_default_excludes: true,
                ..Selection::default()
            },
        }
    }
}

selection_builders!(FileSet);

/// An archive whose members are expanded into the destination.
#[derive(Clone)]
pub struct ArchivedFileSet {
    pub archive: PathBuf,
    selection: Selection,
}

impl ArchivedFileSet {
    pub fn new(archive: impl Into<PathBuf>) -> Self {
        Self {
            archive: archive.into(),
            selection: Selection {
                use_default_excludes: true,
                ..Selection::default()
            },
        }
    }
}

selection_builders!(ArchivedFileSet);
