//! Where and how an artifact lands in the archive.
//!
//! An artifact is either added as one entry (flat placement, with nested jar
//! sanitization) or expanded under a prefix (unpacked placement). Exactly one
//! of the two runs per artifact.

use std::path::Path;
use std::sync::Arc;

use jarpack_archive::{
    Archiver, ArchivedFileSet, DEFAULT_INCLUDES, FileSet, Mode, SanitizeOptions, Sanitized, StreamTransformer,
};
use serde::Deserialize;

use crate::artifact::ArtifactRef;
use crate::error::{Error, Result};

/// Placement settings for one artifact.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlacementSpec {
    pub output_directory: Option<String>,
    pub file_name_mapping: Option<String>,
    pub unpack: bool,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub use_default_excludes: bool,
    pub file_mode: Option<Mode>,
    pub directory_mode: Option<Mode>,
}

impl Default for PlacementSpec {
    fn default() -> Self {
        Self {
            output_directory: None,
            file_name_mapping: None,
            unpack: false,
            includes: Vec::new(),
            excludes: Vec::new(),
            use_default_excludes: true,
            file_mode: None,
            directory_mode: None,
        }
    }
}

impl PlacementSpec {
    /// Fill the output directory and file name templates where unset.
    pub fn with_defaults(mut self, output_directory: Option<&str>, file_name_mapping: Option<&str>) -> Self {
        if self.output_directory.is_none() {
            self.output_directory = output_directory.map(String::from);
        }
        if self.file_name_mapping.is_none() {
            self.file_name_mapping = file_name_mapping.map(String::from);
        }
        self
    }

    pub fn output_directory(mut self, template: impl Into<String>) -> Self {
        self.output_directory = Some(template.into());
        self
    }

    pub fn file_name_mapping(mut self, template: impl Into<String>) -> Self {
        self.file_name_mapping = Some(template.into());
        self
    }

    pub fn unpack(mut self, unpack: bool) -> Self {
        self.unpack = unpack;
        self
    }

    pub fn includes<I: IntoIterator<Item = S>, S: Into<String>>(mut self, patterns: I) -> Self {
        self.includes = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn excludes<I: IntoIterator<Item = S>, S: Into<String>>(mut self, patterns: I) -> Self {
        self.excludes = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn use_default_excludes(mut self, enabled: bool) -> Self {
        self.use_default_excludes = enabled;
        self
    }

    pub fn file_mode(mut self, mode: Option<Mode>) -> Self {
        self.file_mode = mode;
        self
    }

    pub fn directory_mode(mut self, mode: Option<Mode>) -> Self {
        self.directory_mode = mode;
        self
    }

    /// Include patterns, falling back to [`DEFAULT_INCLUDES`].
    pub fn effective_includes(&self) -> Vec<String> {
        if self.includes.is_empty() {
            DEFAULT_INCLUDES.iter().map(|p| p.to_string()).collect()
        } else {
            self.includes.clone()
        }
    }
}

/// What a placement did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Added as a single entry.
    File { destination: String, sanitized: Sanitized },
    /// Directory contents added under `prefix`.
    Directory { prefix: String },
    /// Archive members expanded under `prefix`.
    Archive { prefix: String },
    /// Unpacking was requested but the artifact has no file.
    Skipped,
}

/// Add the artifact's file as the entry `destination`, sanitizing nested
/// jars first.
pub fn place_as_file<A: Archiver + ?Sized>(
    archiver: &mut A,
    artifact: &ArtifactRef,
    destination: String,
    file_mode: Option<Mode>,
    sanitize: &SanitizeOptions,
) -> Result<Placement> {
    let Some(file) = artifact.file() else {
        return Err(Error::MissingFile {
            artifact: artifact.id.to_string(),
        });
    };

    let archive_error = |source: jarpack_archive::Error| Error::ArchiveCreation {
        artifact: artifact.id.to_string(),
        destination: Some(destination.clone()),
        source,
    };

    let sanitized = jarpack_archive::sanitize_with(file, sanitize).map_err(archive_error)?;

    tracing::debug!(
        artifact = %artifact.id,
        file = %sanitized.path().display(),
        destination = %destination,
        "adding artifact"
    );

    archiver
        .add_file(sanitized.path(), &destination, file_mode)
        .map_err(archive_error)?;

    Ok(Placement::File {
        destination,
        sanitized,
    })
}

/// Expand the artifact's directory or archive under `output_directory`.
pub fn place_unpacked<A: Archiver + ?Sized>(
    archiver: &mut A,
    artifact: &ArtifactRef,
    output_directory: &str,
    spec: &PlacementSpec,
    transformer: Option<Arc<dyn StreamTransformer>>,
    encoding: Option<&str>,
) -> Result<Placement> {
    let mut prefix = output_directory.to_string();
    if !prefix.is_empty() && !prefix.ends_with('/') {
        prefix.push('/');
    }

    let Some(file) = artifact.file() else {
        tracing::warn!(
            artifact = %artifact.id,
            "skipping artifact; it does not have an associated file or directory"
        );
        return Ok(Placement::Skipped);
    };

    let includes = spec.effective_includes();
    let archive_error = |source: jarpack_archive::Error| Error::ArchiveCreation {
        artifact: artifact.id.to_string(),
        destination: Some(prefix.clone()),
        source,
    };

    if file.is_dir() {
        tracing::debug!(artifact = %artifact.id, prefix = %prefix, "adding artifact directory contents");
        let set = FileSet::new(file)
            .includes(&includes)
            .excludes(&spec.excludes)
            .prefix(prefix.as_str())
            .transformer(transformer)
            .use_default_excludes(spec.use_default_excludes);
        archiver.add_file_set(set).map_err(archive_error)?;
        return Ok(Placement::Directory { prefix });
    }

    log_unpack(artifact, file, &prefix, &includes, &spec.excludes);
    let set = ArchivedFileSet::new(file)
        .includes(&includes)
        .excludes(&spec.excludes)
        .prefix(prefix.as_str())
        .transformer(transformer)
        .use_default_excludes(spec.use_default_excludes);
    archiver
        .add_archived_file_set(set, encoding)
        .map_err(archive_error)?;
    Ok(Placement::Archive { prefix })
}

fn log_unpack(artifact: &ArtifactRef, file: &Path, prefix: &str, includes: &[String], excludes: &[String]) {
    let excludes = if excludes.is_empty() {
        String::from("none")
    } else {
        excludes.join(", ")
    };
    tracing::debug!(
        artifact = %artifact.id,
        file = %file.display(),
        prefix,
        includes = %includes.join(", "),
        excludes = %excludes,
        "unpacking artifact contents"
    );
}
