//! Placement of build artifacts into assembly archives.
//!
//! # Architecture
//!
//! - `artifact.rs` - Artifact and project descriptors
//! - `config.rs` - Build-wide settings
//! - `format.rs` - Output directory and file name templates
//! - `placement.rs` - Flat and unpacked placement
//! - `mode_guard.rs` - Scoped mode overrides
//! - `collision.rs` - Self-overwrite avoidance
//! - `task.rs` - The add-artifact task

pub use artifact::{ArtifactId, ArtifactRef, ProjectRef};
pub use collision::{avoid_self_overwrite, is_archiver_destination};
pub use config::{AssemblyConfig, ConfigSource};
pub use error::{Error, Result};
pub use format::{
    DEFAULT_FILE_NAME_MAPPING, FormatContext, FormatError, Interpolator, TokenInterpolator, resolve_file_name,
    resolve_output_directory,
};
pub use mode_guard::{ModeOverride, with_mode_override};
pub use placement::{Placement, PlacementSpec, place_as_file, place_unpacked};
pub use task::AddArtifactTask;

pub use jarpack_archive::{Archiver, Mode, SanitizeOptions, Sanitized, StreamTransformer, ZipArchiver};
pub use jarpack_fs::{CleanupRegistry, FlushOnDrop};

mod artifact;
mod collision;
mod config;
mod error;
pub mod format;
mod mode_guard;
mod placement;
mod task;
