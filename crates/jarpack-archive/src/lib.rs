//! Archive-side building blocks for placing artifacts into an assembly.
//!
//! # Architecture
//!
//! - `archiver.rs` - Archive writer contract and file-set descriptors
//! - `filter.rs` - Include/exclude pattern matching
//! - `mode.rs` - Entry permission bits
//! - `sanitize.rs` - Nested jar sanitization
//! - `writer.rs` - Zip-backed archive writer

pub use archiver::{Archiver, ArchivedFileSet, FileSet, Selection, StreamTransformer};
pub use error::{Error, Result};
pub use filter::{DEFAULT_EXCLUDES, DEFAULT_INCLUDES, PathFilter};
pub use mode::Mode;
pub use sanitize::{SKIP_POLICY, SanitizeOptions, Sanitized, SkipRule, sanitize, sanitize_with};
pub use writer::ZipArchiver;

pub mod archiver;
mod error;
pub mod filter;
mod mode;
pub mod sanitize;
mod writer;
