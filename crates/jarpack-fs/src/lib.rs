//! Filesystem primitives used while placing artifacts into an archive.
//!
//! - `identity.rs` - Canonical file identity
//! - `copy.rs` - Relocation copies
//! - `cleanup.rs` - Deferred removal of temporary files

mod copy;
mod error;
mod identity;

pub mod cleanup;

pub use cleanup::{CleanupRegistry, FlushOnDrop};
pub use copy::copy_into;
pub use error::{Error, Result};
pub use identity::{identity_path, same_file};
