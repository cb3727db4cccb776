//! Deferred removal of temporary files.
//!
//! Files handed to an archive writer may still be read after the call that
//! produced them returns, so they cannot be removed right away. They are
//! registered here instead and removed by an explicit [`CleanupRegistry::flush`],
//! typically at the end of the build through a [`FlushOnDrop`] guard.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;

static GLOBAL: Lazy<Arc<CleanupRegistry>> = Lazy::new(|| Arc::new(CleanupRegistry::new()));

#[derive(Debug, Default)]
pub struct CleanupRegistry {
    pending: Mutex<Vec<PathBuf>>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Arc<CleanupRegistry> {
        Arc::clone(&GLOBAL)
    }

    /// Schedule `path` for removal on the next flush.
    pub fn register(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let mut pending = self.lock();
        if !pending.contains(&path) {
            pending.push(path);
        }
    }

    pub fn is_registered(&self, path: &Path) -> bool {
        self.lock().iter().any(|p| p == path)
    }

    pub fn pending(&self) -> Vec<PathBuf> {
        self.lock().clone()
    }

    /// Remove every registered file, most recent first.
    ///
    /// Removal is best effort; failures are logged and the path is dropped
    /// from the registry either way. Returns the number of files removed.
    pub fn flush(&self) -> usize {
        let drained: Vec<PathBuf> = std::mem::take(&mut *self.lock());
        let mut removed = 0;

        for path in drained.iter().rev() {
            match std::fs::remove_file(path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove temporary file");
                }
            }
        }

        removed
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PathBuf>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Flushes a registry when dropped.
pub struct FlushOnDrop(Arc<CleanupRegistry>);

impl FlushOnDrop {
    pub fn new(registry: Arc<CleanupRegistry>) -> Self {
        Self(registry)
    }

    pub fn global() -> Self {
        Self(CleanupRegistry::global())
    }
}

impl Drop for FlushOnDrop {
    fn drop(&mut self) {
        self.0.flush();
    }
}
