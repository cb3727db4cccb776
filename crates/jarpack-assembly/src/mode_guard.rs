//! Scoped file and directory mode overrides on an [`Archiver`].

use std::ops::{Deref, DerefMut};

use jarpack_archive::{Archiver, Mode};

/// Applies mode overrides for its lifetime and restores the previous
/// overrides on drop.
///
/// Only the modes that were set are touched, both when applying and when
/// restoring. Access the archiver through the guard while it is alive.
pub struct ModeOverride<'a, A: Archiver + ?Sized> {
    archiver: &'a mut A,
    previous_file: Option<Option<Mode>>,
    previous_directory: Option<Option<Mode>>,
}

impl<'a, A: Archiver + ?Sized> ModeOverride<'a, A> {
    pub fn new(archiver: &'a mut A, file_mode: Option<Mode>, directory_mode: Option<Mode>) -> Self {
        let previous_file = file_mode.map(|mode| {
            let previous = archiver.override_file_mode();
            archiver.set_file_mode(Some(mode));
            previous
        });
        let previous_directory = directory_mode.map(|mode| {
            let previous = archiver.override_directory_mode();
            archiver.set_directory_mode(Some(mode));
            previous
        });

        Self {
            archiver,
            previous_file,
            previous_directory,
        }
    }
}

impl<A: Archiver + ?Sized> Deref for ModeOverride<'_, A> {
    type Target = A;

    fn deref(&self) -> &A {
        &*self.archiver
    }
}

impl<A: Archiver + ?Sized> DerefMut for ModeOverride<'_, A> {
    fn deref_mut(&mut self) -> &mut A {
        &mut *self.archiver
    }
}

impl<A: Archiver + ?Sized> Drop for ModeOverride<'_, A> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous_directory.take() {
            self.archiver.set_directory_mode(previous);
        }
        if let Some(previous) = self.previous_file.take() {
            self.archiver.set_file_mode(previous);
        }
    }
}

/// Run `body` with the given overrides applied.
pub fn with_mode_override<A, T, F>(
    archiver: &mut A,
    file_mode: Option<Mode>,
    directory_mode: Option<Mode>,
    body: F,
) -> T
where
    A: Archiver + ?Sized,
    F: FnOnce(&mut A) -> T,
{
    let mut guard = ModeOverride::new(archiver, file_mode, directory_mode);
    body(&mut *guard)
}
