use std::path::{Path, PathBuf};

use jarpack_archive::Archiver;

use crate::artifact::ArtifactId;
use crate::error::{Error, Result};

/// Whether `file` is the archive `archiver` is writing to.
pub fn is_archiver_destination<A: Archiver + ?Sized>(file: &Path, archiver: &A) -> bool {
    archiver
        .destination_file()
        .is_some_and(|destination| jarpack_fs::same_file(file, destination))
}

/// Keep an artifact from being read from the archive being written.
///
/// When `file` is the archiver's destination it is copied into `temp_root`
/// and the copy is returned; otherwise `file` is returned unchanged.
pub fn avoid_self_overwrite<A: Archiver + ?Sized>(
    file: &Path,
    archiver: &A,
    temp_root: &Path,
    id: &ArtifactId,
) -> Result<PathBuf> {
    if !is_archiver_destination(file, archiver) {
        return Ok(file.to_path_buf());
    }

    tracing::warn!(
        artifact = %id,
        "artifact references the same file as the assembly destination; moving it to a temporary location for inclusion"
    );

    jarpack_fs::copy_into(file, temp_root).map_err(|source| Error::Relocate {
        artifact: id.to_string(),
        from: file.to_path_buf(),
        to: file
            .file_name()
            .map_or_else(|| temp_root.to_path_buf(), |name| temp_root.join(name)),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    use jarpack_archive::ZipArchiver;

    fn id() -> ArtifactId {
        ArtifactId::new("org.example", "app", "1.0")
    }

    #[test]
    fn unrelated_file_is_left_alone() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("dep.jar");
        std::fs::write(&file, b"dep").unwrap();
        let archiver = ZipArchiver::new(dir.path().join("app.zip"));

        let result = avoid_self_overwrite(&file, &archiver, &dir.path().join("tmp"), &id()).unwrap();
        assert_eq!(result, file);
        assert!(!dir.path().join("tmp").exists());
    }

    #[test]
    fn destination_is_relocated_with_identical_bytes() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("app.zip");
        std::fs::write(&destination, b"previous build").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let archiver = ZipArchiver::new(dir.path().join("sub/../app.zip"));

        let temp_root = dir.path().join("tmp");
        let copy = avoid_self_overwrite(&destination, &archiver, &temp_root, &id()).unwrap();

        assert_ne!(copy, destination);
        assert_eq!(copy, temp_root.join("app.zip"));
        assert_eq!(std::fs::read(&copy).unwrap(), b"previous build");
        assert!(destination.exists());
    }

    #[test]
    fn missing_destination_file_is_a_relocate_error() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("app.zip");
        let archiver = ZipArchiver::new(&destination);

        let err = avoid_self_overwrite(&destination, &archiver, &dir.path().join("tmp"), &id()).unwrap_err();
        assert!(matches!(err, Error::Relocate { .. }));
        assert!(err.is_archive_creation());
    }
}
