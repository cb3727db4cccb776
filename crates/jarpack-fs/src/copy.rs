use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Copy `src` into `dir`, keeping its file name.
///
/// `dir` is created if needed. An existing file with the same name is
/// overwritten. Returns the path of the copy.
pub fn copy_into(src: impl AsRef<Path>, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let src = src.as_ref();
    let dir = dir.as_ref();

    let name = src
        .file_name()
        .ok_or_else(|| Error::NoFileName(src.to_path_buf()))?;
    let dest = dir.join(name);

    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| Error::Write {
            path: dir.to_path_buf(),
            source: e,
        })?;
    }

    fs::copy(src, &dest).map_err(|e| Error::Copy {
        from: src.to_path_buf(),
        to: dest.clone(),
        source: e,
    })?;

    Ok(dest)
}
