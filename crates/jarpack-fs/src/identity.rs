use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

/// Resolve a path to the form used for identity comparison.
///
/// Existing paths are canonicalized so that symlinks and relative segments
/// collapse onto the same filesystem object. Paths that do not exist yet (an
/// archive that is still being written, for instance) fall back to a lexical
/// absolute form.
pub fn identity_path(path: &Path) -> Cow<'_, Path> {
    if let Ok(canonical) = path.canonicalize() {
        return Cow::Owned(canonical);
    }

    match std::path::absolute(path) {
        Ok(absolute) => Cow::Owned(normalize_lexically(&absolute)),
        Err(_) => Cow::Borrowed(path),
    }
}

/// Whether two paths denote the same filesystem object.
pub fn same_file(a: impl AsRef<Path>, b: impl AsRef<Path>) -> bool {
    identity_path(a.as_ref()) == identity_path(b.as_ref())
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            other => result.push(other.as_os_str()),
        }
    }

    result
}
