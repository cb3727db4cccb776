//! Stripping of foreign-platform native binaries from nested jars.
//!
//! A jar added as a single entry is rewritten without the members selected by
//! [`SKIP_POLICY`]. When nothing matches, the original file is used as is and
//! no temporary file survives the call.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jarpack_fs::CleanupRegistry;
use zip::result::ZipResult;
use zip::{ZipArchive, ZipWriter};

use crate::error::{Error, Result};

/// One row of the skip policy.
///
/// A member is skipped when the containing jar's file name starts with one of
/// `archive_prefixes` (or the list is empty), the member path starts with one
/// of `member_prefixes`, and its extension is one of `extensions` (or the list
/// is empty). Extension comparison ignores case; prefixes do not.
#[derive(Clone, Copy, Debug)]
pub struct SkipRule {
    pub archive_prefixes: &'static [&'static str],
    pub member_prefixes: &'static [&'static str],
    pub extensions: &'static [&'static str],
}

impl SkipRule {
    pub fn applies_to(&self, archive_name: &str, member: &str) -> bool {
        if !self.archive_prefixes.is_empty()
            && !self.archive_prefixes.iter().any(|p| archive_name.starts_with(p))
        {
            return false;
        }

        if !self.member_prefixes.iter().any(|p| member.starts_with(p)) {
            return false;
        }

        self.extensions.is_empty() || {
            let ext = extension(member);
            self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
        }
    }
}

/// Ordered skip policy for nested jar members.
pub static SKIP_POLICY: &[SkipRule] = &[
    SkipRule {
        archive_prefixes: &[],
        member_prefixes: &["android/sdk19/", "android/sdk23/lib/"],
        extensions: &[],
    },
    SkipRule {
        archive_prefixes: &["capstone-", "keystone-"],
        member_prefixes: &["win32-x86/", "darwin/", "win32-x86-64/"],
        extensions: &[],
    },
    SkipRule {
        archive_prefixes: &[],
        member_prefixes: &[
            "com/sun/jna/win32-x86/",
            "com/sun/jna/aix-ppc64/",
            "com/sun/jna/darwin/",
            "com/sun/jna/linux-x86/",
            "com/sun/jna/linux-arm/",
            "com/sun/jna/linux-armel/",
            "com/sun/jna/linux-aarch64/",
            "com/sun/jna/linux-ppc/",
            "com/sun/jna/linux-ppc64le/",
            "com/sun/jna/linux-mips64el/",
            "com/sun/jna/linux-s390x/",
            "com/sun/jna/sunos-x86/",
            "com/sun/jna/sunos-x86-64/",
            "com/sun/jna/sunos-sparc/",
            "com/sun/jna/sunos-sparcv9/",
            "com/sun/jna/freebsd-x86/",
            "com/sun/jna/freebsd-x86-64/",
            "com/sun/jna/openbsd-x86/",
            "com/sun/jna/openbsd-x86-64/",
            "com/sun/jna/win32-x86-64/",
            "com/sun/jna/aix-ppc/",
        ],
        extensions: &[],
    },
    SkipRule {
        archive_prefixes: &[],
        member_prefixes: &["natives/osx_64/lib", "android/lib/", "natives/windows_"],
        extensions: &["so", "dylib", "dll"],
    },
];

/// The first rule of [`SKIP_POLICY`] that drops `member` from `archive_name`.
pub fn matching_rule(archive_name: &str, member: &str) -> Option<&'static SkipRule> {
    SKIP_POLICY.iter().find(|rule| rule.applies_to(archive_name, member))
}

/// Outcome of [`sanitize`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sanitized {
    /// Nothing was stripped; the input file is used unchanged.
    Original(PathBuf),
    /// A rewritten copy, registered for deferred removal.
    Replaced(PathBuf),
}

impl Sanitized {
    pub fn path(&self) -> &Path {
        match self {
            Self::Original(path) | Self::Replaced(path) => path,
        }
    }

    pub fn was_modified(&self) -> bool {
        matches!(self, Self::Replaced(_))
    }
}

#[derive(Clone, Debug)]
pub struct SanitizeOptions {
    pub temp_dir: Option<PathBuf>,
    pub registry: Arc<CleanupRegistry>,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            temp_dir: None,
            registry: CleanupRegistry::global(),
        }
    }
}

impl SanitizeOptions {
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn registry(mut self, registry: Arc<CleanupRegistry>) -> Self {
        self.registry = registry;
        self
    }
}

/// Sanitize `file` with default options.
pub fn sanitize(file: impl AsRef<Path>) -> Result<Sanitized> {
    sanitize_with(file, &SanitizeOptions::default())
}

pub fn sanitize_with(file: impl AsRef<Path>, options: &SanitizeOptions) -> Result<Sanitized> {
    let file = file.as_ref();

    if !is_jar(file) {
        return Ok(Sanitized::Original(file.to_path_buf()));
    }
    let Ok(source) = File::open(file) else {
        return Ok(Sanitized::Original(file.to_path_buf()));
    };

    let archive_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut builder = tempfile::Builder::new();
    builder.prefix(&stem).suffix(".jar");
    let temp = match &options.temp_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(|e| Error::Sanitize {
        path: file.to_path_buf(),
        source: e,
    })?;

    let mut archive = ZipArchive::new(BufReader::new(source)).map_err(|e| Error::Zip {
        path: file.to_path_buf(),
        source: e,
    })?;
    let target = temp.reopen().map_err(|e| Error::Sanitize {
        path: temp.path().to_path_buf(),
        source: e,
    })?;

    // `temp` removes the partial copy on every early return below.
    let skipped = copy_kept_members(&mut archive, ZipWriter::new(target), &archive_name).map_err(|e| {
        Error::Zip {
            path: file.to_path_buf(),
            source: e,
        }
    })?;

    if skipped == 0 {
        return Ok(Sanitized::Original(file.to_path_buf()));
    }

    let path = temp.into_temp_path().keep().map_err(|e| Error::Sanitize {
        path: file.to_path_buf(),
        source: e.error,
    })?;
    options.registry.register(&path);

    tracing::debug!(
        archive = %file.display(),
        replacement = %path.display(),
        skipped,
        "sanitized nested jar"
    );
    Ok(Sanitized::Replaced(path))
}

fn copy_kept_members(
    archive: &mut ZipArchive<BufReader<File>>,
    mut writer: ZipWriter<File>,
    archive_name: &str,
) -> ZipResult<usize> {
    let mut skipped = 0;

    for index in 0..archive.len() {
        let member = archive.by_index_raw(index)?;
        if matching_rule(archive_name, member.name()).is_some() {
            tracing::info!(archive = archive_name, member = member.name(), "skip");
            skipped += 1;
            continue;
        }
        writer.raw_copy_file(member)?;
    }

    writer.finish()?;
    Ok(skipped)
}

fn is_jar(file: &Path) -> bool {
    file.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("jar"))
}

/// Text after the last `.` of the final path segment, or `""`.
fn extension(member: &str) -> &str {
    let name = member.rsplit(['/', '\\']).next().unwrap_or(member);
    name.rsplit_once('.').map_or("", |(_, ext)| ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    fn write_jar(path: &Path, members: &[(&str, &[u8])]) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        for (name, content) in members {
            if name.ends_with('/') {
                writer.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                writer.start_file(*name, SimpleFileOptions::default()).unwrap();
                writer.write_all(content).unwrap();
            }
        }
        writer.finish().unwrap();
    }

    fn read_jar(path: &Path) -> Vec<(String, Vec<u8>)> {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut member = archive.by_index(i).unwrap();
                let mut content = Vec::new();
                member.read_to_end(&mut content).unwrap();
                (member.name().to_string(), content)
            })
            .collect()
    }

    fn options(dir: &Path) -> SanitizeOptions {
        SanitizeOptions::default()
            .temp_dir(dir)
            .registry(Arc::new(CleanupRegistry::new()))
    }

    fn temp_entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn extension_of_member() {
        assert_eq!(extension("natives/windows_64/lwjgl.DLL"), "DLL");
        assert_eq!(extension("a.b/c"), "");
        assert_eq!(extension("lib.so"), "so");
        assert_eq!(extension("README"), "");
    }

    #[test]
    fn sdk_directories_always_skipped() {
        assert!(matching_rule("any.jar", "android/sdk19/classes.dex").is_some());
        assert!(matching_rule("any.jar", "android/sdk23/lib/x.so").is_some());
        assert!(matching_rule("any.jar", "android/sdk23/other").is_none());
    }

    #[test]
    fn platform_directories_only_for_named_archives() {
        assert!(matching_rule("capstone-3.0.jar", "win32-x86/capstone.dll").is_some());
        assert!(matching_rule("keystone-0.9.jar", "darwin/libkeystone.dylib").is_some());
        assert!(matching_rule("capstone-3.0.jar", "linux-x86-64/libcapstone.so").is_none());
        assert!(matching_rule("other-1.0.jar", "win32-x86/capstone.dll").is_none());
    }

    #[test]
    fn jna_platforms_always_skipped() {
        assert!(matching_rule("jna-5.jar", "com/sun/jna/linux-x86/libjnidispatch.so").is_some());
        assert!(matching_rule("x.jar", "com/sun/jna/aix-ppc/libjnidispatch.a").is_some());
        assert!(matching_rule("x.jar", "com/sun/jna/linux-x86-64/libjnidispatch.so").is_none());
        assert!(matching_rule("x.jar", "com/sun/jna/Native.class").is_none());
    }

    #[test]
    fn natives_skipped_only_for_shared_libraries() {
        assert!(matching_rule("x.jar", "natives/osx_64/libfoo.dylib").is_some());
        assert!(matching_rule("x.jar", "natives/windows_x86/foo.DLL").is_some());
        assert!(matching_rule("x.jar", "android/lib/arm64/libfoo.so").is_some());
        assert!(matching_rule("x.jar", "natives/windows_x86/readme.txt").is_none());
        assert!(matching_rule("x.jar", "natives/linux_64/libfoo.so").is_none());
    }

    #[test]
    fn non_jar_is_returned_unchanged() {
        let dir = tempdir().unwrap();
        let tmp = tempdir().unwrap();
        let path = dir.path().join("bundle.zip");
        write_jar(&path, &[("com/sun/jna/linux-x86/libjnidispatch.so", b"elf")]);

        let result = sanitize_with(&path, &options(tmp.path())).unwrap();
        assert_eq!(result, Sanitized::Original(path));
        assert_eq!(temp_entries(tmp.path()), 0);
    }

    #[test]
    fn missing_jar_is_returned_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.jar");
        let result = sanitize_with(&path, &options(dir.path())).unwrap();
        assert_eq!(result, Sanitized::Original(path));
    }

    #[test]
    fn clean_jar_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let tmp = tempdir().unwrap();
        let path = dir.path().join("clean-1.0.JAR");
        write_jar(&path, &[("META-INF/", b""), ("com/example/A.class", b"cafebabe")]);

        let result = sanitize_with(&path, &options(tmp.path())).unwrap();
        assert!(!result.was_modified());
        assert_eq!(result.path(), path);
        assert_eq!(temp_entries(tmp.path()), 0);
    }

    #[test]
    fn matching_members_are_stripped_in_order() {
        let dir = tempdir().unwrap();
        let tmp = tempdir().unwrap();
        let path = dir.path().join("foo-1.0.jar");
        write_jar(&path, &[
            ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n"),
            ("com/sun/jna/linux-x86/libjnidispatch.so", b"elf"),
            ("com/sun/jna/Native.class", b"cafebabe"),
            ("natives/windows_64/foo.dll", b"mz"),
            ("natives/windows_64/foo.txt", b"text"),
        ]);

        let opts = options(tmp.path());
        let result = sanitize_with(&path, &opts).unwrap();
        assert!(result.was_modified());
        assert_ne!(result.path(), path);
        assert!(opts.registry.is_registered(result.path()));

        let members = read_jar(result.path());
        let names: Vec<_> = members.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["META-INF/MANIFEST.MF", "com/sun/jna/Native.class", "natives/windows_64/foo.txt"]);
        assert_eq!(members[0].1, b"Manifest-Version: 1.0\n");
        assert_eq!(members[1].1, b"cafebabe");

        // the original is untouched
        assert_eq!(read_jar(&path).len(), 5);
    }

    #[test]
    fn sanitizing_twice_is_a_no_op() {
        let dir = tempdir().unwrap();
        let tmp = tempdir().unwrap();
        let path = dir.path().join("capstone-3.0.jar");
        write_jar(&path, &[
            ("win32-x86/capstone.dll", b"mz"),
            ("linux-x86-64/libcapstone.so", b"elf"),
        ]);

        let opts = options(tmp.path());
        let first = sanitize_with(&path, &opts).unwrap();
        assert!(first.was_modified());
        assert_eq!(temp_entries(tmp.path()), 1);

        // the replacement is named after the original, so the same rules apply
        let second = sanitize_with(first.path(), &opts).unwrap();
        assert_eq!(second, Sanitized::Original(first.path().to_path_buf()));
        assert_eq!(temp_entries(tmp.path()), 1);
        assert_eq!(opts.registry.flush(), 1);
    }

    #[test]
    fn corrupt_jar_is_an_error_and_cleans_up() {
        let dir = tempdir().unwrap();
        let tmp = tempdir().unwrap();
        let path = dir.path().join("broken.jar");
        std::fs::write(&path, b"not a zip").unwrap();

        let result = sanitize_with(&path, &options(tmp.path()));
        assert!(matches!(result, Err(Error::Zip { .. })));
        assert_eq!(temp_entries(tmp.path()), 0);
    }
}
