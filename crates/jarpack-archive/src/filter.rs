use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::error::{Error, Result};

/// Included when a file set names no include patterns.
pub const DEFAULT_INCLUDES: &[&str] = &["**/*"];

/// Version-control and editor metadata skipped when default excludes are on.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    // Miscellaneous typical temporary files
    "**/*~",
    "**/#*#",
    "**/.#*",
    "**/%*%",
    "**/._*",
    // CVS
    "**/CVS",
    "**/CVS/**",
    "**/.cvsignore",
    // RCS
    "**/RCS",
    "**/RCS/**",
    // SCCS
    "**/SCCS",
    "**/SCCS/**",
    // Visual SourceSafe
    "**/vssver.scc",
    // MKS
    "**/project.pj",
    // Subversion
    "**/.svn",
    "**/.svn/**",
    // Arch
    "**/.arch-ids",
    "**/.arch-ids/**",
    // Bazaar
    "**/.bzr",
    "**/.bzr/**",
    "**/.bzrignore",
    // SurroundSCM
    "**/.MySCMServerInfo",
    // Mac
    "**/.DS_Store",
    // Serena Dimensions
    "**/.metadata",
    "**/.metadata/**",
    // Mercurial
    "**/.hg",
    "**/.hg/**",
    "**/.hgignore",
    // git
    "**/.git",
    "**/.git/**",
    "**/.gitignore",
    "**/.gitattributes",
    // BitKeeper
    "**/BitKeeper",
    "**/BitKeeper/**",
    "**/ChangeSet",
    "**/ChangeSet/**",
    // darcs
    "**/_darcs",
    "**/_darcs/**",
    "**/.darcsrepo",
    "**/.darcsrepo/**",
    "**/-darcs-backup*",
    "**/.darcs-temp-mail",
    // Monotone
    "**/_MTN",
    "**/_MTN/**",
];

/// Include/exclude matcher over `/`-separated relative paths.
///
/// Patterns follow the Ant conventions used by assembly descriptors: `*`
/// stays within one path segment, `**` spans any number of segments, and a
/// pattern ending in `/` matches everything below that directory.
#[derive(Clone, Debug)]
pub struct PathFilter {
    includes: GlobSet,
    excludes: GlobSet,
}

impl PathFilter {
    pub fn new<I, E>(includes: I, excludes: E, use_default_excludes: bool) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let includes: Vec<String> = includes.into_iter().map(|p| p.as_ref().to_string()).collect();
        let includes = if includes.is_empty() {
            compile(DEFAULT_INCLUDES.iter().copied())?
        } else {
            compile(includes.iter().map(String::as_str))?
        };

        let mut excludes: Vec<String> = excludes.into_iter().map(|p| p.as_ref().to_string()).collect();
        if use_default_excludes {
            excludes.extend(DEFAULT_EXCLUDES.iter().map(|p| p.to_string()));
        }
        let excludes = compile(excludes.iter().map(String::as_str))?;

        Ok(Self { includes, excludes })
    }

    /// Whether a relative path (no leading or trailing `/`) is selected.
    pub fn matches(&self, path: &str) -> bool {
        let path = normalize(path);
        self.includes.is_match(path.as_str()) && !self.excludes.is_match(path.as_str())
    }
}

fn compile<'a>(patterns: impl Iterator<Item = &'a str>) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let normalized = normalize_pattern(pattern);
        // `dir/**` also selects `dir` itself
        let parent = normalized.strip_suffix("/**").filter(|p| !p.is_empty());
        for glob in std::iter::once(normalized.as_str()).chain(parent) {
            let glob = GlobBuilder::new(glob)
                .literal_separator(true)
                .build()
                .map_err(|e| Error::Pattern {
                    pattern: pattern.to_string(),
                    source: e,
                })?;
            builder.add(glob);
        }
    }
    builder.build().map_err(|e| Error::Pattern {
        pattern: String::from("<set>"),
        source: e,
    })
}

fn normalize_pattern(pattern: &str) -> String {
    let mut normalized = pattern.trim().replace('\\', "/");
    if normalized.ends_with('/') {
        normalized.push_str("**");
    }
    normalized
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/").trim_matches('/').to_string()
}
