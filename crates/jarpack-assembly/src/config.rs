use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::Deserialize;

use crate::artifact::ProjectRef;
use crate::error::Result;
use crate::format::{Interpolator, TokenInterpolator};

static TOKEN_INTERPOLATOR: TokenInterpolator = TokenInterpolator;

/// Build-wide settings consulted while placing artifacts.
pub trait ConfigSource {
    /// Final name of the assembly, available to templates as `${finalName}`.
    fn final_name(&self) -> Option<&str>;

    /// The main project, answering `project.*` and `pom.*` tokens.
    fn project(&self) -> Option<&ProjectRef>;

    /// Where relocated artifact copies are written.
    fn temporary_root_directory(&self) -> &Path;

    fn interpolator(&self) -> &dyn Interpolator {
        &TOKEN_INTERPOLATOR
    }
}

/// File and environment backed [`ConfigSource`].
///
/// Environment variables prefixed `JARPACK_` override file values, e.g.
/// `JARPACK_FINAL_NAME`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AssemblyConfig {
    #[serde(default)]
    pub final_name: Option<String>,
    #[serde(default = "default_temporary_root")]
    pub temporary_root: PathBuf,
    #[serde(default)]
    pub project: Option<ProjectRef>,
}

fn default_temporary_root() -> PathBuf {
    std::env::temp_dir().join("jarpack")
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            final_name: None,
            temporary_root: default_temporary_root(),
            project: None,
        }
    }
}

impl AssemblyConfig {
    pub fn new(temporary_root: impl Into<PathBuf>) -> Self {
        Self {
            temporary_root: temporary_root.into(),
            ..Self::default()
        }
    }

    pub fn with_final_name(mut self, final_name: impl Into<String>) -> Self {
        self.final_name = Some(final_name.into());
        self
    }

    pub fn with_project(mut self, project: ProjectRef) -> Self {
        self.project = Some(project);
        self
    }

    /// Load from a TOML file, then apply `JARPACK_*` environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::figment(path).extract().map_err(Into::into)
    }

    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("JARPACK_"))
    }
}

impl ConfigSource for AssemblyConfig {
    fn final_name(&self) -> Option<&str> {
        self.final_name.as_deref()
    }

    fn project(&self) -> Option<&ProjectRef> {
        self.project.as_ref()
    }

    fn temporary_root_directory(&self) -> &Path {
        &self.temporary_root
    }
}
