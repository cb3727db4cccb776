//! Artifact and project descriptors used as placement input and as
//! interpolation context.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Maven-style coordinates of a resolved artifact.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactId {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    #[serde(default)]
    pub base_version: Option<String>,
    #[serde(default)]
    pub classifier: Option<String>,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(rename = "type", default = "default_extension")]
    pub kind: String,
}

fn default_extension() -> String {
    String::from("jar")
}

impl ArtifactId {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            base_version: None,
            classifier: None,
            extension: default_extension(),
            kind: default_extension(),
        }
    }

    pub fn classifier(mut self, classifier: impl Into<String>) -> Self {
        let classifier = classifier.into();
        self.classifier = (!classifier.is_empty()).then_some(classifier);
        self
    }

    /// Set both the file extension and the artifact type.
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self.kind = self.extension.clone();
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn base_version(mut self, base_version: impl Into<String>) -> Self {
        self.base_version = Some(base_version.into());
        self
    }

    /// The base version, falling back to the version.
    pub fn effective_base_version(&self) -> &str {
        self.base_version.as_deref().unwrap_or(&self.version)
    }

    /// `-classifier` when a classifier is present, otherwise empty.
    pub fn dash_classifier(&self) -> String {
        self.classifier
            .as_deref()
            .map(|c| format!("-{c}"))
            .unwrap_or_default()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.kind)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        write!(f, ":{}", self.version)
    }
}

/// A resolved artifact and its file, if it has one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactRef {
    pub id: ArtifactId,
    pub file: Option<PathBuf>,
}

impl ArtifactRef {
    pub fn new(id: ArtifactId, file: Option<PathBuf>) -> Self {
        Self { id, file }
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }
}

/// Coordinates and properties of a project.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectRef {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub name: Option<String>,
    pub properties: BTreeMap<String, String>,
}

impl ProjectRef {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Coordinate named `field`: `groupId`, `artifactId`, `version` or
    /// `name`.
    pub fn field(&self, field: &str) -> Option<String> {
        match field {
            "groupId" => Some(self.group_id.clone()),
            "artifactId" => Some(self.artifact_id.clone()),
            "version" => Some(self.version.clone()),
            "name" => self.name.clone(),
            _ => None,
        }
    }

    /// Value of a `project.*` or `pom.*` token, then of a raw property key.
    pub fn lookup(&self, token: &str) -> Option<String> {
        token
            .strip_prefix("project.")
            .or_else(|| token.strip_prefix("pom."))
            .and_then(|field| self.field(field))
            .or_else(|| self.properties.get(token).cloned())
    }
}
