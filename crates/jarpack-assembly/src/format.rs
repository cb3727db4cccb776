//! Output directory and file name templates.
//!
//! Templates contain `${token}` references that are resolved against a
//! [`FormatContext`]. Resolution order, first hit wins:
//!
//! 1. the artifact (`artifact.*` and the bare `groupId`, `version`, ...)
//! 2. `dashClassifier` / `dashClassifier?`
//! 3. `module.*`: the module artifact, then the module project
//! 4. `finalName`
//! 5. `artifact.*` against the project the artifact belongs to
//! 6. `project.*` / `pom.*` against the main project
//! 7. raw properties of the main project, then the module and artifact
//!    projects
//!
//! Unknown tokens are left in place.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::artifact::{ArtifactId, ProjectRef};

/// File name used when a placement names no mapping.
pub const DEFAULT_FILE_NAME_MAPPING: &str =
    "${artifact.artifactId}-${artifact.version}${dashClassifier?}.${artifact.extension}";

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^{}]*)\}").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("unterminated token in '{template}'")]
    Unterminated { template: String },
}

/// Values available to a template.
#[derive(Clone, Copy, Debug, Default)]
pub struct FormatContext<'a> {
    pub artifact: Option<&'a ArtifactId>,
    pub module_artifact: Option<&'a ArtifactId>,
    pub final_name: Option<&'a str>,
    /// Answers `module.*` once the module artifact has no match.
    pub module_project: Option<&'a ProjectRef>,
    /// Answers `artifact.*` once the artifact has no match.
    pub artifact_project: Option<&'a ProjectRef>,
    /// Answers `project.*` and `pom.*`.
    pub main_project: Option<&'a ProjectRef>,
}

impl<'a> FormatContext<'a> {
    pub fn lookup(&self, token: &str) -> Option<String> {
        if let Some(value) = self.artifact.and_then(|a| artifact_token(a, token)) {
            return Some(value);
        }

        if matches!(token, "dashClassifier" | "dashClassifier?") {
            return Some(self.artifact.map(ArtifactId::dash_classifier).unwrap_or_default());
        }

        if let Some(field) = token.strip_prefix("module.") {
            if let Some(value) = self.module_artifact.and_then(|a| artifact_token(a, field)) {
                return Some(value);
            }
            if let Some(value) = self.module_project.and_then(|p| p.field(field)) {
                return Some(value);
            }
        }

        if token == "finalName" {
            if let Some(final_name) = self.final_name {
                return Some(final_name.to_string());
            }
        }

        if let Some(value) = token
            .strip_prefix("artifact.")
            .and_then(|field| self.artifact_project.and_then(|p| p.field(field)))
        {
            return Some(value);
        }

        if let Some(value) = self.main_project.and_then(|p| p.lookup(token)) {
            return Some(value);
        }

        [self.module_project, self.artifact_project]
            .into_iter()
            .flatten()
            .find_map(|p| p.properties.get(token).cloned())
    }
}

fn artifact_token(id: &ArtifactId, token: &str) -> Option<String> {
    let field = token.strip_prefix("artifact.").unwrap_or(token);
    let value = match field {
        "groupId" => id.group_id.clone(),
        "artifactId" => id.artifact_id.clone(),
        "version" => id.version.clone(),
        "baseVersion" => id.effective_base_version().to_string(),
        "classifier" => id.classifier.clone().unwrap_or_default(),
        "extension" => id.extension.clone(),
        "type" => id.kind.clone(),
        "id" if field != token => id.to_string(),
        _ => return None,
    };
    Some(value)
}

/// Template expansion seam.
pub trait Interpolator: Send + Sync {
    fn interpolate(&self, template: &str, ctx: &FormatContext<'_>) -> Result<String, FormatError>;
}

/// Substitutes `${token}` references from the context.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokenInterpolator;

impl Interpolator for TokenInterpolator {
    fn interpolate(&self, template: &str, ctx: &FormatContext<'_>) -> Result<String, FormatError> {
        let mut out = String::with_capacity(template.len());
        let mut last = 0;
        for caps in TOKEN.captures_iter(template) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            push_literal(&mut out, &template[last..whole.start()], template)?;
            match ctx.lookup(name.as_str().trim()) {
                Some(value) => out.push_str(&value),
                None => out.push_str(whole.as_str()),
            }
            last = whole.end();
        }
        push_literal(&mut out, &template[last..], template)?;

        Ok(out)
    }
}

fn push_literal(out: &mut String, literal: &str, template: &str) -> Result<(), FormatError> {
    if literal.contains("${") {
        return Err(FormatError::Unterminated {
            template: template.to_string(),
        });
    }
    out.push_str(literal);
    Ok(())
}

/// Expand an output directory template and normalize it into an archive
/// path prefix: relative, `/`-terminated when non-empty, without empty, `.`
/// or `..` segments.
///
/// Artifact coordinates are not visible here. `artifact.*` and `module.*`
/// resolve against the artifact's and the module's projects instead.
pub fn resolve_output_directory(
    template: Option<&str>,
    ctx: &FormatContext<'_>,
    interpolator: &dyn Interpolator,
) -> Result<String, FormatError> {
    let template = template.unwrap_or_default();
    let ctx = FormatContext {
        artifact: None,
        module_artifact: None,
        ..*ctx
    };
    let value = interpolator.interpolate(template, &ctx)?;
    Ok(normalize_directory(&value))
}

/// Expand a file name template, falling back to
/// [`DEFAULT_FILE_NAME_MAPPING`].
pub fn resolve_file_name(
    template: Option<&str>,
    ctx: &FormatContext<'_>,
    interpolator: &dyn Interpolator,
) -> Result<String, FormatError> {
    let template = template.unwrap_or(DEFAULT_FILE_NAME_MAPPING);
    interpolator.interpolate(template, ctx)
}

pub(crate) fn normalize_directory(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        return String::new();
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in value.split(['/', '\\']) {
        match segment {
            "" | "." => {},
            ".." => {
                segments.pop();
            },
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return String::new();
    }

    let mut out = segments.join("/");
    out.push('/');
    out
}
