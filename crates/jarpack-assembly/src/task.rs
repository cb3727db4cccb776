use std::sync::Arc;

use jarpack_archive::{Archiver, SanitizeOptions, StreamTransformer};

use crate::artifact::{ArtifactId, ArtifactRef, ProjectRef};
use crate::collision::avoid_self_overwrite;
use crate::config::ConfigSource;
use crate::error::Result;
use crate::format::{FormatContext, resolve_file_name, resolve_output_directory};
use crate::mode_guard::with_mode_override;
use crate::placement::{Placement, PlacementSpec, place_as_file, place_unpacked};

/// Adds one artifact to an archive.
///
/// Running the task:
///
/// 1. relocates the artifact file if it is the archive being written,
/// 2. resolves the output directory,
/// 3. applies the file and directory mode overrides for the duration of the
///    placement,
/// 4. either unpacks the artifact or adds it as a single (sanitized) entry.
pub struct AddArtifactTask {
    artifact: ArtifactRef,
    spec: PlacementSpec,
    transformer: Option<Arc<dyn StreamTransformer>>,
    encoding: Option<String>,
    project: Option<ProjectRef>,
    module_project: Option<ProjectRef>,
    module_artifact: Option<ArtifactId>,
    sanitize_options: SanitizeOptions,
}

impl AddArtifactTask {
    pub fn new(artifact: ArtifactRef, spec: PlacementSpec) -> Self {
        Self {
            artifact,
            spec,
            transformer: None,
            encoding: None,
            project: None,
            module_project: None,
            module_artifact: None,
            sanitize_options: SanitizeOptions::default(),
        }
    }

    pub fn transformer(mut self, transformer: Arc<dyn StreamTransformer>) -> Self {
        self.transformer = Some(transformer);
        self
    }

    /// Entry name encoding of unpacked archives.
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// The project the artifact belongs to, answering `artifact.*` tokens
    /// the artifact coordinates do not.
    pub fn project(mut self, project: ProjectRef) -> Self {
        self.project = Some(project);
        self
    }

    pub fn module_project(mut self, project: ProjectRef) -> Self {
        self.module_project = Some(project);
        self
    }

    pub fn module_artifact(mut self, artifact: ArtifactId) -> Self {
        self.module_artifact = Some(artifact);
        self
    }

    pub fn sanitize_options(mut self, options: SanitizeOptions) -> Self {
        self.sanitize_options = options;
        self
    }

    /// The artifact, with its file replaced by the relocated copy if the task
    /// had to move it.
    pub fn artifact(&self) -> &ArtifactRef {
        &self.artifact
    }

    pub fn spec(&self) -> &PlacementSpec {
        &self.spec
    }

    pub fn execute<A, C>(&mut self, archiver: &mut A, config: &C) -> Result<Placement>
    where
        A: Archiver + ?Sized,
        C: ConfigSource + ?Sized,
    {
        if let Some(file) = self.artifact.file() {
            let relocated =
                avoid_self_overwrite(file, &*archiver, config.temporary_root_directory(), &self.artifact.id)?;
            if relocated != file {
                self.artifact.file = Some(relocated);
            }
        }

        let ctx = FormatContext {
            artifact: Some(&self.artifact.id),
            module_artifact: self.module_artifact.as_ref(),
            final_name: config.final_name(),
            module_project: self.module_project.as_ref(),
            artifact_project: self.project.as_ref(),
            main_project: config.project(),
        };
        let interpolator = config.interpolator();
        let output_directory = resolve_output_directory(self.spec.output_directory.as_deref(), &ctx, interpolator)?;

        let spec = &self.spec;
        let artifact = &self.artifact;
        with_mode_override(archiver, spec.file_mode, spec.directory_mode, |archiver| {
            if spec.unpack {
                place_unpacked(
                    archiver,
                    artifact,
                    &output_directory,
                    spec,
                    self.transformer.clone(),
                    self.encoding.as_deref(),
                )
            } else {
                let file_name = resolve_file_name(spec.file_name_mapping.as_deref(), &ctx, interpolator)?;
                place_as_file(
                    archiver,
                    artifact,
                    format!("{output_directory}{file_name}"),
                    spec.file_mode,
                    &self.sanitize_options,
                )
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use jarpack_archive::{ArchivedFileSet, FileSet, Mode};

    use crate::config::AssemblyConfig;
    use crate::error::Error;

    /// Records calls and fails them on request.
    #[derive(Default)]
    struct StubArchiver {
        destination: Option<PathBuf>,
        file_mode: Option<Mode>,
        directory_mode: Option<Mode>,
        files: Vec<(PathBuf, String, Option<Mode>)>,
        file_sets: Vec<String>,
        archived_sets: Vec<(String, Option<String>)>,
        fail: bool,
    }

    impl StubArchiver {
        fn result(&self) -> jarpack_archive::Result<()> {
            if self.fail {
                return Err(jarpack_archive::Error::InvalidMode(0o10000));
            }
            Ok(())
        }
    }

    impl Archiver for StubArchiver {
        fn add_file(&mut self, file: &Path, destination: &str, mode: Option<Mode>) -> jarpack_archive::Result<()> {
            self.files.push((file.to_path_buf(), destination.to_string(), mode));
            self.result()
        }

        fn add_file_set(&mut self, set: FileSet) -> jarpack_archive::Result<()> {
            self.file_sets.push(set.selection().prefix.clone());
            self.result()
        }

        fn add_archived_file_set(&mut self, set: ArchivedFileSet, encoding: Option<&str>) -> jarpack_archive::Result<()> {
            self.archived_sets
                .push((set.selection().prefix.clone(), encoding.map(String::from)));
            self.result()
        }

        fn destination_file(&self) -> Option<&Path> {
            self.destination.as_deref()
        }

        fn override_file_mode(&self) -> Option<Mode> {
            self.file_mode
        }

        fn set_file_mode(&mut self, mode: Option<Mode>) {
            self.file_mode = mode;
        }

        fn override_directory_mode(&self) -> Option<Mode> {
            self.directory_mode
        }

        fn set_directory_mode(&mut self, mode: Option<Mode>) {
            self.directory_mode = mode;
        }
    }

    fn artifact(file: Option<PathBuf>) -> ArtifactRef {
        ArtifactRef::new(ArtifactId::new("org.example", "foo", "1.0"), file)
    }

    #[test]
    fn flat_placement_uses_directory_and_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("foo.txt");
        std::fs::write(&file, b"foo").unwrap();

        let config = AssemblyConfig::new(dir.path().join("tmp")).with_final_name("app-2.0");
        let mut archiver = StubArchiver::default();
        let mut task = AddArtifactTask::new(
            artifact(Some(file.clone())),
            PlacementSpec::default()
                .output_directory("/${finalName}/lib")
                .file_mode(Some(Mode::new(0o640).unwrap())),
        );

        let placement = task.execute(&mut archiver, &config).unwrap();
        assert!(matches!(placement, Placement::File { ref destination, .. } if destination == "app-2.0/lib/foo-1.0.jar"));
        assert_eq!(archiver.files, [(
            file,
            String::from("app-2.0/lib/foo-1.0.jar"),
            Some(Mode::new(0o640).unwrap())
        )]);
        assert_eq!(archiver.file_mode, None);
    }

    #[test]
    fn output_directory_separates_module_artifact_and_main_projects() {
        let dir = tempfile::tempdir().unwrap();
        let config = AssemblyConfig::new(dir.path().join("tmp"))
            .with_project(ProjectRef::new("org.example", "dist", "9.9").property("channel", "stable"));
        let mut archiver = StubArchiver::default();
        let mut task = AddArtifactTask::new(
            artifact(Some(dir.path().to_path_buf())),
            PlacementSpec::default()
                .unpack(true)
                .output_directory("${module.artifactId}/${artifact.artifactId}/${project.version}/${channel}"),
        )
        .project(ProjectRef::new("org.example", "parent", "1.5"))
        .module_project(ProjectRef::new("org.example", "module-a", "3.0"));

        let placement = task.execute(&mut archiver, &config).unwrap();
        assert_eq!(placement, Placement::Directory {
            prefix: String::from("module-a/parent/9.9/stable/"),
        });
    }

    #[test]
    fn unpack_directory_adds_file_set() {
        let dir = tempfile::tempdir().unwrap();
        let config = AssemblyConfig::new(dir.path().join("tmp"));
        let mut archiver = StubArchiver::default();
        let mut task = AddArtifactTask::new(
            artifact(Some(dir.path().to_path_buf())),
            PlacementSpec::default().unpack(true).output_directory("classes"),
        );

        let placement = task.execute(&mut archiver, &config).unwrap();
        assert_eq!(placement, Placement::Directory {
            prefix: String::from("classes/"),
        });
        assert_eq!(archiver.file_sets, ["classes/"]);
        assert!(archiver.files.is_empty());
        assert!(archiver.archived_sets.is_empty());
    }

    #[test]
    fn unpack_file_passes_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("foo-1.0.jar");
        std::fs::write(&jar, b"not inspected by the stub").unwrap();

        let config = AssemblyConfig::new(dir.path().join("tmp"));
        let mut archiver = StubArchiver::default();
        let mut task = AddArtifactTask::new(artifact(Some(jar)), PlacementSpec::default().unpack(true)).encoding("UTF-8");

        let placement = task.execute(&mut archiver, &config).unwrap();
        assert_eq!(placement, Placement::Archive { prefix: String::new() });
        assert_eq!(archiver.archived_sets, [(String::new(), Some(String::from("UTF-8")))]);
    }

    #[test]
    fn writer_failure_names_the_artifact_and_restores_modes() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("foo.txt");
        std::fs::write(&file, b"foo").unwrap();

        let config = AssemblyConfig::new(dir.path().join("tmp"));
        let prior = Some(Mode::new(0o600).unwrap());
        let mut archiver = StubArchiver {
            fail: true,
            file_mode: prior,
            ..StubArchiver::default()
        };
        let mut task = AddArtifactTask::new(
            artifact(Some(file)),
            PlacementSpec::default()
                .file_mode(Some(Mode::new(0o755).unwrap()))
                .directory_mode(Some(Mode::new(0o700).unwrap())),
        );

        let err = task.execute(&mut archiver, &config).unwrap_err();
        assert!(matches!(err, Error::ArchiveCreation { ref artifact, .. } if artifact == "org.example:foo:jar:1.0"));
        assert_eq!(archiver.file_mode, prior);
        assert_eq!(archiver.directory_mode, None);
    }

    #[test]
    fn self_referencing_artifact_is_relocated() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("app.txt");
        std::fs::write(&destination, b"previous").unwrap();

        let temp_root = dir.path().join("tmp");
        let config = AssemblyConfig::new(&temp_root);
        let mut archiver = StubArchiver {
            destination: Some(destination.clone()),
            ..StubArchiver::default()
        };
        let mut task = AddArtifactTask::new(artifact(Some(destination.clone())), PlacementSpec::default());

        task.execute(&mut archiver, &config).unwrap();
        let relocated = temp_root.join("app.txt");
        assert_eq!(task.artifact().file(), Some(relocated.as_path()));
        assert_eq!(archiver.files[0].0, relocated);
        assert_eq!(std::fs::read(&relocated).unwrap(), b"previous");
    }

    #[test]
    fn format_error_is_propagated() {
        let dir = tempfile::tempdir().unwrap();
        let config = AssemblyConfig::new(dir.path().join("tmp"));
        let mut archiver = StubArchiver::default();
        let mut task = AddArtifactTask::new(
            artifact(None),
            PlacementSpec::default().output_directory("${finalName"),
        );

        let err = task.execute(&mut archiver, &config).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
        assert!(archiver.files.is_empty());
    }
}
