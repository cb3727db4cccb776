//! A zip-backed [`Archiver`].
//!
//! Entries are recorded when they are added, with filters and effective modes
//! resolved at that moment, and the archive is only written by
//! [`ZipArchiver::finish`]. Source files must therefore stay readable until
//! then.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::archiver::{Archiver, ArchivedFileSet, FileSet, StreamTransformer};
use crate::error::{Error, Result};
use crate::mode::Mode;

enum Source {
    File(PathBuf),
    Member { archive: PathBuf, index: usize },
    Directory,
}

impl Source {
    fn origin(&self) -> Option<&Path> {
        match self {
            Source::File(path) => Some(path),
            Source::Member { archive, .. } => Some(archive),
            Source::Directory => None,
        }
    }
}

struct PendingEntry {
    name: String,
    source: Source,
    mode: Mode,
    transformer: Option<Arc<dyn StreamTransformer>>,
}

pub struct ZipArchiver {
    destination: PathBuf,
    entries: Vec<PendingEntry>,
    names: HashSet<String>,
    file_mode: Option<Mode>,
    directory_mode: Option<Mode>,
    default_file_mode: Mode,
    default_directory_mode: Mode,
}

impl ZipArchiver {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            entries: Vec::new(),
            names: HashSet::new(),
            file_mode: None,
            directory_mode: None,
            default_file_mode: Mode::FILE,
            default_directory_mode: Mode::DIRECTORY,
        }
    }

    pub fn default_modes(mut self, file: Mode, directory: Mode) -> Self {
        self.default_file_mode = file;
        self.default_directory_mode = directory;
        self
    }

    /// Names of the recorded entries, in insertion order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Effective mode recorded for `name`.
    pub fn entry_mode(&self, name: &str) -> Option<Mode> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.mode)
    }

    /// Write every recorded entry to the destination file.
    pub fn finish(self) -> Result<PathBuf> {
        if let Some(parent) = self.destination.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| Error::Write {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let file = File::create(&self.destination).map_err(|e| Error::Write {
            path: self.destination.clone(),
            source: e,
        })?;
        let mut writer = ZipWriter::new(file);
        let mut archives: HashMap<PathBuf, ZipArchive<BufReader<File>>> = HashMap::new();

        for entry in &self.entries {
            let options = SimpleFileOptions::default().unix_permissions(entry.mode.bits());

            if let Source::Directory = entry.source {
                writer
                    .add_directory(entry.name.as_str(), options)
                    .map_err(|e| self.zip_error(e))?;
                continue;
            }

            let mut reader = open_source(&entry.source, &mut archives)?;
            let Some(transformer) = &entry.transformer else {
                writer
                    .start_file(entry.name.as_str(), options)
                    .map_err(|e| self.zip_error(e))?;
                io::copy(&mut reader, &mut writer).map_err(|e| Error::Write {
                    path: self.destination.clone(),
                    source: e,
                })?;
                continue;
            };

            let mut content = Vec::new();
            reader.read_to_end(&mut content).map_err(|e| Error::Read {
                path: entry.source.origin().unwrap_or(self.destination.as_path()).to_path_buf(),
                source: e,
            })?;
            let content = transformer
                .transform(&entry.name, content)
                .map_err(|e| Error::Transform {
                    entry: entry.name.clone(),
                    source: e,
                })?;

            writer
                .start_file(entry.name.as_str(), options)
                .map_err(|e| self.zip_error(e))?;
            writer.write_all(&content).map_err(|e| Error::Write {
                path: self.destination.clone(),
                source: e,
            })?;
        }

        writer.finish().map_err(|e| self.zip_error(e))?;
        tracing::debug!(
            archive = %self.destination.display(),
            entries = self.entries.len(),
            "archive written"
        );
        Ok(self.destination)
    }

    fn push(&mut self, entry: PendingEntry) {
        if !self.names.insert(entry.name.clone()) {
            tracing::debug!(entry = %entry.name, "duplicate entry ignored");
            return;
        }
        self.entries.push(entry);
    }

    fn push_directory(&mut self, name: String) {
        let mode = self.directory_mode.unwrap_or(self.default_directory_mode);
        self.push(PendingEntry {
            name,
            source: Source::Directory,
            mode,
            transformer: None,
        });
    }

    fn zip_error(&self, source: zip::result::ZipError) -> Error {
        Error::Zip {
            path: self.destination.clone(),
            source,
        }
    }
}

impl Archiver for ZipArchiver {
    fn add_file(&mut self, file: &Path, destination: &str, mode: Option<Mode>) -> Result<()> {
        if !file.is_file() {
            return Err(Error::Read {
                path: file.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a regular file"),
            });
        }

        let mode = mode.or(self.file_mode).unwrap_or(self.default_file_mode);
        self.push(PendingEntry {
            name: entry_name(destination),
            source: Source::File(file.to_path_buf()),
            mode,
            transformer: None,
        });
        Ok(())
    }

    fn add_file_set(&mut self, set: FileSet) -> Result<()> {
        let selection = set.selection();
        let filter = selection.filter()?;

        if !set.directory.is_dir() {
            return Err(Error::Read {
                path: set.directory.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
        }

        for item in WalkDir::new(&set.directory).min_depth(1).sort_by_file_name() {
            let item = item?;
            let relative = item
                .path()
                .strip_prefix(&set.directory)
                .unwrap_or(item.path())
                .to_string_lossy()
                .replace('\\', "/");
            if !filter.matches(&relative) {
                continue;
            }

            let name = entry_name(&format!("{}{}", selection.prefix, relative));
            if item.file_type().is_dir() {
                self.push_directory(format!("{name}/"));
            } else {
                let mode = self.file_mode.unwrap_or(self.default_file_mode);
                self.push(PendingEntry {
                    name,
                    source: Source::File(item.into_path()),
                    mode,
                    transformer: selection.transformer.clone(),
                });
            }
        }
        Ok(())
    }

    fn add_archived_file_set(&mut self, set: ArchivedFileSet, encoding: Option<&str>) -> Result<()> {
        let selection = set.selection();
        let filter = selection.filter()?;

        if let Some(encoding) = encoding {
            tracing::debug!(archive = %set.archive.display(), encoding, "entry name encoding hint");
        }

        let mut archive = open_zip(&set.archive)?;

        for index in 0..archive.len() {
            let (member_name, is_dir) = {
                let member = archive.by_index_raw(index).map_err(|e| Error::Zip {
                    path: set.archive.clone(),
                    source: e,
                })?;
                (member.name().to_string(), member.is_dir())
            };

            let relative = member_name.trim_end_matches('/');
            if relative.is_empty() || !filter.matches(relative) {
                continue;
            }

            let name = entry_name(&format!("{}{}", selection.prefix, relative));
            if is_dir {
                self.push_directory(format!("{name}/"));
            } else {
                let mode = self.file_mode.unwrap_or(self.default_file_mode);
                self.push(PendingEntry {
                    name,
                    source: Source::Member {
                        archive: set.archive.clone(),
                        index,
                    },
                    mode,
                    transformer: selection.transformer.clone(),
                });
            }
        }
        Ok(())
    }

    fn destination_file(&self) -> Option<&Path> {
        Some(&self.destination)
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

/// Reader over the content of a file or archive member entry.
fn open_source<'a>(
    source: &Source,
    archives: &'a mut HashMap<PathBuf, ZipArchive<BufReader<File>>>,
) -> Result<Box<dyn Read + 'a>> {
    match source {
        Source::File(path) => {
            let file = File::open(path).map_err(|e| Error::Read {
                path: path.clone(),
                source: e,
            })?;
            Ok(Box::new(BufReader::new(file)))
        },
        Source::Member { archive, index } => {
            let opened = match archives.entry(archive.clone()) {
                Entry::Occupied(slot) => slot.into_mut(),
                Entry::Vacant(slot) => slot.insert(open_zip(archive)?),
            };

            let member = opened.by_index(*index).map_err(|e| Error::Zip {
                path: archive.clone(),
                source: e,
            })?;
            Ok(Box::new(member))
        },
        Source::Directory => Ok(Box::new(io::empty())),
    }
}

fn open_zip(path: &Path) -> Result<ZipArchive<BufReader<File>>> {
    let file = File::open(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| Error::Zip {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Archive entry names use `/` and never start with one.
fn entry_name(destination: &str) -> String {
    destination.replace('\\', "/").trim_start_matches('/').to_string()
}
