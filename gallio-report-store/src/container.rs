// Copyright (c) The gallio-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report containers: a logical file system rooted at a report name.
//!
//! Every path handed to a container is validated against the report name:
//! it must be relative, begin with `{reportName}` followed by `.` or a
//! directory separator, and contain no `.`/`..` components. Validation
//! failures always surface to the caller; paths are never silently
//! corrected.

use crate::errors::{InvalidPathReason, ReportContainerError};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::str::FromStr;
use tracing::debug;
use zip::read::ZipArchive;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

/// Abstract storage for one report's files.
///
/// Implementations map container-relative paths either onto plain files
/// under a directory or onto entries of a single zip archive.
pub trait ReportContainer {
    /// Returns the report name the container is rooted at.
    fn report_name(&self) -> &str;

    /// Returns true if a file exists at the given container-relative path.
    fn file_exists(&mut self, path: &Utf8Path) -> bool;

    /// Reads the full contents of a file.
    fn read_file(&mut self, path: &Utf8Path) -> Result<Vec<u8>, ReportContainerError>;

    /// Writes the full contents of a file, creating parent directories as
    /// needed.
    ///
    /// Rewriting a path that was already written is implementation-defined:
    /// the file-system container overwrites, the archive container keeps
    /// the first write (zip entries cannot be replaced in place).
    fn write_file(&mut self, path: &Utf8Path, contents: &[u8])
    -> Result<(), ReportContainerError>;

    /// Deletes all of the report's files from the underlying storage.
    fn delete_report(&mut self) -> Result<(), ReportContainerError>;

    /// Flushes and finalizes the underlying storage. Must be called after
    /// writing; idempotent.
    fn finish(&mut self) -> Result<(), ReportContainerError>;
}

/// Validates a container-relative path against a report name.
///
/// Returns the path with separators normalized to `/`. Rejects empty and
/// absolute paths, paths whose first component is not `{reportName}` or
/// `{reportName}.{suffix}`, and paths containing `.` or `..` components.
pub fn validate_report_path(
    report_name: &str,
    path: &Utf8Path,
) -> Result<Utf8PathBuf, ReportContainerError> {
    let invalid = |reason| ReportContainerError::InvalidPath {
        path: path.as_str().to_owned(),
        reason,
    };

    if path.as_str().is_empty() {
        return Err(invalid(InvalidPathReason::Empty));
    }

    // Windows-style separators are accepted and normalized, so check for a
    // leading backslash as well as a true absolute path.
    if path.is_absolute() || path.as_str().starts_with('\\') {
        return Err(invalid(InvalidPathReason::Absolute));
    }

    let normalized = Utf8PathBuf::from(path.as_str().replace('\\', "/"));
    if normalized.is_absolute() {
        return Err(invalid(InvalidPathReason::Absolute));
    }

    let mut components = normalized.components();
    let first = match components.next() {
        Some(Utf8Component::Normal(first)) => first,
        Some(_) => return Err(invalid(InvalidPathReason::Traversal)),
        None => return Err(invalid(InvalidPathReason::Empty)),
    };

    let mut rest = 0_usize;
    for component in components {
        match component {
            Utf8Component::Normal(_) => rest += 1,
            _ => return Err(invalid(InvalidPathReason::Traversal)),
        }
    }

    // The first component must be the report name followed by `.` (a file
    // such as `report.xml`) or a separator (a subdirectory).
    let name_with_dot = first
        .strip_prefix(report_name)
        .is_some_and(|suffix| suffix.starts_with('.') && suffix.len() > 1);
    let name_as_dir = first == report_name && rest > 0;
    if !(name_with_dot || name_as_dir) {
        return Err(invalid(InvalidPathReason::OutsideReport));
    }

    Ok(normalized)
}

/// A report container mapping paths directly onto files under a directory.
#[derive(Debug)]
pub struct FileSystemReportContainer {
    report_directory: Utf8PathBuf,
    report_name: String,
}

impl FileSystemReportContainer {
    /// Creates a container rooted at `report_name` inside the given
    /// directory.
    pub fn new(report_directory: impl Into<Utf8PathBuf>, report_name: impl Into<String>) -> Self {
        Self {
            report_directory: report_directory.into(),
            report_name: report_name.into(),
        }
    }

    fn to_file_path(&self, path: &Utf8Path) -> Result<Utf8PathBuf, ReportContainerError> {
        let validated = validate_report_path(&self.report_name, path)?;
        Ok(self.report_directory.join(validated))
    }
}

impl ReportContainer for FileSystemReportContainer {
    fn report_name(&self) -> &str {
        &self.report_name
    }

    fn file_exists(&mut self, path: &Utf8Path) -> bool {
        self.to_file_path(path)
            .is_ok_and(|file_path| file_path.is_file())
    }

    fn read_file(&mut self, path: &Utf8Path) -> Result<Vec<u8>, ReportContainerError> {
        let file_path = self.to_file_path(path)?;
        std::fs::read(&file_path).map_err(|error| {
            if error.kind() == io::ErrorKind::NotFound {
                ReportContainerError::EntryNotFound {
                    path: path.to_owned(),
                }
            } else {
                ReportContainerError::Read {
                    path: path.to_owned(),
                    error,
                }
            }
        })
    }

    fn write_file(
        &mut self,
        path: &Utf8Path,
        contents: &[u8],
    ) -> Result<(), ReportContainerError> {
        let file_path = self.to_file_path(path)?;
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| ReportContainerError::Write {
                path: path.to_owned(),
                error,
            })?;
        }
        debug!(path = %path, bytes = contents.len(), "writing report file");
        std::fs::write(&file_path, contents).map_err(|error| ReportContainerError::Write {
            path: path.to_owned(),
            error,
        })
    }

    fn delete_report(&mut self) -> Result<(), ReportContainerError> {
        let delete_error = |error| ReportContainerError::Delete {
            report_name: self.report_name.clone(),
            error,
        };

        let entries = match std::fs::read_dir(&self.report_directory) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(error) => return Err(delete_error(error)),
        };

        let dotted_prefix = format!("{}.", self.report_name);
        for entry in entries {
            let entry = entry.map_err(delete_error)?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name != self.report_name && !name.starts_with(&dotted_prefix) {
                continue;
            }

            debug!(entry = name, "deleting report entry");
            let path = entry.path();
            let result = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            result.map_err(delete_error)?;
        }

        Ok(())
    }

    fn finish(&mut self) -> Result<(), ReportContainerError> {
        Ok(())
    }
}

/// A report container storing the report's logical file tree as entries of
/// a single `{reportName}.zip` archive.
///
/// Reads scan the entry list linearly with `\`-to-`/` normalization, so a
/// path written with either separator style is found with either. This is
/// O(n) per read; acceptable for report-sized archives, and a known
/// limitation rather than something to optimize away silently.
pub struct ArchiveReportContainer {
    report_name: String,
    archive_path: Utf8PathBuf,
    archive: Option<ZipArchive<File>>,
    writer: Option<ZipWriter<File>>,
    written: HashSet<Utf8PathBuf>,
}

impl fmt::Debug for ArchiveReportContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveReportContainer")
            .field("report_name", &self.report_name)
            .field("archive_path", &self.archive_path)
            .finish_non_exhaustive()
    }
}

impl ArchiveReportContainer {
    /// Creates a container backed by `{reportName}.zip` inside the given
    /// directory.
    pub fn new(report_directory: impl Into<Utf8PathBuf>, report_name: impl Into<String>) -> Self {
        let report_name = report_name.into();
        let archive_path = report_directory.into().join(format!("{report_name}.zip"));
        Self {
            report_name,
            archive_path,
            archive: None,
            writer: None,
            written: HashSet::new(),
        }
    }

    /// Returns the archive path on disk.
    pub fn archive_path(&self) -> &Utf8Path {
        &self.archive_path
    }

    fn ensure_archive(&mut self) -> Result<&mut ZipArchive<File>, ReportContainerError> {
        if self.archive.is_none() {
            let file =
                File::open(&self.archive_path).map_err(|error| ReportContainerError::Read {
                    path: self.archive_path.clone(),
                    error,
                })?;
            let archive =
                ZipArchive::new(file).map_err(|error| ReportContainerError::ArchiveOpen {
                    path: self.archive_path.clone(),
                    error,
                })?;
            self.archive = Some(archive);
        }
        Ok(self.archive.as_mut().expect("archive was just set"))
    }

    fn ensure_writer(&mut self) -> Result<&mut ZipWriter<File>, ReportContainerError> {
        if self.writer.is_none() {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&self.archive_path)
                .map_err(|error| ReportContainerError::Write {
                    path: self.archive_path.clone(),
                    error,
                })?;
            debug!(archive = %self.archive_path, "opened report archive for writing");
            self.writer = Some(ZipWriter::new(file));
        }
        Ok(self.writer.as_mut().expect("writer was just set"))
    }
}

/// Normalizes separators so entries written with `\` match requests made
/// with `/` and vice versa.
fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

impl ReportContainer for ArchiveReportContainer {
    fn report_name(&self) -> &str {
        &self.report_name
    }

    fn file_exists(&mut self, path: &Utf8Path) -> bool {
        let Ok(validated) = validate_report_path(&self.report_name, path) else {
            return false;
        };
        if self.written.contains(&validated) {
            return true;
        }
        let target = validated.into_string();
        let Ok(archive) = self.ensure_archive() else {
            return false;
        };
        archive
            .file_names()
            .any(|name| normalize_separators(name) == target)
    }

    fn read_file(&mut self, path: &Utf8Path) -> Result<Vec<u8>, ReportContainerError> {
        let validated = validate_report_path(&self.report_name, path)?;
        let target = validated.as_str().to_owned();
        let archive = self.ensure_archive()?;

        // Linear scan with separator normalization; see the type docs.
        for index in 0..archive.len() {
            let mut entry =
                archive
                    .by_index(index)
                    .map_err(|error| ReportContainerError::Archive {
                        path: validated.clone(),
                        error,
                    })?;
            if normalize_separators(entry.name()) != target {
                continue;
            }

            let mut contents = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut contents)
                .map_err(|error| ReportContainerError::Read {
                    path: validated.clone(),
                    error,
                })?;
            return Ok(contents);
        }

        Err(ReportContainerError::EntryNotFound { path: validated })
    }

    fn write_file(
        &mut self,
        path: &Utf8Path,
        contents: &[u8],
    ) -> Result<(), ReportContainerError> {
        let validated = validate_report_path(&self.report_name, path)?;
        if self.written.contains(&validated) {
            return Ok(());
        }

        let writer = self.ensure_writer()?;
        let options =
            FileOptions::<'_, ()>::default().compression_method(CompressionMethod::Deflated);
        writer
            .start_file(validated.as_str(), options)
            .map_err(|error| ReportContainerError::Archive {
                path: validated.clone(),
                error,
            })?;
        writer
            .write_all(contents)
            .map_err(|error| ReportContainerError::Write {
                path: validated.clone(),
                error,
            })?;

        self.written.insert(validated);
        Ok(())
    }

    fn delete_report(&mut self) -> Result<(), ReportContainerError> {
        self.archive = None;
        self.writer = None;
        debug!(archive = %self.archive_path, "deleting report archive");
        match std::fs::remove_file(&self.archive_path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(ReportContainerError::Delete {
                report_name: self.report_name.clone(),
                error,
            }),
        }
    }

    fn finish(&mut self) -> Result<(), ReportContainerError> {
        if let Some(writer) = self.writer.take() {
            debug!(archive = %self.archive_path, entries = self.written.len(), "finalizing report archive");
            writer
                .finish()
                .map_err(|error| ReportContainerError::ArchiveFinish {
                    path: self.archive_path.clone(),
                    error,
                })?;
        }
        Ok(())
    }
}

/// Whether a saved report is laid out as plain files or packed into a zip
/// archive.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ReportArchiveFormat {
    /// Plain files under the report directory.
    #[default]
    Flat,
    /// A single `{reportName}.zip` archive.
    Zip,
}

impl ReportArchiveFormat {
    /// Returns the accepted string forms, for error messages.
    pub fn variants() -> &'static [&'static str] {
        &["flat", "zip"]
    }
}

impl fmt::Display for ReportArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => f.write_str("flat"),
            Self::Zip => f.write_str("zip"),
        }
    }
}

/// Error returned while parsing a [`ReportArchiveFormat`] from a string.
#[derive(Clone, Debug, thiserror::Error)]
#[error(
    "unrecognized report archive format: {input}\n(known values: {})",
    ReportArchiveFormat::variants().join(", ")
)]
pub struct ReportArchiveFormatParseError {
    input: String,
}

impl FromStr for ReportArchiveFormat {
    type Err = ReportArchiveFormatParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "flat" | "normal" => Ok(Self::Flat),
            "zip" => Ok(Self::Zip),
            _ => Err(ReportArchiveFormatParseError {
                input: input.to_owned(),
            }),
        }
    }
}

/// Selects the container implementation for a report.
#[derive(Clone, Debug)]
pub struct ReportContainerFactory {
    report_directory: Utf8PathBuf,
    report_name: String,
}

impl ReportContainerFactory {
    /// Creates a factory for the given report directory and name.
    pub fn new(report_directory: impl Into<Utf8PathBuf>, report_name: impl Into<String>) -> Self {
        Self {
            report_directory: report_directory.into(),
            report_name: report_name.into(),
        }
    }

    /// Returns the report name.
    pub fn report_name(&self) -> &str {
        &self.report_name
    }

    /// Makes a container for reading an existing report.
    ///
    /// Probes for `{reportName}.zip`: if present the archive container is
    /// selected, otherwise the file-system container.
    pub fn make_for_reading(&self) -> Box<dyn ReportContainer> {
        let zip_path = self
            .report_directory
            .join(format!("{}.zip", self.report_name));
        if zip_path.is_file() {
            debug!(archive = %zip_path, "reading report from archive");
            Box::new(ArchiveReportContainer::new(
                self.report_directory.clone(),
                self.report_name.clone(),
            ))
        } else {
            Box::new(FileSystemReportContainer::new(
                self.report_directory.clone(),
                self.report_name.clone(),
            ))
        }
    }

    /// Makes a container for saving a new report in the given format.
    pub fn make_for_saving(&self, format: ReportArchiveFormat) -> Box<dyn ReportContainer> {
        match format {
            ReportArchiveFormat::Flat => Box::new(FileSystemReportContainer::new(
                self.report_directory.clone(),
                self.report_name.clone(),
            )),
            ReportArchiveFormat::Zip => Box::new(ArchiveReportContainer::new(
                self.report_directory.clone(),
                self.report_name.clone(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ReportContainerError;
    use camino_tempfile::Utf8TempDir;
    use test_case::test_case;

    #[test_case("report.xml", true; "report file")]
    #[test_case("report/step/file.txt", true; "nested file")]
    #[test_case("report.zip", true; "archive file")]
    #[test_case("report", false; "bare report name")]
    #[test_case("", false; "empty")]
    #[test_case("/report.xml", false; "absolute")]
    #[test_case("\\report.xml", false; "backslash absolute")]
    #[test_case("other.xml", false; "different report name")]
    #[test_case("reportextra/file.txt", false; "prefix but no separator")]
    #[test_case("report/../secrets.txt", false; "parent traversal")]
    #[test_case("report/./file.txt", false; "current dir component")]
    #[test_case("../report.xml", false; "leading parent dir")]
    fn path_validation(path: &str, ok: bool) {
        let result = validate_report_path("report", Utf8Path::new(path));
        assert_eq!(result.is_ok(), ok, "path {path:?}: {result:?}");
    }

    #[test]
    fn validation_normalizes_backslashes() {
        let validated =
            validate_report_path("report", Utf8Path::new("report\\step\\file.txt")).unwrap();
        assert_eq!(validated, Utf8PathBuf::from("report/step/file.txt"));
    }

    #[test]
    fn file_system_container_round_trips_and_deletes() {
        let dir = Utf8TempDir::new().unwrap();
        let mut container = FileSystemReportContainer::new(dir.path(), "report");

        container
            .write_file(Utf8Path::new("report.xml"), b"<report/>")
            .unwrap();
        container
            .write_file(Utf8Path::new("report/step/log.txt"), b"hello")
            .unwrap();

        assert!(container.file_exists(Utf8Path::new("report.xml")));
        assert_eq!(
            container.read_file(Utf8Path::new("report/step/log.txt")).unwrap(),
            b"hello"
        );

        // An unrelated file survives deletion.
        std::fs::write(dir.path().join("unrelated.txt"), b"keep").unwrap();

        container.delete_report().unwrap();
        assert!(!dir.path().join("report.xml").exists());
        assert!(!dir.path().join("report").exists());
        assert!(dir.path().join("unrelated.txt").exists());
    }

    #[test]
    fn file_system_rewrite_overwrites() {
        let dir = Utf8TempDir::new().unwrap();
        let mut container = FileSystemReportContainer::new(dir.path(), "report");
        container
            .write_file(Utf8Path::new("report.xml"), b"first")
            .unwrap();
        container
            .write_file(Utf8Path::new("report.xml"), b"second")
            .unwrap();

        assert_eq!(
            container.read_file(Utf8Path::new("report.xml")).unwrap(),
            b"second"
        );
    }

    #[test]
    fn file_system_read_of_missing_file_is_entry_not_found() {
        let dir = Utf8TempDir::new().unwrap();
        let mut container = FileSystemReportContainer::new(dir.path(), "report");

        let error = container.read_file(Utf8Path::new("report.xml")).unwrap_err();
        assert!(matches!(error, ReportContainerError::EntryNotFound { .. }));
    }

    #[test]
    fn archive_container_round_trips() {
        let dir = Utf8TempDir::new().unwrap();
        let mut container = ArchiveReportContainer::new(dir.path(), "report");

        container
            .write_file(Utf8Path::new("report.xml"), b"<report/>")
            .unwrap();
        container
            .write_file(Utf8Path::new("report/step/log.txt"), b"hello")
            .unwrap();
        container.finish().unwrap();

        assert!(dir.path().join("report.zip").is_file());

        let mut reader = ArchiveReportContainer::new(dir.path(), "report");
        assert_eq!(
            reader.read_file(Utf8Path::new("report.xml")).unwrap(),
            b"<report/>"
        );
        assert_eq!(
            reader.read_file(Utf8Path::new("report/step/log.txt")).unwrap(),
            b"hello"
        );
    }

    #[test]
    fn archive_read_ignores_separator_style() {
        let dir = Utf8TempDir::new().unwrap();
        let mut container = ArchiveReportContainer::new(dir.path(), "report");
        container
            .write_file(Utf8Path::new("report/step/log.txt"), b"hello")
            .unwrap();
        container.finish().unwrap();

        let mut reader = ArchiveReportContainer::new(dir.path(), "report");
        assert_eq!(
            reader
                .read_file(Utf8Path::new("report\\step\\log.txt"))
                .unwrap(),
            b"hello"
        );
    }

    #[test]
    fn archive_read_of_missing_entry_names_the_path() {
        let dir = Utf8TempDir::new().unwrap();
        let mut container = ArchiveReportContainer::new(dir.path(), "report");
        container
            .write_file(Utf8Path::new("report.xml"), b"<report/>")
            .unwrap();
        container.finish().unwrap();

        let mut reader = ArchiveReportContainer::new(dir.path(), "report");
        let error = reader
            .read_file(Utf8Path::new("report/missing.txt"))
            .unwrap_err();
        match error {
            ReportContainerError::EntryNotFound { path } => {
                assert_eq!(path, Utf8PathBuf::from("report/missing.txt"));
            }
            other => panic!("expected EntryNotFound, got {other:?}"),
        }
    }

    #[test]
    fn archive_delete_removes_the_zip() {
        let dir = Utf8TempDir::new().unwrap();
        let mut container = ArchiveReportContainer::new(dir.path(), "report");
        container
            .write_file(Utf8Path::new("report.xml"), b"<report/>")
            .unwrap();
        container.finish().unwrap();
        assert!(dir.path().join("report.zip").is_file());

        container.delete_report().unwrap();
        assert!(!dir.path().join("report.zip").exists());

        // Deleting an already-deleted report is not an error.
        container.delete_report().unwrap();
    }

    #[test]
    fn duplicate_archive_write_is_a_no_op() {
        let dir = Utf8TempDir::new().unwrap();
        let mut container = ArchiveReportContainer::new(dir.path(), "report");
        container
            .write_file(Utf8Path::new("report.xml"), b"first")
            .unwrap();
        container
            .write_file(Utf8Path::new("report.xml"), b"second")
            .unwrap();
        container.finish().unwrap();

        let mut reader = ArchiveReportContainer::new(dir.path(), "report");
        assert_eq!(reader.read_file(Utf8Path::new("report.xml")).unwrap(), b"first");
    }

    #[test]
    fn factory_probes_for_archives() {
        let dir = Utf8TempDir::new().unwrap();

        let factory = ReportContainerFactory::new(dir.path(), "report");
        let mut container = factory.make_for_reading();
        assert!(!container.file_exists(Utf8Path::new("report.xml")));

        let mut archive = factory.make_for_saving(ReportArchiveFormat::Zip);
        archive
            .write_file(Utf8Path::new("report.xml"), b"<report/>")
            .unwrap();
        archive.finish().unwrap();

        let mut container = factory.make_for_reading();
        assert_eq!(
            container.read_file(Utf8Path::new("report.xml")).unwrap(),
            b"<report/>"
        );
    }

    #[test]
    fn archive_format_parses_known_values() {
        assert_eq!("zip".parse::<ReportArchiveFormat>().unwrap(), ReportArchiveFormat::Zip);
        assert_eq!(
            "flat".parse::<ReportArchiveFormat>().unwrap(),
            ReportArchiveFormat::Flat
        );
        assert!("tarball".parse::<ReportArchiveFormat>().is_err());
    }
}
