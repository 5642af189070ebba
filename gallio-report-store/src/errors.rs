// Copyright (c) The gallio-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced while storing and loading reports.

use camino::Utf8PathBuf;
use std::io;
use thiserror::Error;

/// The reason a container path was rejected.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InvalidPathReason {
    /// The path was empty.
    Empty,
    /// The path was absolute; container paths are always relative.
    Absolute,
    /// The path did not begin with the report name followed by `.` or a
    /// directory separator.
    OutsideReport,
    /// The path contained `.` or `..` components.
    Traversal,
}

impl std::fmt::Display for InvalidPathReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::Empty => "path is empty",
            Self::Absolute => "path is absolute",
            Self::OutsideReport => "path does not begin with the report name",
            Self::Traversal => "path contains `.` or `..` components",
        };
        f.write_str(reason)
    }
}

/// An error raised by a report container operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportContainerError {
    /// A path failed validation against the container's report name.
    #[error("invalid report path `{path}`: {reason}")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// Why the path was rejected.
        reason: InvalidPathReason,
    },

    /// A requested file does not exist in the container.
    #[error("file not found in report container: `{path}`")]
    EntryNotFound {
        /// The container-relative path that was requested.
        path: Utf8PathBuf,
    },

    /// Failed to read a file from the container.
    #[error("failed to read `{path}` from report container")]
    Read {
        /// The container-relative path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        error: io::Error,
    },

    /// Failed to write a file into the container.
    #[error("failed to write `{path}` into report container")]
    Write {
        /// The container-relative path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        error: io::Error,
    },

    /// Failed to open the report archive.
    #[error("failed to open report archive `{path}`")]
    ArchiveOpen {
        /// The archive path on disk.
        path: Utf8PathBuf,
        /// The underlying zip error.
        #[source]
        error: zip::result::ZipError,
    },

    /// A zip-level failure while reading or writing an archive entry.
    #[error("archive operation failed for `{path}`")]
    Archive {
        /// The container-relative path.
        path: Utf8PathBuf,
        /// The underlying zip error.
        #[source]
        error: zip::result::ZipError,
    },

    /// Failed to finalize the report archive.
    #[error("failed to finalize report archive `{path}`")]
    ArchiveFinish {
        /// The archive path on disk.
        path: Utf8PathBuf,
        /// The underlying zip error.
        #[source]
        error: zip::result::ZipError,
    },

    /// Failed to delete the report's files.
    #[error("failed to delete report `{report_name}`")]
    Delete {
        /// The report name.
        report_name: String,
        /// The underlying I/O error.
        #[source]
        error: io::Error,
    },
}

/// The operation was canceled through its progress monitor.
#[derive(Clone, Copy, Debug, Error)]
#[error("the operation was canceled")]
pub struct OperationCanceled;

/// An error raised while loading a report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportReadError {
    /// A container operation failed.
    #[error(transparent)]
    Container(#[from] ReportContainerError),

    /// The report XML could not be deserialized.
    #[error("failed to deserialize report XML from `{path}`")]
    Deserialize {
        /// The container-relative path of the XML document.
        path: Utf8PathBuf,
        /// The underlying deserialization error.
        #[source]
        error: quick_xml::DeError,
    },

    /// The report XML was not valid UTF-8.
    #[error("report XML at `{path}` is not valid UTF-8")]
    InvalidUtf8 {
        /// The container-relative path of the XML document.
        path: Utf8PathBuf,
        /// The underlying UTF-8 error.
        #[source]
        error: std::string::FromUtf8Error,
    },

    /// An attachment's contents could not be loaded.
    #[error("failed to load attachment contents from `{path}`")]
    AttachmentLoad {
        /// The attachment's container-relative path.
        path: Utf8PathBuf,
        /// The underlying container error.
        #[source]
        error: ReportContainerError,
    },

    /// The operation was canceled.
    #[error(transparent)]
    Canceled(#[from] OperationCanceled),
}

/// An error raised while saving a report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportWriteError {
    /// A container operation failed.
    #[error(transparent)]
    Container(#[from] ReportContainerError),

    /// The report could not be serialized to XML.
    #[error("failed to serialize report to XML")]
    Serialize {
        /// The underlying serialization error.
        #[source]
        error: quick_xml::DeError,
    },

    /// An attachment's contents could not be saved.
    #[error("failed to save attachment contents to `{path}`")]
    AttachmentSave {
        /// The attachment's container-relative path.
        path: Utf8PathBuf,
        /// The underlying container error.
        #[source]
        error: ReportContainerError,
    },

    /// The operation was canceled.
    #[error(transparent)]
    Canceled(#[from] OperationCanceled),
}

/// An error raised while formatting a report through a registered formatter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportFormatError {
    /// No formatter is registered under the requested name.
    #[error(
        "unknown report formatter `{name}` (known formatters: {})",
        .known.join(", ")
    )]
    UnknownFormatter {
        /// The requested formatter name.
        name: String,
        /// The registered formatter names.
        known: Vec<String>,
    },

    /// The formatter failed while writing the report.
    #[error("report formatter `{name}` failed")]
    Format {
        /// The formatter name.
        name: String,
        /// The underlying error.
        #[source]
        error: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Saving the report through the writer failed.
    #[error(transparent)]
    Write(#[from] ReportWriteError),

    /// The operation was canceled.
    #[error(transparent)]
    Canceled(#[from] OperationCanceled),
}
