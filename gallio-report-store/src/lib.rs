// Copyright (c) The gallio-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Storage for Gallio test reports.
//!
//! A report is persisted into a [`ReportContainer`]: a logical file system
//! rooted at a report name, backed either by a directory of plain files
//! ([`FileSystemReportContainer`]) or by a single zip archive
//! ([`ArchiveReportContainer`]). The [`ReportWriter`] serializes a
//! [`Report`](gallio_report_model::Report) into a container, switching
//! attachment contents between inline embedding and linked sibling files;
//! the [`ReportReader`] loads it back, repairing parent linkage in the
//! step-run tree. [`ReportMerger`] combines independently produced reports,
//! and [`ReportManager`] ties containers, readers, writers and registered
//! formatters together.

mod container;
pub mod errors;
mod manager;
mod merger;
mod progress;
mod reader;
mod writer;

pub use container::*;
pub use manager::*;
pub use merger::*;
pub use progress::*;
pub use reader::*;
pub use writer::*;
