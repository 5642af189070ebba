// Copyright (c) The gallio-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The report manager: formatter registry plus reader/writer construction.

use crate::container::{ReportArchiveFormat, ReportContainerFactory};
use crate::errors::ReportFormatError;
use crate::progress::ProgressMonitor;
use crate::reader::ReportReader;
use crate::writer::ReportWriter;
use gallio_report_model::{AttachmentContentDisposition, Report};
use indexmap::IndexMap;
use tracing::debug;

/// Options passed through to a report formatter, as free-form string
/// properties.
#[derive(Clone, Debug, Default)]
pub struct FormatterOptions {
    properties: IndexMap<String, String>,
}

impl FormatterOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a property, returning self for chaining.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Looks up a property by key.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Iterates the properties in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// Produces one output representation of a report through a writer.
pub trait ReportFormatter {
    /// The unique name the formatter is registered and looked up under.
    fn name(&self) -> &str;

    /// A short human-readable description of the output format.
    fn description(&self) -> &str;

    /// Formats the writer's report into its container.
    fn format(
        &self,
        writer: &mut ReportWriter,
        options: &FormatterOptions,
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<(), ReportFormatError>;
}

/// The name of the built-in XML formatter.
pub const XML_FORMATTER_NAME: &str = "Xml";

/// The formatter option selecting attachment content disposition:
/// `"absent"`, `"link"` or `"inline"`.
pub const ATTACHMENT_DISPOSITION_OPTION: &str = "attachmentContentDisposition";

/// The built-in formatter saving the report as its native XML document,
/// with attachments linked as sibling files by default.
#[derive(Clone, Copy, Debug, Default)]
pub struct XmlReportFormatter;

impl ReportFormatter for XmlReportFormatter {
    fn name(&self) -> &str {
        XML_FORMATTER_NAME
    }

    fn description(&self) -> &str {
        "Saves the report as an XML document with linked attachment files."
    }

    fn format(
        &self,
        writer: &mut ReportWriter,
        options: &FormatterOptions,
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<(), ReportFormatError> {
        let disposition = match options.property(ATTACHMENT_DISPOSITION_OPTION) {
            Some("absent") => AttachmentContentDisposition::Absent,
            Some("inline") => AttachmentContentDisposition::Inline,
            _ => AttachmentContentDisposition::Link,
        };
        writer.save_report(disposition, monitor)?;
        Ok(())
    }
}

/// Registry of report formatters and the entry point for report I/O.
pub struct ReportManager {
    formatters: Vec<Box<dyn ReportFormatter>>,
}

impl ReportManager {
    /// Creates a manager with the built-in XML formatter registered.
    pub fn new() -> Self {
        let mut manager = Self {
            formatters: Vec::new(),
        };
        manager.register_formatter(Box::new(XmlReportFormatter));
        manager
    }

    /// Registers a formatter. A formatter registered under an existing name
    /// replaces the previous one.
    pub fn register_formatter(&mut self, formatter: Box<dyn ReportFormatter>) {
        debug!(name = formatter.name(), "registering report formatter");
        self.formatters
            .retain(|existing| !existing.name().eq_ignore_ascii_case(formatter.name()));
        self.formatters.push(formatter);
    }

    /// Looks up a formatter by name, case-insensitively.
    pub fn formatter(&self, name: &str) -> Option<&dyn ReportFormatter> {
        self.formatters
            .iter()
            .find(|formatter| formatter.name().eq_ignore_ascii_case(name))
            .map(Box::as_ref)
    }

    /// The registered formatter names, in registration order.
    pub fn formatter_names(&self) -> Vec<&str> {
        self.formatters
            .iter()
            .map(|formatter| formatter.name())
            .collect()
    }

    /// Formats a report through the named formatter.
    pub fn format(
        &self,
        writer: &mut ReportWriter,
        formatter_name: &str,
        options: &FormatterOptions,
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<(), ReportFormatError> {
        let Some(formatter) = self.formatter(formatter_name) else {
            return Err(ReportFormatError::UnknownFormatter {
                name: formatter_name.to_owned(),
                known: self
                    .formatter_names()
                    .into_iter()
                    .map(str::to_owned)
                    .collect(),
            });
        };
        formatter.format(writer, options, monitor)
    }

    /// Creates a reader over an existing report, probing the factory for
    /// archive or file-system layout.
    pub fn create_report_reader(&self, factory: &ReportContainerFactory) -> ReportReader {
        ReportReader::new(factory.make_for_reading())
    }

    /// Creates a writer saving a report in the given archive format.
    pub fn create_report_writer(
        &self,
        report: Report,
        factory: &ReportContainerFactory,
        format: ReportArchiveFormat,
    ) -> ReportWriter {
        ReportWriter::new(report, factory.make_for_saving(format))
    }
}

impl Default for ReportManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::FileSystemReportContainer;
    use crate::progress::NullProgressMonitor;
    use camino_tempfile::Utf8TempDir;

    #[test]
    fn unknown_formatter_error_lists_known_names() {
        let manager = ReportManager::new();
        let dir = Utf8TempDir::new().unwrap();
        let mut writer = ReportWriter::new(
            Report::new(),
            Box::new(FileSystemReportContainer::new(dir.path(), "report")),
        );

        let error = manager
            .format(
                &mut writer,
                "Html",
                &FormatterOptions::new(),
                &mut NullProgressMonitor,
            )
            .unwrap_err();
        assert!(error.to_string().contains("Xml"));
    }

    #[test]
    fn formatter_lookup_is_case_insensitive() {
        let manager = ReportManager::new();
        assert!(manager.formatter("xml").is_some());
        assert!(manager.formatter("XML").is_some());
        assert!(manager.formatter("html").is_none());
    }

    #[test]
    fn xml_formatter_saves_the_report_document() {
        let manager = ReportManager::new();
        let dir = Utf8TempDir::new().unwrap();
        let mut writer = ReportWriter::new(
            Report::new(),
            Box::new(FileSystemReportContainer::new(dir.path(), "report")),
        );

        manager
            .format(
                &mut writer,
                "Xml",
                &FormatterOptions::new(),
                &mut NullProgressMonitor,
            )
            .unwrap();
        assert!(dir.path().join("report.xml").is_file());
    }
}
