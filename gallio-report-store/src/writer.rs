// Copyright (c) The gallio-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serializes reports into containers.

use crate::container::ReportContainer;
use crate::errors::ReportWriteError;
use crate::progress::ProgressMonitor;
use camino::Utf8PathBuf;
use gallio_report_model::{
    AttachmentContentDisposition, Report, TestLogAttachment, TestStepRun, encode_file_name,
    extension_for_content_type, to_xml,
};
use tracing::debug;

/// Computes the container-relative path under which an attachment's raw
/// bytes are stored when it is saved with Link disposition.
///
/// The layout is `{reportName}/{stepId}/{attachmentName}{extension}` with
/// the step ID and attachment name encoded into file-name safe form and the
/// extension chosen from the attachment's content type.
pub fn attachment_path(
    report_name: &str,
    step_id: &str,
    attachment: &TestLogAttachment,
) -> Utf8PathBuf {
    let file_name = format!(
        "{}{}",
        encode_file_name(&attachment.name),
        extension_for_content_type(&attachment.content_type)
    );
    Utf8PathBuf::from(report_name)
        .join(encode_file_name(step_id))
        .join(file_name)
}

/// Writes a report and its attachments into a [`ReportContainer`].
///
/// The writer tracks what has already been saved, so repeated calls to
/// [`save_report`](Self::save_report) and
/// [`save_report_attachments`](Self::save_report_attachments) are no-ops.
pub struct ReportWriter {
    report: Report,
    container: Box<dyn ReportContainer>,
    report_saved: bool,
    attachments_saved: bool,
    report_document_paths: Vec<Utf8PathBuf>,
}

impl ReportWriter {
    /// Creates a writer for the given report and container.
    pub fn new(report: Report, container: Box<dyn ReportContainer>) -> Self {
        Self {
            report,
            container,
            report_saved: false,
            attachments_saved: false,
            report_document_paths: Vec::new(),
        }
    }

    /// Returns the report being written.
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Returns the report being written, mutably.
    pub fn report_mut(&mut self) -> &mut Report {
        &mut self.report
    }

    /// Returns the report name the container is rooted at.
    pub fn report_name(&self) -> &str {
        self.container.report_name()
    }

    /// Returns the container being written into, for formatters that emit
    /// additional files alongside the report document.
    pub fn container(&mut self) -> &mut dyn ReportContainer {
        &mut *self.container
    }

    /// The container-relative paths of the report documents produced so
    /// far, in the order they were saved.
    pub fn report_document_paths(&self) -> &[Utf8PathBuf] {
        &self.report_document_paths
    }

    /// Records that a formatter produced a report document at the given
    /// container-relative path.
    pub fn add_report_document_path(&mut self, path: Utf8PathBuf) {
        self.report_document_paths.push(path);
    }

    /// Serializes the report to an XML string with every attachment
    /// projected to the requested content disposition.
    ///
    /// The projection is applied to a copy; the in-memory report is never
    /// mutated by serialization.
    pub fn serialize_report(
        &self,
        disposition: AttachmentContentDisposition,
    ) -> Result<String, ReportWriteError> {
        let mut projected = self.report.clone();
        if let Some(run) = projected.test_package_run.as_mut() {
            project_dispositions(
                self.container.report_name(),
                &mut run.root_test_step_run,
                disposition,
            );
        }
        to_xml(&projected).map_err(|error| ReportWriteError::Serialize { error })
    }

    /// Saves the report document as `{reportName}.xml`, then, for Link
    /// disposition, the raw contents of every attachment as sibling files.
    ///
    /// Finalizes the container when done. A second call is a no-op.
    pub fn save_report(
        &mut self,
        disposition: AttachmentContentDisposition,
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<(), ReportWriteError> {
        if self.report_saved {
            return Ok(());
        }

        let total_work = if disposition == AttachmentContentDisposition::Link {
            self.report.attachment_count() as u64 + 1
        } else {
            1
        };
        monitor.begin_task("Saving report.", total_work);
        monitor.check_canceled()?;

        let xml = self.serialize_report(disposition)?;
        let document_path = Utf8PathBuf::from(format!("{}.xml", self.container.report_name()));
        monitor.set_status(document_path.as_str());
        debug!(path = %document_path, "saving report document");
        self.container.write_file(&document_path, xml.as_bytes())?;
        if !self.report_document_paths.contains(&document_path) {
            self.report_document_paths.push(document_path);
        }
        monitor.worked(1);

        if disposition == AttachmentContentDisposition::Link {
            self.save_report_attachments(monitor)?;
        }

        self.container.finish()?;

        // Marked saved only once attachments landed and the container is
        // finalized, so a failed save can be retried.
        self.report_saved = true;
        Ok(())
    }

    /// Saves the raw contents of every attachment that has contents loaded,
    /// one container file per attachment. A second call is a no-op.
    pub fn save_report_attachments(
        &mut self,
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<(), ReportWriteError> {
        if self.attachments_saved {
            return Ok(());
        }

        let report_name = self.container.report_name().to_owned();
        let mut files = Vec::new();
        if let Some(run) = self.report.test_package_run.as_ref() {
            for step_run in run.all_test_step_runs() {
                for attachment in &step_run.test_log.attachments {
                    // Attachments loaded without contents stay as links.
                    if let Some(bytes) = attachment.content_bytes() {
                        files.push((
                            attachment_path(&report_name, &step_run.step.id, attachment),
                            bytes,
                        ));
                    }
                }
            }
        }

        for (path, bytes) in files {
            monitor.check_canceled()?;
            monitor.set_status(path.as_str());
            self.container
                .write_file(&path, &bytes)
                .map_err(|error| ReportWriteError::AttachmentSave {
                    path: path.clone(),
                    error,
                })?;
            monitor.worked(1);
        }

        self.attachments_saved = true;
        Ok(())
    }
}

fn project_dispositions(
    report_name: &str,
    step_run: &mut TestStepRun,
    disposition: AttachmentContentDisposition,
) {
    let step_id = step_run.step.id.clone();
    for attachment in &mut step_run.test_log.attachments {
        attachment.content_disposition = disposition;
        match disposition {
            AttachmentContentDisposition::Link => {
                attachment.content_path =
                    Some(attachment_path(report_name, &step_id, attachment));
                attachment.serialized_contents = None;
            }
            AttachmentContentDisposition::Inline => {
                attachment.content_path = None;
            }
            AttachmentContentDisposition::Absent => {
                attachment.content_path = None;
                attachment.serialized_contents = None;
            }
        }
    }
    for child in &mut step_run.children {
        project_dispositions(report_name, child, disposition);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::FileSystemReportContainer;
    use crate::progress::NullProgressMonitor;
    use camino::Utf8Path;
    use camino_tempfile::Utf8TempDir;
    use chrono::TimeZone;
    use gallio_report_model::{TestPackageRun, TestResult, TestStepData};
    use pretty_assertions::assert_eq;

    fn report_with_attachment() -> Report {
        let mut step = TestStepData::new("step-1", "Step one");
        step.is_test_case = true;
        let mut step_run = TestStepRun::new(step, TestResult::default());
        step_run
            .test_log
            .add_attachment(TestLogAttachment::text("notes", "text/plain", "hello"));

        let tz = chrono::FixedOffset::east_opt(0).unwrap();
        let mut report = Report::new();
        report.test_package_run = Some(TestPackageRun::new(
            step_run,
            tz.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
            tz.with_ymd_and_hms(2026, 3, 1, 10, 1, 0).unwrap(),
        ));
        report
    }

    fn writer_in(dir: &Utf8Path) -> ReportWriter {
        ReportWriter::new(
            report_with_attachment(),
            Box::new(FileSystemReportContainer::new(dir, "report")),
        )
    }

    #[test]
    fn attachment_paths_encode_step_and_name() {
        let attachment = TestLogAttachment::binary("shot/1", "image/png", &[1, 2, 3]);
        assert_eq!(
            attachment_path("report", "step:7", &attachment),
            Utf8PathBuf::from("report/step_7/shot_1.png")
        );
    }

    #[test]
    fn link_save_writes_document_and_attachment_files() {
        let dir = Utf8TempDir::new().unwrap();
        let mut writer = writer_in(dir.path());
        writer
            .save_report(AttachmentContentDisposition::Link, &mut NullProgressMonitor)
            .unwrap();

        let xml = std::fs::read_to_string(dir.path().join("report.xml")).unwrap();
        assert!(xml.contains("contentDisposition=\"link\""));
        assert!(xml.contains("contentPath=\"report/step-1/notes.txt\""));
        assert!(!xml.contains(">hello<"));

        let contents = std::fs::read_to_string(dir.path().join("report/step-1/notes.txt")).unwrap();
        assert_eq!(contents, "hello");
        assert_eq!(
            writer.report_document_paths(),
            &[Utf8PathBuf::from("report.xml")]
        );
    }

    #[test]
    fn inline_save_embeds_contents_without_paths() {
        let dir = Utf8TempDir::new().unwrap();
        let mut writer = writer_in(dir.path());
        writer
            .save_report(
                AttachmentContentDisposition::Inline,
                &mut NullProgressMonitor,
            )
            .unwrap();

        let xml = std::fs::read_to_string(dir.path().join("report.xml")).unwrap();
        assert!(xml.contains("contentDisposition=\"inline\""));
        assert!(!xml.contains("contentPath"));
        assert!(xml.contains("hello"));
        assert!(!dir.path().join("report/step-1").exists());
    }

    #[test]
    fn serialization_does_not_mutate_the_report() {
        let dir = Utf8TempDir::new().unwrap();
        let writer = writer_in(dir.path());
        let before = writer.report().clone();

        writer
            .serialize_report(AttachmentContentDisposition::Link)
            .unwrap();

        assert_eq!(writer.report(), &before);
    }

    /// Allows the report document through, then cancels before any
    /// attachment is written.
    #[derive(Default)]
    struct CancelAfterDocument {
        worked: u64,
    }

    impl crate::progress::ProgressMonitor for CancelAfterDocument {
        fn begin_task(&mut self, _description: &str, _total_work: u64) {}

        fn set_status(&mut self, _status: &str) {}

        fn worked(&mut self, amount: u64) {
            self.worked += amount;
        }

        fn is_canceled(&self) -> bool {
            self.worked >= 1
        }
    }

    #[test]
    fn interrupted_save_can_be_retried() {
        let dir = Utf8TempDir::new().unwrap();
        let mut writer = writer_in(dir.path());

        let error = writer
            .save_report(
                AttachmentContentDisposition::Link,
                &mut CancelAfterDocument::default(),
            )
            .unwrap_err();
        assert!(matches!(error, crate::errors::ReportWriteError::Canceled(_)));
        assert!(!dir.path().join("report/step-1/notes.txt").exists());

        writer
            .save_report(AttachmentContentDisposition::Link, &mut NullProgressMonitor)
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("report/step-1/notes.txt")).unwrap(),
            "hello"
        );
        assert_eq!(
            writer.report_document_paths(),
            &[Utf8PathBuf::from("report.xml")]
        );
    }

    #[test]
    fn repeated_save_is_a_no_op() {
        let dir = Utf8TempDir::new().unwrap();
        let mut writer = writer_in(dir.path());
        writer
            .save_report(AttachmentContentDisposition::Link, &mut NullProgressMonitor)
            .unwrap();
        std::fs::remove_file(dir.path().join("report.xml")).unwrap();

        writer
            .save_report(AttachmentContentDisposition::Link, &mut NullProgressMonitor)
            .unwrap();
        assert!(!dir.path().join("report.xml").exists());
    }
}
