// Copyright (c) The gallio-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loads reports back out of containers.

use crate::container::ReportContainer;
use crate::errors::ReportReadError;
use crate::progress::ProgressMonitor;
use camino::Utf8PathBuf;
use gallio_report_model::{AttachmentContentDisposition, Report, TestStepRun, from_xml};
use tracing::debug;

/// Reads a report out of a [`ReportContainer`].
pub struct ReportReader {
    container: Box<dyn ReportContainer>,
}

impl ReportReader {
    /// Creates a reader over the given container.
    pub fn new(container: Box<dyn ReportContainer>) -> Self {
        Self { container }
    }

    /// Returns the report name the container is rooted at.
    pub fn report_name(&self) -> &str {
        self.container.report_name()
    }

    /// Loads the report document `{reportName}.xml` and repairs parent
    /// linkage in the step-run tree.
    ///
    /// When `load_attachment_contents` is set, the raw bytes of every
    /// linked attachment are read from the container and re-attached to the
    /// in-memory report; otherwise linked attachments keep only their
    /// content path.
    pub fn load_report(
        &mut self,
        load_attachment_contents: bool,
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<Report, ReportReadError> {
        let document_path = Utf8PathBuf::from(format!("{}.xml", self.container.report_name()));
        monitor.begin_task("Loading report.", 1);
        monitor.check_canceled()?;
        monitor.set_status(document_path.as_str());
        debug!(path = %document_path, "loading report document");

        let bytes = self.container.read_file(&document_path)?;
        let text = String::from_utf8(bytes).map_err(|error| ReportReadError::InvalidUtf8 {
            path: document_path.clone(),
            error,
        })?;
        let mut report = from_xml(&text).map_err(|error| ReportReadError::Deserialize {
            path: document_path,
            error,
        })?;
        monitor.worked(1);

        if let Some(run) = report.test_package_run.as_mut() {
            // Parent IDs are not serialized; rebuild them from the tree.
            repair_parent_ids(&mut run.root_test_step_run);
            if load_attachment_contents {
                load_attachments(&mut *self.container, &mut run.root_test_step_run, monitor)?;
            }
        }

        Ok(report)
    }
}

fn repair_parent_ids(step_run: &mut TestStepRun) {
    let parent_id = step_run.step.id.clone();
    for child in &mut step_run.children {
        child.step.parent_id = Some(parent_id.clone());
        repair_parent_ids(child);
    }
}

fn load_attachments(
    container: &mut dyn ReportContainer,
    step_run: &mut TestStepRun,
    monitor: &mut dyn ProgressMonitor,
) -> Result<(), ReportReadError> {
    for attachment in &mut step_run.test_log.attachments {
        // Only linked attachments live in the container; inline or absent
        // contents stay as deserialized even if a stale path is present.
        if attachment.content_disposition != AttachmentContentDisposition::Link {
            continue;
        }
        let Some(content_path) = attachment.content_path.clone() else {
            continue;
        };
        if content_path.as_str().is_empty() {
            continue;
        }

        monitor.check_canceled()?;
        monitor.set_status(content_path.as_str());
        let bytes = container.read_file(&content_path).map_err(|error| {
            ReportReadError::AttachmentLoad {
                path: content_path,
                error,
            }
        })?;
        attachment.set_content_bytes(bytes);
    }

    for child in &mut step_run.children {
        load_attachments(container, child, monitor)?;
    }
    Ok(())
}
