// Copyright (c) The gallio-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Combines independently produced reports into one.

use gallio_report_model::Report;

/// Merges reports from separate execution passes into a single report.
///
/// Inputs are folded left to right: package configurations and test models
/// are unioned, package runs widen the time range and merge statistics, and
/// the merged root adopts every input root's children in input order. Runner
/// log entries are concatenated in input order.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReportMerger;

impl ReportMerger {
    /// Creates a merger.
    pub fn new() -> Self {
        Self
    }

    /// Merges the given reports. Merging no reports yields an empty report.
    pub fn merge<'a>(&self, reports: impl IntoIterator<Item = &'a Report>) -> Report {
        let mut merged = Report::new();
        for report in reports {
            if let Some(config) = &report.test_package_config {
                match merged.test_package_config.as_mut() {
                    Some(existing) => existing.merge_with(config),
                    None => merged.test_package_config = Some(config.clone()),
                }
            }

            if let Some(model) = &report.test_model {
                match merged.test_model.as_mut() {
                    Some(existing) => existing.merge_with(model),
                    None => merged.test_model = Some(model.clone()),
                }
            }

            if let Some(run) = &report.test_package_run {
                match merged.test_package_run.as_mut() {
                    Some(existing) => existing.merge_with(run),
                    None => merged.test_package_run = Some(run.clone()),
                }
            }

            merged
                .log_entries
                .entries
                .extend(report.log_entries.entries.iter().cloned());
        }
        merged
    }
}
