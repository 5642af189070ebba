// Copyright (c) The gallio-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The report tree: package run, step runs and results.

use crate::log::TestLog;
use crate::model_data::{TestModelData, TestPackageConfig};
use crate::statistics::{Statistics, TestOutcome};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// The root entity of a test execution report.
///
/// Holds the configuration that was executed, the static test model, the
/// dynamic results of one execution pass and any free-form log messages
/// emitted by the runner.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "report")]
pub struct Report {
    /// The configuration describing what was run.
    #[serde(
        rename = "testPackageConfig",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub test_package_config: Option<TestPackageConfig>,

    /// The static structure of the tests that were run.
    #[serde(rename = "testModel", default, skip_serializing_if = "Option::is_none")]
    pub test_model: Option<TestModelData>,

    /// The dynamic results of the execution pass.
    #[serde(
        rename = "testPackageRun",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub test_package_run: Option<TestPackageRun>,

    /// Free-form log messages emitted by the runner.
    #[serde(
        rename = "logEntries",
        default,
        skip_serializing_if = "LogEntries::is_empty"
    )]
    pub log_entries: LogEntries,
}

impl Report {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a log entry.
    pub fn add_log_entry(&mut self, entry: LogEntry) {
        self.log_entries.entries.push(entry);
    }

    /// Counts the attachments across all step runs.
    pub fn attachment_count(&self) -> usize {
        self.test_package_run
            .as_ref()
            .map(|run| {
                run.all_test_step_runs()
                    .map(|step_run| step_run.test_log.attachments.len())
                    .sum()
            })
            .unwrap_or(0)
    }
}

/// The list of free-form runner log entries, serialized as a `<logEntries>`
/// element wrapping `<logEntry>` children.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LogEntries {
    /// The entries in emission order.
    #[serde(rename = "logEntry", default)]
    pub entries: Vec<LogEntry>,
}

impl LogEntries {
    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The severity of a runner log entry.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogSeverity {
    /// Diagnostic detail.
    Debug,
    /// Routine information.
    #[default]
    Info,
    /// Information the user should notice.
    Important,
    /// A recoverable problem.
    Warning,
    /// A failure.
    Error,
}

/// A free-form log message emitted by the test runner.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// The severity of the message.
    #[serde(rename = "@severity", default)]
    pub severity: LogSeverity,

    /// The message text.
    #[serde(rename = "@message")]
    pub message: String,

    /// Exception or other details accompanying the message.
    #[serde(rename = "@details", default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Creates a log entry with the given severity and message.
    pub fn new(severity: LogSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            details: None,
        }
    }
}

/// One execution pass over a test package.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestPackageRun {
    /// When the pass started.
    #[serde(rename = "@startTime")]
    pub start_time: DateTime<FixedOffset>,

    /// When the pass ended.
    #[serde(rename = "@endTime")]
    pub end_time: DateTime<FixedOffset>,

    /// Aggregated statistics over the whole step-run tree.
    #[serde(default)]
    pub statistics: Statistics,

    /// The root of the step-run tree. Exactly one root exists per pass.
    #[serde(rename = "testStepRun")]
    pub root_test_step_run: TestStepRun,
}

impl TestPackageRun {
    /// Creates a package run rooted at the given step run.
    pub fn new(
        root_test_step_run: TestStepRun,
        start_time: DateTime<FixedOffset>,
        end_time: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            start_time,
            end_time,
            statistics: Statistics::new(),
            root_test_step_run,
        }
    }

    /// Returns a pre-order traversal over all step runs in the tree,
    /// starting at the root.
    pub fn all_test_step_runs(&self) -> impl Iterator<Item = &TestStepRun> {
        self.root_test_step_run.descendants_and_self()
    }

    /// Recomputes the statistics from the step-run tree.
    pub fn refresh_statistics(&mut self) {
        let mut statistics = Statistics::new();
        for step_run in self.root_test_step_run.descendants_and_self() {
            statistics.merge_step_statistics(step_run);
        }
        self.statistics = statistics;
    }

    /// Merges another package run into this one.
    ///
    /// The time range widens to cover both runs, statistics merge per
    /// [`Statistics::merge_with`], and the other run's root children are
    /// appended after this run's children. Per-input child order is
    /// preserved; no interleaving guarantee is made across inputs.
    pub fn merge_with(&mut self, other: &TestPackageRun) {
        self.start_time = self.start_time.min(other.start_time);
        self.end_time = self.end_time.max(other.end_time);
        self.statistics.merge_with(&other.statistics);
        self.root_test_step_run
            .children
            .extend(other.root_test_step_run.children.iter().cloned());
    }
}

/// Identity and metadata of a test step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TestStepData {
    /// The unique ID of the step.
    #[serde(rename = "@id")]
    pub id: String,

    /// The short display name of the step.
    #[serde(rename = "@name")]
    pub name: String,

    /// The fully qualified name of the step.
    #[serde(rename = "@fullName", default, skip_serializing_if = "String::is_empty")]
    pub full_name: String,

    /// The ID of the parent step.
    ///
    /// Not serialized: parent linkage is implied by the tree structure and
    /// repaired after deserialization by the report reader.
    #[serde(rename = "@parentId", default, skip_serializing)]
    pub parent_id: Option<String>,

    /// The ID of the test this step belongs to.
    #[serde(rename = "@testId", default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,

    /// Whether the step represents a distinct test case, as opposed to a
    /// grouping construct such as a fixture or suite.
    #[serde(rename = "@isTestCase", default)]
    pub is_test_case: bool,

    /// Key/value metadata associated with the step.
    #[serde(rename = "metadata", default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<MetadataEntry>,
}

impl TestStepData {
    /// Creates step data with the given ID and name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            full_name: name.clone(),
            name,
            parent_id: None,
            test_id: None,
            is_test_case: false,
            metadata: Vec::new(),
        }
    }
}

/// One key/value metadata pair of a test step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// The metadata key, e.g. `"Category"`.
    #[serde(rename = "@key")]
    pub key: String,
    /// The metadata value.
    #[serde(rename = "@value")]
    pub value: String,
}

/// The outcome of a test step run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// The number of assertions evaluated, including children's.
    #[serde(rename = "@assertCount", default)]
    pub assert_count: u64,

    /// The duration in seconds, including children's.
    #[serde(rename = "@duration", default)]
    pub duration: f64,

    /// The outcome classification.
    #[serde(default)]
    pub outcome: TestOutcome,
}

/// One node of the recursively nested execution record.
///
/// The step-run tree is acyclic and rooted at exactly one node per package
/// run; children appear in execution order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TestStepRun {
    /// When the step started.
    #[serde(rename = "@startTime", default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<FixedOffset>>,

    /// When the step ended.
    #[serde(rename = "@endTime", default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<FixedOffset>>,

    /// The step's identity and metadata.
    #[serde(rename = "testStep")]
    pub step: TestStepData,

    /// The step's result.
    #[serde(default)]
    pub result: TestResult,

    /// The execution log of the step.
    #[serde(rename = "testLog", default, skip_serializing_if = "TestLog::is_empty")]
    pub test_log: TestLog,

    /// Nested step runs in execution order, serialized as repeated
    /// `<testStepRun>` children.
    #[serde(rename = "testStepRun", default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TestStepRun>,
}

impl TestStepRun {
    /// Creates a step run with the given step data and result.
    pub fn new(step: TestStepData, result: TestResult) -> Self {
        Self {
            start_time: None,
            end_time: None,
            step,
            result,
            test_log: TestLog::new(),
            children: Vec::new(),
        }
    }

    /// Adds a child step run, setting its parent ID from this step.
    pub fn add_child(&mut self, mut child: TestStepRun) -> &mut Self {
        child.step.parent_id = Some(self.step.id.clone());
        self.children.push(child);
        self
    }

    /// Returns a pre-order traversal over this step run and all of its
    /// descendants.
    pub fn descendants_and_self(&self) -> impl Iterator<Item = &TestStepRun> {
        DescendantsIter { stack: vec![self] }
    }
}

struct DescendantsIter<'a> {
    stack: Vec<&'a TestStepRun>,
}

impl<'a> Iterator for DescendantsIter<'a> {
    type Item = &'a TestStepRun;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        // Push children in reverse so they pop in execution order.
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn step(id: &str) -> TestStepRun {
        TestStepRun::new(TestStepData::new(id, id), TestResult::default())
    }

    #[test]
    fn traversal_is_pre_order() {
        let mut root = step("root");
        let mut a = step("a");
        a.add_child(step("a1"));
        a.add_child(step("a2"));
        root.add_child(a);
        root.add_child(step("b"));

        let order: Vec<_> = root
            .descendants_and_self()
            .map(|run| run.step.id.as_str())
            .collect();
        assert_eq!(order, ["root", "a", "a1", "a2", "b"]);
    }

    #[test]
    fn add_child_sets_parent_id() {
        let mut root = step("root");
        root.add_child(step("child"));
        assert_eq!(root.children[0].step.parent_id.as_deref(), Some("root"));
    }

    #[test]
    fn merge_widens_time_range_and_appends_children() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let mut root_a = step("root");
        root_a.add_child(step("a"));
        let mut run_a = TestPackageRun::new(
            root_a,
            tz.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
            tz.with_ymd_and_hms(2026, 3, 1, 10, 5, 0).unwrap(),
        );

        let mut root_b = step("root");
        root_b.add_child(step("b1"));
        root_b.add_child(step("b2"));
        let run_b = TestPackageRun::new(
            root_b,
            tz.with_ymd_and_hms(2026, 3, 1, 9, 55, 0).unwrap(),
            tz.with_ymd_and_hms(2026, 3, 1, 10, 2, 0).unwrap(),
        );

        run_a.merge_with(&run_b);

        assert_eq!(
            run_a.start_time,
            tz.with_ymd_and_hms(2026, 3, 1, 9, 55, 0).unwrap()
        );
        assert_eq!(
            run_a.end_time,
            tz.with_ymd_and_hms(2026, 3, 1, 10, 5, 0).unwrap()
        );
        let children: Vec<_> = run_a
            .root_test_step_run
            .children
            .iter()
            .map(|run| run.step.id.as_str())
            .collect();
        assert_eq!(children, ["a", "b1", "b2"]);
    }
}
