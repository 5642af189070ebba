// Copyright (c) The gallio-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Summary statistics about test execution.

use crate::report::TestStepRun;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

/// The pass/fail/inconclusive/skip classification of a test result.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TestStatus {
    /// The test ran and passed.
    Passed,
    /// The test ran and failed.
    Failed,
    /// The test ran but did not produce a definite result.
    #[default]
    Inconclusive,
    /// The test did not run.
    Skipped,
}

impl TestStatus {
    /// Returns the lowercase display name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Inconclusive => "inconclusive",
            Self::Skipped => "skipped",
        }
    }
}

/// A test outcome: a [`TestStatus`] with an optional refining category such
/// as `"timeout"` or `"ignored"`.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    /// The overall status.
    #[serde(rename = "@status")]
    pub status: TestStatus,

    /// An optional category refining the status, e.g. `"timeout"` for a
    /// failed test that exceeded its time limit.
    #[serde(rename = "@category", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl TestOutcome {
    /// Creates an outcome with no category.
    pub fn new(status: TestStatus) -> Self {
        Self {
            status,
            category: None,
        }
    }

    /// Creates a passed outcome.
    pub fn passed() -> Self {
        Self::new(TestStatus::Passed)
    }

    /// Creates a failed outcome.
    pub fn failed() -> Self {
        Self::new(TestStatus::Failed)
    }

    /// Creates an inconclusive outcome.
    pub fn inconclusive() -> Self {
        Self::new(TestStatus::Inconclusive)
    }

    /// Creates a skipped outcome.
    pub fn skipped() -> Self {
        Self::new(TestStatus::Skipped)
    }

    /// Sets the category, consuming self.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Counters summarizing test execution results.
///
/// Assert count and duration use max-aggregation: parent steps publish
/// results that already include their children's contributions, so the root
/// step carries the final tally. All other counters accumulate additively.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// The number of assertions evaluated.
    #[serde(rename = "@assertCount", default)]
    pub assert_count: u64,

    /// The total duration of summarized tests in seconds.
    #[serde(rename = "@duration", default)]
    pub duration: f64,

    /// The number of test cases that were run (passed, failed or
    /// inconclusive, but not skipped).
    #[serde(rename = "@runCount", default)]
    pub run_count: u64,

    /// The number of test cases that ran and passed.
    #[serde(rename = "@passedCount", default)]
    pub passed_count: u64,

    /// The number of test cases that ran and failed.
    #[serde(rename = "@failedCount", default)]
    pub failed_count: u64,

    /// The number of test cases that ran and were inconclusive.
    #[serde(rename = "@inconclusiveCount", default)]
    pub inconclusive_count: u64,

    /// The number of test cases that did not run.
    #[serde(rename = "@skippedCount", default)]
    pub skipped_count: u64,

    /// The total number of test cases.
    #[serde(rename = "@testCount", default)]
    pub test_count: u64,

    /// The total number of test steps.
    #[serde(rename = "@stepCount", default)]
    pub step_count: u64,

    /// Counts keyed by the full outcome (status plus category).
    #[serde(
        rename = "outcomeSummaries",
        with = "outcome_summaries_serde",
        default,
        skip_serializing_if = "IndexMap::is_empty"
    )]
    outcome_counts: IndexMap<TestOutcome, u64>,
}

impl Statistics {
    /// Creates an empty statistics record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of tests with the given outcome.
    pub fn outcome_count(&self, outcome: &TestOutcome) -> u64 {
        self.outcome_counts.get(outcome).copied().unwrap_or(0)
    }

    /// Sets the number of tests with the given outcome.
    pub fn set_outcome_count(&mut self, outcome: TestOutcome, count: u64) {
        self.outcome_counts.insert(outcome, count);
    }

    /// Returns the outcome counters in insertion order.
    pub fn outcome_counts(&self) -> impl Iterator<Item = (&TestOutcome, u64)> {
        self.outcome_counts.iter().map(|(k, v)| (k, *v))
    }

    /// Accumulates the statistics of a test step run.
    ///
    /// Increments the step count unconditionally; for test cases also
    /// increments the test count and records the outcome.
    pub fn merge_step_statistics(&mut self, step_run: &TestStepRun) {
        // Assert count and duration are pre-aggregated: parents include
        // their children's values, so the root tally is the largest seen.
        self.assert_count = self.assert_count.max(step_run.result.assert_count);
        self.duration = self.duration.max(step_run.result.duration);

        self.step_count += 1;

        if !step_run.step.is_test_case {
            return;
        }

        self.test_count += 1;
        self.add_outcome(step_run.result.outcome.clone());
    }

    /// Updates the outcome counters with the outcome of one test case.
    ///
    /// Does not update the test or step count. The run count covers passed,
    /// failed and inconclusive tests but not skipped ones.
    pub fn add_outcome(&mut self, outcome: TestOutcome) {
        match outcome.status {
            TestStatus::Skipped => {
                self.skipped_count += 1;
            }
            TestStatus::Passed => {
                self.passed_count += 1;
                self.run_count += 1;
            }
            TestStatus::Inconclusive => {
                self.inconclusive_count += 1;
                self.run_count += 1;
            }
            TestStatus::Failed => {
                self.failed_count += 1;
                self.run_count += 1;
            }
        }

        *self.outcome_counts.entry(outcome).or_insert(0) += 1;
    }

    /// Merges another statistics record into this one.
    ///
    /// Assert count and duration take the max of the two records; all other
    /// counters, including per-outcome counts, are summed.
    pub fn merge_with(&mut self, other: &Statistics) {
        self.assert_count = self.assert_count.max(other.assert_count);
        self.duration = self.duration.max(other.duration);

        self.run_count += other.run_count;
        self.passed_count += other.passed_count;
        self.failed_count += other.failed_count;
        self.inconclusive_count += other.inconclusive_count;
        self.skipped_count += other.skipped_count;
        self.test_count += other.test_count;
        self.step_count += other.step_count;

        for (outcome, count) in &other.outcome_counts {
            *self.outcome_counts.entry(outcome.clone()).or_insert(0) += count;
        }
    }

    /// Formats a single line of text summarizing test case results, e.g.
    /// `"3 run, 2 passed, 1 failed, 0 inconclusive, 0 skipped"`.
    ///
    /// Categorized outcome counts are appended in parentheses after the
    /// status they refine, sorted by category name.
    pub fn format_test_case_result_summary(&self) -> String {
        let mut out = String::new();

        write!(out, "{} run, ", self.run_count).expect("writing to a String cannot fail");

        write!(out, "{} passed", self.passed_count).expect("writing to a String cannot fail");
        self.append_categorized_counts(&mut out, TestStatus::Passed);
        out.push_str(", ");

        write!(out, "{} failed", self.failed_count).expect("writing to a String cannot fail");
        self.append_categorized_counts(&mut out, TestStatus::Failed);
        out.push_str(", ");

        write!(out, "{} inconclusive", self.inconclusive_count)
            .expect("writing to a String cannot fail");
        self.append_categorized_counts(&mut out, TestStatus::Inconclusive);
        out.push_str(", ");

        write!(out, "{} skipped", self.skipped_count).expect("writing to a String cannot fail");
        self.append_categorized_counts(&mut out, TestStatus::Skipped);

        out
    }

    fn append_categorized_counts(&self, out: &mut String, status: TestStatus) {
        // BTreeMap sorts categories by name.
        let category_counts: BTreeMap<&str, u64> = self
            .outcome_counts
            .iter()
            .filter(|(outcome, _)| outcome.status == status)
            .filter_map(|(outcome, count)| {
                outcome.category.as_deref().map(|category| (category, *count))
            })
            .collect();

        if category_counts.is_empty() {
            return;
        }

        out.push_str(" (");
        let mut first = true;
        for (category, count) in category_counts {
            if !first {
                out.push_str(", ");
            }
            first = false;
            write!(out, "{count} {category}").expect("writing to a String cannot fail");
        }
        out.push(')');
    }
}

/// Serializes the outcome-count map as a `<outcomeSummaries>` element
/// containing one `<outcomeSummary>` per distinct outcome.
mod outcome_summaries_serde {
    use super::TestOutcome;
    use indexmap::IndexMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct OutcomeSummaries {
        #[serde(rename = "outcomeSummary", default)]
        summaries: Vec<OutcomeSummary>,
    }

    // Attribute fields must precede element fields for XML serialization.
    #[derive(Serialize, Deserialize)]
    struct OutcomeSummary {
        #[serde(rename = "@count")]
        count: u64,
        outcome: TestOutcome,
    }

    pub(super) fn serialize<S: Serializer>(
        counts: &IndexMap<TestOutcome, u64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let summaries = OutcomeSummaries {
            summaries: counts
                .iter()
                .map(|(outcome, count)| OutcomeSummary {
                    outcome: outcome.clone(),
                    count: *count,
                })
                .collect(),
        };
        summaries.serialize(serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<IndexMap<TestOutcome, u64>, D::Error> {
        let summaries = OutcomeSummaries::deserialize(deserializer)?;
        Ok(summaries
            .summaries
            .into_iter()
            .map(|summary| (summary.outcome, summary.count))
            .collect())
    }
}
