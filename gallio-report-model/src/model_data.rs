// Copyright (c) The gallio-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static test structure and package configuration.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// The static structure of the tests covered by a report, independent of
/// any particular execution.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TestModelData {
    /// The known tests, in discovery order.
    #[serde(rename = "test", default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<TestData>,
}

impl TestModelData {
    /// Creates an empty test model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a test by ID.
    pub fn test(&self, id: &str) -> Option<&TestData> {
        self.tests.iter().find(|test| test.id == id)
    }

    /// Merges another model into this one: tests unseen in this model are
    /// appended in the other model's order, matched by ID.
    pub fn merge_with(&mut self, other: &TestModelData) {
        for test in &other.tests {
            if self.test(&test.id).is_none() {
                self.tests.push(test.clone());
            }
        }
    }
}

/// Identity of one test in the static model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TestData {
    /// The unique ID of the test.
    #[serde(rename = "@id")]
    pub id: String,

    /// The short display name of the test.
    #[serde(rename = "@name")]
    pub name: String,

    /// The fully qualified name of the test.
    #[serde(rename = "@fullName", default, skip_serializing_if = "String::is_empty")]
    pub full_name: String,

    /// Whether the test is a distinct test case.
    #[serde(rename = "@isTestCase", default)]
    pub is_test_case: bool,
}

impl TestData {
    /// Creates test data with the given ID and name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            full_name: name.clone(),
            name,
            is_test_case: false,
        }
    }
}

/// The configuration describing what a test run executed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TestPackageConfig {
    /// The base directory tests resolve relative paths against.
    #[serde(
        rename = "@applicationBaseDirectory",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub application_base_directory: Option<Utf8PathBuf>,

    /// The test files (assemblies) that were loaded.
    #[serde(rename = "file", default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<Utf8PathBuf>,

    /// Extra directories probed when resolving test dependencies.
    #[serde(
        rename = "hintDirectory",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub hint_directories: Vec<Utf8PathBuf>,
}

impl TestPackageConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges another configuration into this one: files and hint
    /// directories unseen here are appended in the other's order. The base
    /// directory is kept from this configuration when both are set.
    pub fn merge_with(&mut self, other: &TestPackageConfig) {
        if self.application_base_directory.is_none() {
            self.application_base_directory = other.application_base_directory.clone();
        }
        for file in &other.files {
            if !self.files.contains(file) {
                self.files.push(file.clone());
            }
        }
        for dir in &other.hint_directories {
            if !self.hint_directories.contains(dir) {
                self.hint_directories.push(dir.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;

    #[test]
    fn model_merge_unions_by_id() {
        let mut a = TestModelData {
            tests: vec![TestData::new("t1", "one"), TestData::new("t2", "two")],
        };
        let b = TestModelData {
            tests: vec![TestData::new("t2", "two"), TestData::new("t3", "three")],
        };

        a.merge_with(&b);

        let ids: Vec<_> = a.tests.iter().map(|test| test.id.as_str()).collect();
        assert_eq!(ids, ["t1", "t2", "t3"]);
    }

    #[test]
    fn config_merge_unions_files() {
        let mut a = TestPackageConfig {
            files: vec!["a.dll".into(), "b.dll".into()],
            ..TestPackageConfig::new()
        };
        let b = TestPackageConfig {
            application_base_directory: Some("/base".into()),
            files: vec!["b.dll".into(), "c.dll".into()],
            ..TestPackageConfig::new()
        };

        a.merge_with(&b);

        assert_eq!(a.files, ["a.dll", "b.dll", "c.dll"].map(Utf8PathBuf::from));
        assert_eq!(
            a.application_base_directory.as_deref(),
            Some(Utf8Path::new("/base"))
        );
    }
}
