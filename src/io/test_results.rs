//! Results reported by the runner that executes generated test suites.
//!
//! The runner lives outside this crate. These types describe what it hands
//! back so that suites generated from mined patterns can be summarised.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, ResultExt, SchaapiError};

/// Outcome of one test method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    /// Test body completed
    Passed,
    /// Assertion failure or unhandled error in the test body
    Failed,
    /// Test explicitly skipped; never counted as a failure
    Ignored,
}

/// One executed test method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseResult {
    /// Test class
    pub class: String,
    /// Test method
    pub name: String,
    /// Outcome
    pub status: TestStatus,
    /// Failure description, when the runner gives one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TestCaseResult {
    /// Create a result without a message
    pub fn new(class: impl Into<String>, name: impl Into<String>, status: TestStatus) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            status,
            message: None,
        }
    }

    /// Attach a failure message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// `Class.method`, followed by the message when present
    pub fn header(&self) -> String {
        match &self.message {
            Some(message) => format!("{}.{}: {}", self.class, self.name, message),
            None => format!("{}.{}", self.class, self.name),
        }
    }
}

/// Hierarchical test results.
///
/// The local counts describe tests executed at this level only; counts of
/// `sub_results` are added by the `total_*` accessors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResults {
    /// Results per subcategory, usually per test class
    #[serde(default)]
    pub sub_results: BTreeMap<String, TestResults>,
    /// Tests executed at this level
    #[serde(default)]
    pub local_total: usize,
    /// Passed tests at this level
    #[serde(default)]
    pub local_passed: usize,
    /// Ignored tests at this level
    #[serde(default)]
    pub local_ignored: usize,
    /// Descriptions of failed tests at this level
    #[serde(default)]
    pub local_failures: Vec<String>,
}

impl TestResults {
    /// Group flat case results per test class
    pub fn from_cases<I>(cases: I) -> Self
    where
        I: IntoIterator<Item = TestCaseResult>,
    {
        let mut root = Self::default();
        for case in cases {
            let class = root.sub_results.entry(case.class.clone()).or_default();
            class.record(&case);
        }
        root
    }

    /// Load a JSON array of case results
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SchaapiError::io(format!("Failed to read test results: {}", path.display()), e)
        })?;
        let cases: Vec<TestCaseResult> = serde_json::from_str(&content)
            .with_context(|| format!("Malformed test results {}", path.display()))?;
        Ok(Self::from_cases(cases))
    }

    fn record(&mut self, case: &TestCaseResult) {
        self.local_total += 1;
        match case.status {
            TestStatus::Passed => self.local_passed += 1,
            TestStatus::Ignored => self.local_ignored += 1,
            TestStatus::Failed => self.local_failures.push(case.header()),
        }
    }

    /// Tests executed here and in every subcategory
    pub fn total_count(&self) -> usize {
        self.local_total + self.sub_results.values().map(Self::total_count).sum::<usize>()
    }

    /// Passed tests, recursively
    pub fn pass_count(&self) -> usize {
        self.local_passed + self.sub_results.values().map(Self::pass_count).sum::<usize>()
    }

    /// Ignored tests, recursively
    pub fn ignore_count(&self) -> usize {
        self.local_ignored + self.sub_results.values().map(Self::ignore_count).sum::<usize>()
    }

    /// Failed tests, recursively
    pub fn failure_count(&self) -> usize {
        self.failures().len()
    }

    /// Failure descriptions, this level first, then subcategories by name
    pub fn failures(&self) -> Vec<String> {
        let mut failures = self.local_failures.clone();
        for sub in self.sub_results.values() {
            failures.extend(sub.failures());
        }
        failures
    }

    /// True when no test ran here or below
    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }

    /// True when any test failed
    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignored_is_not_a_failure() {
        let results = TestResults::from_cases([
            TestCaseResult::new("PatternTest1", "replay", TestStatus::Passed),
            TestCaseResult::new("PatternTest1", "skipped", TestStatus::Ignored),
            TestCaseResult::new("PatternTest2", "replay", TestStatus::Failed)
                .with_message("NullPointerException"),
        ]);

        assert_eq!(results.total_count(), 3);
        assert_eq!(results.pass_count(), 1);
        assert_eq!(results.ignore_count(), 1);
        assert_eq!(results.failure_count(), 1);
        assert_eq!(
            results.failures(),
            vec!["PatternTest2.replay: NullPointerException"]
        );
        assert!(results.has_failures());
        assert_eq!(results.sub_results.len(), 2);
        assert_eq!(results.local_total, 0);
    }

    #[test]
    fn test_empty_results() {
        let results = TestResults::from_cases(Vec::new());
        assert!(results.is_empty());
        assert!(!results.has_failures());

        let mut nested = TestResults::default();
        nested
            .sub_results
            .insert("Empty".into(), TestResults::default());
        assert!(nested.is_empty());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        std::fs::write(
            &path,
            r#"[{"class":"T","name":"a","status":"PASSED"},
                {"class":"T","name":"b","status":"IGNORED"}]"#,
        )
        .unwrap();

        let results = TestResults::from_json_file(&path).unwrap();
        assert_eq!(results.sub_results["T"].local_total, 2);
        assert!(!results.has_failures());
    }
}
