//! In-memory form of a Gallio test report, and how to find and read one.

pub mod locator;
pub mod parser;

use std::time::Duration;

/// Outcome of a single test case, as recorded in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Passed,
    Failed,
    Skipped,
    Error,
    /// A value outside the known vocabulary, kept verbatim so the mapper can
    /// reject it instead of losing the test.
    Unrecognized(String),
}

impl Status {
    /// Classify a Gallio `outcome` element from its `status` and
    /// `category` attributes.
    pub fn from_outcome(status: &str, category: Option<&str>) -> Self {
        match (status, category) {
            ("passed", _) => Status::Passed,
            ("failed", Some("error")) | ("failed", Some("timeout")) => Status::Error,
            ("failed", _) => Status::Failed,
            ("skipped", _) | ("inconclusive", _) => Status::Skipped,
            ("error", _) => Status::Error,
            (other, _) => Status::Unrecognized(other.to_string()),
        }
    }

    /// Short name used in measures and summaries.
    pub fn as_str(&self) -> &str {
        match self {
            Status::Passed => "passed",
            Status::Failed => "failed",
            Status::Skipped => "skipped",
            Status::Error => "error",
            Status::Unrecognized(raw) => raw,
        }
    }
}

/// One executed test case.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCaseResult {
    /// Fully qualified test name.
    pub name: String,
    /// Fixture type the test lives in (`Namespace.Type`), if known.
    pub fixture: Option<String>,
    pub assembly: Option<String>,
    pub status: Status,
    pub duration: Duration,
    pub message: Option<String>,
}

impl TestCaseResult {
    /// A bare test case, mostly useful when building reports by hand.
    pub fn new(name: impl Into<String>, status: Status) -> Self {
        Self {
            name: name.into(),
            fixture: None,
            assembly: None,
            status,
            duration: Duration::ZERO,
            message: None,
        }
    }

    pub fn with_fixture(mut self, fixture: impl Into<String>) -> Self {
        self.fixture = Some(fixture.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Test cases of one analysis pass, in report order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestReport {
    pub cases: Vec<TestCaseResult>,
}

impl TestReport {
    pub fn new(cases: Vec<TestCaseResult>) -> Self {
        Self { cases }
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Append the cases of another report, keeping order.
    pub fn extend(&mut self, other: TestReport) {
        self.cases.extend(other.cases);
    }
}
