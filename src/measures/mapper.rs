use super::metrics::{Measure, Metric};
use crate::{
    errors::SensorError,
    report::{Status, TestReport},
};
use quick_xml::escape::escape;
use std::{collections::BTreeMap, time::Duration};

/// Resource of test cases whose report carries no fixture or assembly.
pub const UNASSIGNED_RESOURCE: &str = "(unassigned)";

/// Status counts and summed duration of a group of test cases.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Counts {
    pub tests: u64,
    pub passed: u64,
    pub failures: u64,
    pub errors: u64,
    pub skipped: u64,
    pub duration: Duration,
}

impl Counts {
    fn add(&mut self, status: &Status, duration: Duration) {
        self.tests += 1;
        self.duration = self.duration.saturating_add(duration);
        match status {
            Status::Passed => self.passed += 1,
            Status::Failed => self.failures += 1,
            Status::Error => self.errors += 1,
            Status::Skipped => self.skipped += 1,
            Status::Unrecognized(_) => unreachable!("rejected before counting"),
        }
    }

    /// Share of executed tests that neither failed nor errored, in percent.
    /// `None` when nothing was executed.
    pub fn success_density(&self) -> Option<f64> {
        let executed = self.tests - self.skipped;
        if executed == 0 {
            return None;
        }
        let ok = executed - self.failures - self.errors;
        Some(ok as f64 * 100.0 / executed as f64)
    }

    fn measures(&self) -> Vec<Measure> {
        let mut measures = vec![
            Measure::int(Metric::Tests, self.tests),
            Measure::int(Metric::TestFailures, self.failures),
            Measure::int(Metric::TestErrors, self.errors),
            Measure::int(Metric::SkippedTests, self.skipped),
            Measure::int(Metric::TestExecutionTime, self.duration.as_millis() as u64),
        ];
        if let Some(density) = self.success_density() {
            measures.push(Measure::float(Metric::TestSuccessDensity, density));
        }
        measures
    }
}

/// Mapped view of one test case.
#[derive(Debug, Clone, PartialEq)]
pub struct TestDetail {
    pub name: String,
    pub resource: String,
    pub status: Status,
    pub duration: Duration,
    pub message: Option<String>,
}

/// Measures derived from one [TestReport]. Built once, read-only after.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureSet {
    totals: Counts,
    resources: BTreeMap<String, Counts>,
    details: Vec<TestDetail>,
}

impl MeasureSet {
    /// Fold a report into measures. Any unrecognized status fails the whole
    /// fold rather than dropping the test.
    pub fn from_report(report: &TestReport) -> Result<Self, SensorError> {
        let mut totals = Counts::default();
        let mut resources: BTreeMap<String, Counts> = BTreeMap::new();
        let mut details = Vec::with_capacity(report.len());

        for case in &report.cases {
            if let Status::Unrecognized(raw) = &case.status {
                return Err(SensorError::UnknownStatus {
                    test: case.name.clone(),
                    status: raw.clone(),
                });
            }
            let resource = case
                .fixture
                .clone()
                .or_else(|| case.assembly.clone())
                .unwrap_or_else(|| UNASSIGNED_RESOURCE.to_string());

            totals.add(&case.status, case.duration);
            resources
                .entry(resource.clone())
                .or_default()
                .add(&case.status, case.duration);
            details.push(TestDetail {
                name: case.name.clone(),
                resource,
                status: case.status.clone(),
                duration: case.duration,
                message: case.message.clone(),
            });
        }

        Ok(MeasureSet {
            totals,
            resources,
            details,
        })
    }

    pub fn total(&self) -> u64 {
        self.totals.tests
    }

    pub fn passed(&self) -> u64 {
        self.totals.passed
    }

    pub fn failures(&self) -> u64 {
        self.totals.failures
    }

    pub fn errors(&self) -> u64 {
        self.totals.errors
    }

    pub fn skipped(&self) -> u64 {
        self.totals.skipped
    }

    pub fn duration(&self) -> Duration {
        self.totals.duration
    }

    pub fn totals(&self) -> &Counts {
        &self.totals
    }

    pub fn details(&self) -> &[TestDetail] {
        &self.details
    }

    /// Resources in name order with their counts.
    pub fn resources(&self) -> impl Iterator<Item = (&str, &Counts)> {
        self.resources.iter().map(|(name, counts)| (name.as_str(), counts))
    }

    /// Tests that failed or errored.
    pub fn failing(&self) -> impl Iterator<Item = &TestDetail> {
        self.details
            .iter()
            .filter(|d| matches!(d.status, Status::Failed | Status::Error))
    }

    /// Module-level measures.
    pub fn measures(&self) -> Vec<Measure> {
        self.totals.measures()
    }

    /// Measures of one resource, including its `test_data` detail. Empty for
    /// an unknown resource.
    pub fn resource_measures(&self, resource: &str) -> Vec<Measure> {
        let counts = match self.resources.get(resource) {
            Some(counts) => counts,
            None => return Vec::new(),
        };
        let mut measures = counts.measures();
        measures.push(Measure::text(Metric::TestData, self.test_data(resource)));
        measures
    }

    /// XML detail of the test cases of one resource.
    fn test_data(&self, resource: &str) -> String {
        let mut xml = String::from("<tests-details>");
        for detail in self.details.iter().filter(|d| d.resource == resource) {
            let status = match detail.status {
                Status::Passed => "ok",
                Status::Failed => "failure",
                Status::Error => "error",
                _ => "skipped",
            };
            xml.push_str(&format!(
                r#"<testcase status="{}" time="{}" name="{}""#,
                status,
                detail.duration.as_millis(),
                escape(&detail.name)
            ));
            match (&detail.status, &detail.message) {
                (Status::Failed, Some(msg)) | (Status::Error, Some(msg)) => {
                    let tag = if detail.status == Status::Failed {
                        "failure"
                    } else {
                        "error"
                    };
                    xml.push_str(&format!(
                        r#"><{} message="{}"/></testcase>"#,
                        tag,
                        escape(msg)
                    ));
                }
                _ => xml.push_str("/>"),
            }
        }
        xml.push_str("</tests-details>");
        xml
    }
}
