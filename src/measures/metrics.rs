use std::fmt;

/// Metrics contributed by the sensor. The keys are the host's unit-test
/// metric keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    Tests,
    TestFailures,
    TestErrors,
    SkippedTests,
    /// Milliseconds.
    TestExecutionTime,
    /// Percentage of tests neither failing nor in error.
    TestSuccessDensity,
    /// Per-resource XML detail of every test case.
    TestData,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Tests,
        Metric::TestFailures,
        Metric::TestErrors,
        Metric::SkippedTests,
        Metric::TestExecutionTime,
        Metric::TestSuccessDensity,
        Metric::TestData,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Metric::Tests => "tests",
            Metric::TestFailures => "test_failures",
            Metric::TestErrors => "test_errors",
            Metric::SkippedTests => "skipped_tests",
            Metric::TestExecutionTime => "test_execution_time",
            Metric::TestSuccessDensity => "test_success_density",
            Metric::TestData => "test_data",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(u64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:.1}", v),
            Value::Text(v) => f.write_str(v),
        }
    }
}

/// One fact handed to the host measure store.
#[derive(Debug, Clone, PartialEq)]
pub struct Measure {
    pub metric: Metric,
    pub value: Value,
}

impl Measure {
    pub fn int(metric: Metric, value: u64) -> Self {
        Self {
            metric,
            value: Value::Int(value),
        }
    }

    pub fn float(metric: Metric, value: f64) -> Self {
        Self {
            metric,
            value: Value::Float(value),
        }
    }

    pub fn text(metric: Metric, value: String) -> Self {
        Self {
            metric,
            value: Value::Text(value),
        }
    }
}
