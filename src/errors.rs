use std::{io, path::PathBuf, time::Duration};
use thiserror::Error;

/// Everything that can go wrong while analysing one module.
///
/// None of these escape the sensor: the orchestrator turns them into a
/// failed analysis and keeps going with the next module.
#[derive(Debug, Error)]
pub enum SensorError {
    /// Settings are unusable. Detected before any process is launched.
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    /// The runner outlived its deadline and left no report behind.
    #[error("test runner timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The runner could not be started, or ended without a report.
    #[error("test runner failed ({}): {detail}", describe_exit(.code))]
    ExecutionFailed { code: Option<i32>, detail: String },

    #[error("report not found: {}", .0.display())]
    ReportNotFound(PathBuf),

    /// The report is not well-formed XML. `fragment` is the input around
    /// `position`.
    #[error("malformed report at byte {position}: {message} (near `{fragment}`)")]
    ReportParse {
        position: usize,
        message: String,
        fragment: String,
    },

    #[error("unknown status `{status}` for test `{test}`")]
    UnknownStatus { test: String, status: String },

    /// The host aborted the analysis while the runner was in flight.
    #[error("test run aborted")]
    Cancelled,

    #[error("report {} is locked by another run", .0.display())]
    ReportLocked(PathBuf),

    #[error("a test run is already in flight for this sensor")]
    AlreadyRunning,

    #[error(transparent)]
    Io(#[from] io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code".to_string(),
    }
}

impl From<toml::de::Error> for SensorError {
    fn from(err: toml::de::Error) -> Self {
        SensorError::ConfigurationInvalid(err.to_string())
    }
}

impl From<regex::Error> for SensorError {
    fn from(err: regex::Error) -> Self {
        SensorError::ConfigurationInvalid(err.to_string())
    }
}

impl From<glob::PatternError> for SensorError {
    fn from(err: glob::PatternError) -> Self {
        SensorError::ConfigurationInvalid(err.to_string())
    }
}
