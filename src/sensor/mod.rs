//! Sensors perform one analysis pass per module and contribute measures.
//!
//! Sensors are registered explicitly with a [Registry] at startup; there is
//! no discovery.

mod gallio;
mod registry;

pub use gallio::GallioSensor;
pub use registry::Registry;

use crate::{
    config::SettingsLayer,
    errors::SensorError,
    measures::{MeasureSet, Metric},
    publish::MeasurePublisher,
};
use futures::future::BoxFuture;
use std::path::PathBuf;

/// A unit of analysis: a named directory with its merged settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub base_dir: PathBuf,
    pub settings: SettingsLayer,
}

impl Module {
    pub fn new(
        name: impl Into<String>,
        base_dir: impl Into<PathBuf>,
        settings: SettingsLayer,
    ) -> Self {
        Self {
            name: name.into(),
            base_dir: base_dir.into(),
            settings,
        }
    }
}

/// States of one analysis pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Skipped,
    Running,
    Parsing,
    Published,
    Failed,
}

impl State {
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Skipped | State::Published | State::Failed)
    }
}

#[derive(Debug)]
pub enum Outcome {
    /// The module opted out. Nothing was published.
    Skipped,
    /// Measures were handed to the publisher. `warning` is set when only a
    /// recovered part of a damaged report was used.
    Published {
        measures: MeasureSet,
        warning: Option<String>,
    },
    /// Nothing was published; the error went to the publisher's failure hook.
    Failed(SensorError),
}

/// Result of analysing one module.
#[derive(Debug)]
pub struct Analysis {
    pub module: String,
    /// Every state the pass went through, starting at [State::Idle].
    pub trace: Vec<State>,
    pub outcome: Outcome,
}

impl Analysis {
    /// The final state of the pass.
    pub fn state(&self) -> State {
        self.trace.last().copied().unwrap_or(State::Idle)
    }

    pub fn measures(&self) -> Option<&MeasureSet> {
        match &self.outcome {
            Outcome::Published { measures, .. } => Some(measures),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SensorError> {
        match &self.outcome {
            Outcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed(_))
    }
}

/// A component that analyses modules. Implementations catch their own
/// errors: `analyze` always yields an [Analysis].
pub trait Sensor: Send + Sync {
    fn name(&self) -> &str;

    /// Metrics this sensor may publish.
    fn metrics(&self) -> &[Metric] {
        &[]
    }

    fn analyze<'a>(
        &'a self,
        module: &'a Module,
        publisher: &'a mut (dyn MeasurePublisher + Send),
    ) -> BoxFuture<'a, Analysis>;
}
