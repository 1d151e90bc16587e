//! The seam between the sensor and the host measure store.
use crate::{
    errors::SensorError,
    measures::{Measure, MeasureSet},
};

/// Receives what an analysis produced. Implemented by the embedding host.
pub trait MeasurePublisher {
    /// Store one measure. `resource` is `None` for module-level measures.
    fn publish(&mut self, module: &str, resource: Option<&str>, measure: Measure);

    /// Told when the analysis of `module` failed. Nothing was published for
    /// it.
    fn analysis_failed(&mut self, _module: &str, _error: &SensorError) {}
}

/// Publish every measure of `set`: module level first, then each resource.
pub fn publish_set(
    publisher: &mut (dyn MeasurePublisher + Send),
    module: &str,
    set: &MeasureSet,
) {
    for measure in set.measures() {
        publisher.publish(module, None, measure);
    }
    for (resource, _) in set.resources() {
        for measure in set.resource_measures(resource) {
            publisher.publish(module, Some(resource), measure);
        }
    }
}

/// A measure as it was handed to a [RecordingPublisher].
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub module: String,
    pub resource: Option<String>,
    pub measure: Measure,
}

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    pub measures: Vec<Published>,
    /// Module name and rendered error of each failed analysis.
    pub failures: Vec<(String, String)>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Module-level measures recorded for `module`.
    pub fn module_measures<'a>(
        &'a self,
        module: &'a str,
    ) -> impl Iterator<Item = &'a Measure> + 'a {
        self.measures
            .iter()
            .filter(move |p| p.module == module && p.resource.is_none())
            .map(|p| &p.measure)
    }
}

impl MeasurePublisher for RecordingPublisher {
    fn publish(&mut self, module: &str, resource: Option<&str>, measure: Measure) {
        self.measures.push(Published {
            module: module.to_string(),
            resource: resource.map(String::from),
            measure,
        });
    }

    fn analysis_failed(&mut self, module: &str, error: &SensorError) {
        self.failures.push((module.to_string(), error.to_string()));
    }
}
