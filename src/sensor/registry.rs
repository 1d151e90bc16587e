use super::{Analysis, Module, Sensor};
use crate::{measures::Metric, publish::MeasurePublisher};
use tracing::{info, info_span, Instrument};

/// The sensors an embedding application registered at startup.
#[derive(Default)]
pub struct Registry {
    sensors: Vec<Box<dyn Sensor>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: Sensor + 'static>(&mut self, sensor: S) -> &mut Self {
        info!(sensor = sensor.name(), "sensor registered");
        self.sensors.push(Box::new(sensor));
        self
    }

    /// Every metric declared by a registered sensor, once each.
    pub fn metrics(&self) -> Vec<Metric> {
        let mut metrics: Vec<Metric> = self
            .sensors
            .iter()
            .flat_map(|s| s.metrics().iter().copied())
            .collect();
        metrics.sort();
        metrics.dedup();
        metrics
    }

    /// Run every sensor on every module, one at a time. A failed analysis
    /// never stops the remaining ones.
    pub async fn analyze(
        &self,
        modules: &[Module],
        publisher: &mut (dyn MeasurePublisher + Send),
    ) -> Vec<Analysis> {
        let mut analyses = Vec::with_capacity(modules.len() * self.sensors.len());
        for module in modules {
            for sensor in &self.sensors {
                let span = info_span!("analysis", module = %module.name, sensor = sensor.name());
                let analysis = sensor.analyze(module, &mut *publisher).instrument(span).await;
                analyses.push(analysis);
            }
        }
        let failed = analyses.iter().filter(|a| a.is_failed()).count();
        info!(analyses = analyses.len(), failed, "analysis finished");
        analyses
    }
}
