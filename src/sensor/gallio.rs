use super::{Analysis, Module, Outcome, Sensor, State};
use crate::{
    config::{Mode, RunConfiguration},
    errors::SensorError,
    executor::{AbortSignal, ReportLock, Runner, Termination},
    measures::{MeasureSet, Metric},
    publish::{self, MeasurePublisher},
    report::{locator, parser, TestReport},
};
use futures::future::BoxFuture;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};
use tokio::fs;
use tracing::{error, info, warn};

/// Runs Gallio (or reuses its report) and publishes unit-test measures.
#[derive(Debug, Default)]
pub struct GallioSensor {
    abort: AbortSignal,
    in_flight: AtomicBool,
}

/// Marks the runner as in flight until dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn enter(flag: &'a AtomicBool) -> Result<Self, SensorError> {
        if flag.swap(true, Ordering::AcqRel) {
            return Err(SensorError::AlreadyRunning);
        }
        Ok(InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Book-keeping of one pass: the state trace and where results go.
struct Pass<'p> {
    module: &'p str,
    trace: Vec<State>,
    publisher: &'p mut (dyn MeasurePublisher + Send),
}

impl<'p> Pass<'p> {
    fn new(module: &'p str, publisher: &'p mut (dyn MeasurePublisher + Send)) -> Self {
        Self {
            module,
            trace: vec![State::Idle],
            publisher,
        }
    }

    fn enter(&mut self, state: State) {
        self.trace.push(state);
    }

    fn finish(self, outcome: Outcome) -> Analysis {
        Analysis {
            module: self.module.to_string(),
            trace: self.trace,
            outcome,
        }
    }

    fn skipped(mut self) -> Analysis {
        info!(module = self.module, "gallio analysis skipped");
        self.enter(State::Skipped);
        self.finish(Outcome::Skipped)
    }

    fn published(mut self, measures: MeasureSet, warning: Option<String>) -> Analysis {
        publish::publish_set(&mut *self.publisher, self.module, &measures);
        info!(
            module = self.module,
            tests = measures.total(),
            failures = measures.failures(),
            errors = measures.errors(),
            skipped = measures.skipped(),
            "gallio measures published"
        );
        self.enter(State::Published);
        self.finish(Outcome::Published { measures, warning })
    }

    fn failed(
        mut self,
        err: SensorError,
        conf: Option<&RunConfiguration>,
        report: Option<&Path>,
    ) -> Analysis {
        error!(
            module = self.module,
            error = %err,
            config = ?conf,
            report = ?report,
            "gallio analysis failed"
        );
        self.publisher.analysis_failed(self.module, &err);
        self.enter(State::Failed);
        self.finish(Outcome::Failed(err))
    }
}

impl GallioSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sensor whose in-flight runner is killed when `abort` fires.
    pub fn with_abort(abort: AbortSignal) -> Self {
        Self {
            abort,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Resolve the module's settings and analyse it.
    pub async fn analyze_module(
        &self,
        module: &Module,
        publisher: &mut (dyn MeasurePublisher + Send),
    ) -> Analysis {
        match RunConfiguration::resolve(&module.settings, &module.base_dir) {
            Ok(conf) => self.analyze_with(&module.name, &conf, publisher).await,
            Err(err) => Pass::new(&module.name, publisher).failed(err, None, None),
        }
    }

    /// Analyse `module` with an already built configuration.
    pub async fn analyze_with(
        &self,
        module: &str,
        conf: &RunConfiguration,
        publisher: &mut (dyn MeasurePublisher + Send),
    ) -> Analysis {
        let mut pass = Pass::new(module, publisher);
        if let Err(err) = conf.validate() {
            return pass.failed(err, Some(conf), None);
        }

        let reports = match conf.mode {
            Mode::Skip => return pass.skipped(),
            Mode::ReuseReport => {
                pass.enter(State::Parsing);
                match locator::reuse_reports(conf) {
                    Ok(reports) => reports,
                    Err(err) => return pass.failed(err, Some(conf), None),
                }
            }
            Mode::Run => {
                pass.enter(State::Running);
                match self.run(conf).await {
                    Ok(report) => {
                        pass.enter(State::Parsing);
                        vec![report]
                    }
                    Err(err) => {
                        let target = conf.report_target();
                        return pass.failed(err, Some(conf), Some(target.as_path()));
                    }
                }
            }
        };

        match ingest(&reports).await {
            Ok((measures, warning)) => pass.published(measures, warning),
            Err((err, report)) => pass.failed(err, Some(conf), Some(report.as_path())),
        }
    }

    /// Launch the runner and return the report it left behind.
    async fn run(&self, conf: &RunConfiguration) -> Result<PathBuf, SensorError> {
        let _in_flight = InFlight::enter(&self.in_flight)?;
        if self.abort.is_aborted() {
            return Err(SensorError::Cancelled);
        }
        let report = conf.report_target();
        let _lock = ReportLock::acquire(&report)?;

        let exec = Runner::new(conf)
            .execute(&report, self.abort.clone())
            .await?;
        match &exec.report {
            Some(path) => {
                if exec.termination != Termination::Exited {
                    warn!(
                        termination = ?exec.termination,
                        report = %path.display(),
                        "runner was stopped early, parsing the partial report"
                    );
                } else if exec.exit_code != Some(0) {
                    info!(
                        exit_code = ?exec.exit_code,
                        "runner exited with failures, parsing its report"
                    );
                }
                Ok(path.clone())
            }
            None => Err(exec.failure(conf.timeout, &report)),
        }
    }
}

/// Parse and map every report. On failure, returns the error together with
/// the report it concerns.
async fn ingest(
    reports: &[PathBuf],
) -> Result<(MeasureSet, Option<String>), (SensorError, PathBuf)> {
    let mut combined = TestReport::default();
    let mut warnings = Vec::new();

    for path in reports {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err((SensorError::ReportNotFound(path.clone()), path.clone()))
            }
            Err(err) => return Err((err.into(), path.clone())),
        };
        match parser::parse(&bytes) {
            Ok(report) => combined.extend(report),
            Err(failure) if !failure.recovered.is_empty() => {
                warn!(
                    report = %path.display(),
                    error = %failure.error,
                    recovered = failure.recovered.len(),
                    "report is damaged, using the test cases read before the fault"
                );
                warnings.push(format!("{}: {}", path.display(), failure.error));
                combined.extend(failure.recovered);
            }
            Err(failure) => return Err((failure.error, path.clone())),
        }
    }

    let report_of_last = || reports.last().cloned().unwrap_or_default();
    let measures = MeasureSet::from_report(&combined).map_err(|err| (err, report_of_last()))?;
    let warning = if warnings.is_empty() {
        None
    } else {
        Some(warnings.join("; "))
    };
    Ok((measures, warning))
}

impl Sensor for GallioSensor {
    fn name(&self) -> &str {
        "Gallio"
    }

    fn metrics(&self) -> &[Metric] {
        &Metric::ALL
    }

    fn analyze<'a>(
        &'a self,
        module: &'a Module,
        publisher: &'a mut (dyn MeasurePublisher + Send),
    ) -> BoxFuture<'a, Analysis> {
        Box::pin(self.analyze_module(module, publisher))
    }
}
