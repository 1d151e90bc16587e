use super::abort::AbortSignal;
use crate::{config::RunConfiguration, errors::SensorError};
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
    time::{Duration, Instant},
};
use tokio::{
    fs,
    io::{AsyncRead, AsyncReadExt},
    process::Command,
    time,
};
use tracing::{debug, info, warn};

/// How long to wait for the output pipes to close once the runner is gone.
/// A grandchild can keep them open after the runner itself was killed.
const OUTPUT_GRACE: Duration = Duration::from_secs(5);

/// Why the runner stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The process ended on its own.
    Exited,
    /// The deadline passed and the process was killed.
    TimedOut,
    /// The host aborted and the process was killed.
    Aborted,
}

/// Outcome of one runner invocation.
#[derive(Debug)]
pub struct ExecutionResult {
    pub termination: Termination,
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
    /// Report written by the run, if any. The file is authoritative,
    /// the exit code is not.
    pub report: Option<PathBuf>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    /// The error describing this run when it left no report behind.
    pub fn failure(&self, timeout: Duration, expected: &Path) -> SensorError {
        match self.termination {
            Termination::TimedOut => SensorError::Timeout(timeout),
            Termination::Aborted => SensorError::Cancelled,
            Termination::Exited => SensorError::ExecutionFailed {
                code: self.exit_code,
                detail: format!("no report written to {}", expected.display()),
            },
        }
    }
}

/// Launches the Gallio runner for one configuration.
pub struct Runner<'a> {
    conf: &'a RunConfiguration,
}

impl<'a> Runner<'a> {
    pub fn new(conf: &'a RunConfiguration) -> Self {
        Self { conf }
    }

    /// Assemblies matching the configured patterns, in a stable order.
    pub fn assemblies(&self) -> Result<Vec<PathBuf>, SensorError> {
        let mut all = Vec::new();
        for pattern in &self.conf.test_assemblies {
            let full = self.conf.in_module(pattern);
            let matches = glob::glob(&full.to_string_lossy())?
                .filter_map(|entry| match entry {
                    Ok(path) => Some(path),
                    Err(err) => {
                        warn!(%err, "unreadable path while matching assemblies");
                        None
                    }
                })
                .collect::<Vec<_>>();
            if matches.is_empty() {
                warn!(pattern = %pattern, "no test assembly matches pattern");
            }
            all.extend(matches);
        }
        all.sort();
        all.dedup();
        Ok(all)
    }

    /// The program and arguments of the run, with the report written to
    /// `report`.
    pub fn command_line(
        &self,
        report: &Path,
    ) -> Result<(OsString, Vec<OsString>), SensorError> {
        let exe = self.conf.executable_path();
        let mut args: Vec<OsString> = Vec::new();
        let program = match &self.conf.launcher {
            Some(launcher) => {
                args.push(exe.into_os_string());
                OsString::from(launcher)
            }
            None => exe.into_os_string(),
        };

        let dir = report.parent().unwrap_or_else(|| Path::new("."));
        let stem = report
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| crate::config::DEFAULT_REPORT_NAME.to_string());
        args.push(format!("/report-directory:{}", dir.display()).into());
        args.push(format!("/report-name-format:{}", stem).into());
        args.push("/report-type:Xml".into());
        args.push(format!("/runner:{}", self.conf.runner).into());
        if let Some(filter) = &self.conf.filter {
            args.push(format!("/filter:{}", filter).into());
        }
        args.extend(self.assemblies()?.into_iter().map(PathBuf::into_os_string));
        Ok((program, args))
    }

    /// Run the tests, writing the report to `report`. Blocks until the
    /// process exits, the timeout expires or `abort` fires; in the last two
    /// cases the process is killed and reaped before returning.
    pub async fn execute(
        &self,
        report: &Path,
        mut abort: AbortSignal,
    ) -> Result<ExecutionResult, SensorError> {
        if let Some(dir) = report.parent() {
            fs::create_dir_all(dir).await?;
        }
        // Never mistake a previous run's report for this one.
        match fs::remove_file(report).await {
            Ok(()) => debug!(report = %report.display(), "removed stale report"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => (),
            Err(err) => return Err(err.into()),
        }

        let (program, args) = self.command_line(report)?;
        info!(
            program = %program.to_string_lossy(),
            args = ?args,
            timeout_secs = self.conf.timeout.as_secs(),
            "launching test runner"
        );

        let mut cmd = Command::new(&program);
        cmd.args(&args)
            .current_dir(&self.conf.base_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|err| SensorError::ExecutionFailed {
            code: None,
            detail: format!(
                "failed to launch {}: {}",
                program.to_string_lossy(),
                err
            ),
        })?;

        let mut output = tokio::spawn(futures::future::join(
            drain(child.stdout.take()),
            drain(child.stderr.take()),
        ));

        enum Stop {
            Exited(std::io::Result<std::process::ExitStatus>),
            Deadline,
            Abort,
        }

        let stop = tokio::select! {
            status = child.wait() => Stop::Exited(status),
            _ = time::sleep(self.conf.timeout) => Stop::Deadline,
            _ = abort.aborted() => Stop::Abort,
        };

        let (termination, exit_code) = match stop {
            Stop::Exited(status) => (Termination::Exited, status?.code()),
            Stop::Deadline => {
                warn!(
                    timeout_secs = self.conf.timeout.as_secs(),
                    "test runner timed out, killing it"
                );
                child.kill().await?;
                (Termination::TimedOut, None)
            }
            Stop::Abort => {
                warn!("analysis aborted, killing test runner");
                child.kill().await?;
                (Termination::Aborted, None)
            }
        };
        let elapsed = start.elapsed();

        let (stdout, stderr) =
            match time::timeout(OUTPUT_GRACE, &mut output).await {
                Ok(Ok(pair)) => pair,
                Ok(Err(err)) => {
                    warn!(%err, "collecting runner output failed");
                    (String::new(), String::new())
                }
                Err(_) => {
                    warn!("runner output still open after exit, dropping it");
                    output.abort();
                    (String::new(), String::new())
                }
            };
        debug!(%stdout, %stderr, "runner output");

        let produced = fs::metadata(report)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        info!(
            ?termination,
            ?exit_code,
            elapsed_ms = elapsed.as_millis() as u64,
            report_written = produced,
            "test runner finished"
        );

        Ok(ExecutionResult {
            termination,
            exit_code,
            elapsed,
            report: if produced {
                Some(report.to_path_buf())
            } else {
                None
            },
            stdout,
            stderr,
        })
    }
}

/// Read a pipe to the end. Output is diagnostic only, so decoding is lossy.
async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(err) = pipe.read_to_end(&mut buf).await {
            debug!(%err, "runner pipe closed with error");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
