//! Run configuration for one analysis pass.
//!
//! Settings arrive either as host key/value pairs or from a `gallio.toml`
//! file (see [crate::picker::toml]). Both are collected into a
//! [SettingsLayer], layers are merged (module over global) and the result is
//! resolved into a validated [RunConfiguration].
use crate::errors::SensorError;
use serde::Deserialize;
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use tracing::debug;

/// Default timeout for the runner, in minutes.
pub const DEFAULT_TIMEOUT_MINUTES: u64 = 30;
/// Default runner executable, relative to the install folder.
pub const DEFAULT_EXECUTABLE: &str = "bin/Gallio.Echo.exe";
/// Default directory receiving generated reports, relative to the module.
pub const DEFAULT_WORK_DIR: &str = ".gallio";
/// File stem of the generated report.
pub const DEFAULT_REPORT_NAME: &str = "gallio-report";
/// Default Gallio runner type.
pub const DEFAULT_RUNNER: &str = "IsolatedAppDomain";

#[cfg(windows)]
pub const DEFAULT_INSTALL_FOLDER: &str = "C:/Program Files/Gallio";
#[cfg(not(windows))]
pub const DEFAULT_INSTALL_FOLDER: &str = "/opt/gallio";

/// Activation mode of the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Launch the runner and parse the report it writes.
    Run,
    /// Do nothing for this module.
    Skip,
    /// Parse an existing report instead of launching the runner.
    ReuseReport,
}

impl FromStr for Mode {
    type Err = SensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "run" => Ok(Mode::Run),
            "skip" => Ok(Mode::Skip),
            "reuseReport" => Ok(Mode::ReuseReport),
            other => Err(SensorError::ConfigurationInvalid(format!(
                "unknown mode `{}`, must be one of \"\", skip, reuseReport",
                other
            ))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Run => write!(f, "run"),
            Mode::Skip => write!(f, "skip"),
            Mode::ReuseReport => write!(f, "reuseReport"),
        }
    }
}

/// A partial set of settings. Every field is optional so layers can be
/// stacked: host defaults, global `[gallio]` table, per-module overrides.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SettingsLayer {
    pub install_folder: Option<PathBuf>,
    pub executable: Option<PathBuf>,
    pub launcher: Option<String>,
    pub filter: Option<String>,
    pub timeout_minutes: Option<u64>,
    pub mode: Option<String>,
    pub reports_path: Option<String>,
    pub work_dir: Option<PathBuf>,
    pub test_assemblies: Option<Vec<String>>,
    pub runner: Option<String>,
}

impl SettingsLayer {
    /// Build a layer from host key/value settings. Unknown keys are ignored.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, SensorError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut layer = SettingsLayer::default();
        for (key, value) in pairs {
            match key {
                "installFolder" => layer.install_folder = Some(value.into()),
                "executable" => layer.executable = Some(value.into()),
                "launcher" => layer.launcher = Some(value.to_string()),
                "filter" => layer.filter = Some(value.to_string()),
                "timeoutMinutes" => {
                    let minutes = value.trim().parse().map_err(|_| {
                        SensorError::ConfigurationInvalid(format!(
                            "timeoutMinutes must be a positive integer, got `{}`",
                            value
                        ))
                    })?;
                    layer.timeout_minutes = Some(minutes);
                }
                "mode" => layer.mode = Some(value.to_string()),
                "reportsPath" => layer.reports_path = Some(value.to_string()),
                "workDir" => layer.work_dir = Some(value.into()),
                "testAssemblies" => {
                    layer.test_assemblies = Some(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|p| !p.is_empty())
                            .map(String::from)
                            .collect(),
                    )
                }
                "runner" => layer.runner = Some(value.to_string()),
                _ => debug!(key, "ignoring unknown setting"),
            }
        }
        Ok(layer)
    }

    /// Stack `over` on top of `self`: values set in `over` win.
    pub fn merge(&self, over: &SettingsLayer) -> SettingsLayer {
        SettingsLayer {
            install_folder: over
                .install_folder
                .clone()
                .or_else(|| self.install_folder.clone()),
            executable: over.executable.clone().or_else(|| self.executable.clone()),
            launcher: over.launcher.clone().or_else(|| self.launcher.clone()),
            filter: over.filter.clone().or_else(|| self.filter.clone()),
            timeout_minutes: over.timeout_minutes.or(self.timeout_minutes),
            mode: over.mode.clone().or_else(|| self.mode.clone()),
            reports_path: over
                .reports_path
                .clone()
                .or_else(|| self.reports_path.clone()),
            work_dir: over.work_dir.clone().or_else(|| self.work_dir.clone()),
            test_assemblies: over
                .test_assemblies
                .clone()
                .or_else(|| self.test_assemblies.clone()),
            runner: over.runner.clone().or_else(|| self.runner.clone()),
        }
    }
}

/// Validated configuration for one analysis pass. Built once, then only
/// read.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfiguration {
    pub install_folder: PathBuf,
    /// Runner executable, relative to `install_folder` unless absolute.
    pub executable: PathBuf,
    /// Program the executable is started through (e.g. `mono`).
    pub launcher: Option<String>,
    /// Test selection expression. `None` runs every test.
    pub filter: Option<String>,
    pub timeout: Duration,
    pub mode: Mode,
    /// Report file in run mode, report pattern in reuse mode.
    pub reports_path: Option<String>,
    pub work_dir: PathBuf,
    /// Directory of the analysed module. Relative paths resolve against it.
    pub base_dir: PathBuf,
    pub test_assemblies: Vec<String>,
    pub runner: String,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            install_folder: PathBuf::from(DEFAULT_INSTALL_FOLDER),
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            launcher: None,
            filter: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_MINUTES * 60),
            mode: Mode::Run,
            reports_path: None,
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            base_dir: PathBuf::from("."),
            test_assemblies: Vec::new(),
            runner: DEFAULT_RUNNER.to_string(),
        }
    }
}

impl RunConfiguration {
    /// Resolve a merged settings layer for the module rooted at `base_dir`.
    /// Fails fast with [SensorError::ConfigurationInvalid].
    pub fn resolve(
        layer: &SettingsLayer,
        base_dir: &Path,
    ) -> Result<Self, SensorError> {
        let mode = layer.mode.as_deref().unwrap_or("").parse::<Mode>()?;
        let timeout = match layer.timeout_minutes {
            Some(minutes) => match minutes.checked_mul(60) {
                Some(secs) => Duration::from_secs(secs),
                // Only a run waits on the timeout.
                None if mode != Mode::Run => Duration::MAX,
                None => {
                    return Err(SensorError::ConfigurationInvalid(format!(
                        "timeoutMinutes `{}` is too large",
                        minutes
                    )))
                }
            },
            None => Duration::from_secs(DEFAULT_TIMEOUT_MINUTES * 60),
        };
        let defaults = RunConfiguration::default();

        let conf = RunConfiguration {
            install_folder: layer
                .install_folder
                .clone()
                .unwrap_or(defaults.install_folder),
            executable: layer.executable.clone().unwrap_or(defaults.executable),
            launcher: layer
                .launcher
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from),
            filter: layer.filter.as_deref().and_then(normalize_filter),
            timeout,
            mode,
            reports_path: layer
                .reports_path
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from),
            work_dir: layer.work_dir.clone().unwrap_or(defaults.work_dir),
            base_dir: base_dir.to_path_buf(),
            test_assemblies: layer.test_assemblies.clone().unwrap_or_default(),
            runner: layer.runner.clone().unwrap_or(defaults.runner),
        };
        conf.validate()?;
        Ok(conf)
    }

    /// Check the invariants the current mode depends on. Skip mode needs
    /// nothing.
    pub fn validate(&self) -> Result<(), SensorError> {
        match self.mode {
            Mode::Skip => Ok(()),
            Mode::ReuseReport => {
                if self.reports_path.is_none() {
                    return Err(SensorError::ConfigurationInvalid(
                        "reportsPath is required in reuseReport mode".to_string(),
                    ));
                }
                Ok(())
            }
            Mode::Run => {
                if self.timeout.is_zero() {
                    return Err(SensorError::ConfigurationInvalid(
                        "timeoutMinutes must be a positive integer, got `0`".to_string(),
                    ));
                }
                if !self.install_folder.is_dir() {
                    return Err(SensorError::ConfigurationInvalid(format!(
                        "install folder {} does not exist",
                        self.install_folder.display()
                    )));
                }
                let exe = self.executable_path();
                if !exe.is_file() {
                    return Err(SensorError::ConfigurationInvalid(format!(
                        "runner executable {} does not exist",
                        exe.display()
                    )));
                }
                Ok(())
            }
        }
    }

    /// Absolute location of the runner executable.
    pub fn executable_path(&self) -> PathBuf {
        self.install_folder.join(&self.executable)
    }

    /// Resolve `path` against the module directory.
    pub fn in_module(&self, path: impl AsRef<Path>) -> PathBuf {
        self.base_dir.join(path)
    }

    /// Where the runner is asked to write its report in run mode.
    pub fn report_target(&self) -> PathBuf {
        match &self.reports_path {
            Some(path) => {
                let path = self.in_module(path);
                if path.extension().is_some() {
                    path
                } else {
                    path.with_extension("xml")
                }
            }
            None => self
                .in_module(&self.work_dir)
                .join(DEFAULT_REPORT_NAME)
                .with_extension("xml"),
        }
    }
}

/// Blank filters mean no filtering. Anything else goes to Gallio as written;
/// it reports bad filter syntax itself.
fn normalize_filter(raw: &str) -> Option<String> {
    let filter = raw.trim();
    if filter.is_empty() {
        return None;
    }
    Some(filter.to_string())
}

#[cfg(test)]
mod tests {
    use super::normalize_filter;

    #[test]
    fn category_filter_is_kept() {
        assert_eq!(
            normalize_filter(" Category:unit "),
            Some("Category:unit".to_string())
        );
    }

    #[test]
    fn compound_filters_are_kept() {
        let f = "Category:unit and not Type:SlowTests";
        assert_eq!(normalize_filter(f), Some(f.to_string()));
        let f = "(Category:unit or Category:fast)";
        assert_eq!(normalize_filter(f), Some(f.to_string()));
    }

    #[test]
    fn gallio_filter_forms_pass_through() {
        for f in &[
            r#"Name:"Adds two numbers""#,
            "Category:unit exclude Category:slow",
            "*",
            "Type:/Acme\\..*Tests/",
            "Namespace:'Acme.Core' and not Category:slow",
        ] {
            assert_eq!(normalize_filter(f), Some(f.to_string()));
        }
    }

    #[test]
    fn blank_filters_mean_no_filtering() {
        assert_eq!(normalize_filter(""), None);
        assert_eq!(normalize_filter("   "), None);
        assert_eq!(normalize_filter("\t\n"), None);
    }
}
