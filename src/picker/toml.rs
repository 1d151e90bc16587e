//! The default picker: gathers the modules to analyse from a `gallio.toml`
//! file.
//!
//! ```toml
//! ver = "0.3.0"
//!
//! [gallio]
//! installFolder = "/opt/gallio"
//! launcher = "mono"
//! timeoutMinutes = 10
//!
//! [[modules]]
//! name = "Core"
//! dir = "src/Core"
//! testAssemblies = ["bin/Debug/*.Tests.dll"]
//! filter = "Category:unit"
//!
//! [[modules]]
//! name = "Legacy"
//! mode = "reuseReport"
//! reportsPath = "reports/gallio-*.xml"
//! ```
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{config::SettingsLayer, errors::SensorError, sensor::Module};

/// Name of the configuration file looked up in the configuration directory.
pub const CONFIG_FILE: &str = "gallio.toml";

/// Contents of a `gallio.toml` file.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Version of the tool this configuration is compatible with.
    pub ver: Option<String>,
    /// Settings shared by every module.
    #[serde(default)]
    pub gallio: SettingsLayer,
    /// Modules to analyse.
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
}

/// One `[[modules]]` entry.
#[derive(Debug, Deserialize)]
pub struct ModuleConfig {
    pub name: String,
    /// Module directory, relative to the configuration directory.
    pub dir: Option<PathBuf>,
    /// Per-module overrides of the global settings.
    #[serde(flatten)]
    pub settings: SettingsLayer,
}

impl Config {
    /// Read `gallio.toml` from `conf_dir`. When it names a version, it must
    /// match the running tool.
    pub fn from_path(conf_dir: &Path) -> Result<Self, SensorError> {
        let conf_path = conf_dir.join(CONFIG_FILE);
        let contents = std::fs::read_to_string(&conf_path).map_err(|_| {
            SensorError::ConfigurationInvalid(format!(
                "{} is missing. Expected a directory with a {} file.",
                conf_path.display(),
                CONFIG_FILE
            ))
        })?;

        let conf: Config = toml::from_str(&contents).map_err(|err| {
            SensorError::ConfigurationInvalid(format!(
                "Failed to parse {}: {}",
                conf_path.display(),
                err
            ))
        })?;

        if let Some(ver) = &conf.ver {
            if env!("CARGO_PKG_VERSION") != ver {
                return Err(SensorError::ConfigurationInvalid(format!(
                    "Version mismatch. Configuration requires: {}, tool version: {}.",
                    ver,
                    env!("CARGO_PKG_VERSION")
                )));
            }
        }
        Ok(conf)
    }

    pub fn parse(contents: &str) -> Result<Self, SensorError> {
        Ok(toml::from_str(contents)?)
    }

    /// Modules with their settings merged over the global ones and their
    /// directories resolved against `conf_dir`. A file without modules
    /// yields a single `default` module rooted at `conf_dir`.
    pub fn into_modules(self, conf_dir: &Path) -> Vec<Module> {
        let Config { gallio, modules, .. } = self;
        if modules.is_empty() {
            return vec![Module::new("default", conf_dir, gallio)];
        }
        modules
            .into_iter()
            .map(|m| {
                let base_dir = match &m.dir {
                    Some(dir) => conf_dir.join(dir),
                    None => conf_dir.to_path_buf(),
                };
                Module::new(m.name, base_dir, gallio.merge(&m.settings))
            })
            .collect()
    }
}
