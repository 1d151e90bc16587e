use crate::{config::Mode, config::SettingsLayer, errors::SensorError, sensor::Module};
use regex::Regex;
use std::path::PathBuf;
use structopt::StructOpt;

/// Options for the CLI.
#[derive(StructOpt, Debug)]
#[structopt(
    name = "gallio-sensor",
    about = "Run Gallio and publish unit-test measures."
)]
pub struct Opts {
    /// Directory containing the gallio.toml file.
    #[structopt(name = "CONF_DIR", parse(from_os_str))]
    pub dir: PathBuf,

    /// Only analyse modules whose name matches this regex.
    #[structopt(short, long = "include")]
    pub include_filter: Option<String>,

    /// Skip modules whose name matches this regex.
    #[structopt(short, long = "exclude")]
    pub exclude_filter: Option<String>,

    /// Override the activation mode of every module: run, skip or reuseReport.
    #[structopt(short, long)]
    pub mode: Option<Mode>,

    /// Override the test filter of every module (e.g. Category:unit).
    #[structopt(short, long)]
    pub filter: Option<String>,

    /// Print the runner command of each module instead of running it.
    #[structopt(short = "n", long)]
    pub dry_run: bool,

    /// Print every published measure.
    #[structopt(long)]
    pub measures: bool,

    /// More logging. Repeat for more detail. RUST_LOG takes precedence.
    #[structopt(short, long, parse(from_occurrences))]
    pub verbose: u8,
}

impl Opts {
    /// Settings given on the command line. They win over the file.
    pub fn overrides(&self) -> SettingsLayer {
        SettingsLayer {
            mode: self.mode.map(|m| m.to_string()),
            filter: self.filter.clone(),
            ..SettingsLayer::default()
        }
    }

    /// Apply the include/exclude regexes to module names, then the
    /// command-line overrides to the remaining modules.
    pub fn select(&self, modules: Vec<Module>) -> Result<Vec<Module>, SensorError> {
        let include = self.include_filter.as_deref().map(Regex::new).transpose()?;
        let exclude = self.exclude_filter.as_deref().map(Regex::new).transpose()?;
        let overrides = self.overrides();

        Ok(modules
            .into_iter()
            .filter(|m| {
                include.as_ref().map_or(true, |inc| inc.is_match(&m.name))
                    && !exclude.as_ref().map_or(false, |ex| ex.is_match(&m.name))
            })
            .map(|mut m| {
                m.settings = m.settings.merge(&overrides);
                m
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(args: &[&str]) -> Opts {
        let mut full = vec!["gallio-sensor", "conf"];
        full.extend_from_slice(args);
        Opts::from_iter(full)
    }

    fn modules() -> Vec<Module> {
        ["Core", "Core.Web", "Legacy"]
            .iter()
            .map(|name| Module::new(*name, ".", SettingsLayer::default()))
            .collect()
    }

    fn names(modules: &[Module]) -> Vec<&str> {
        modules.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn include_and_exclude_select_modules() {
        let selected = opts(&["-i", "^Core", "-e", "Web"]).select(modules()).unwrap();
        assert_eq!(names(&selected), vec!["Core"]);

        let selected = opts(&[]).select(modules()).unwrap();
        assert_eq!(names(&selected), vec!["Core", "Core.Web", "Legacy"]);
    }

    #[test]
    fn overrides_reach_every_module() {
        let selected = opts(&["--mode", "skip", "-f", "Category:unit"])
            .select(modules())
            .unwrap();
        assert!(selected.iter().all(|m| {
            m.settings.mode.as_deref() == Some("skip")
                && m.settings.filter.as_deref() == Some("Category:unit")
        }));
    }

    #[test]
    fn bad_regex_is_a_configuration_error() {
        let err = opts(&["-i", "("]).select(modules()).unwrap_err();
        assert!(matches!(err, SensorError::ConfigurationInvalid(_)));
    }
}
