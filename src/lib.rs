//! gallio-sensor runs the [Gallio] test runner for each module of a
//! project, reads the XML report it writes, and turns the results into
//! unit-test measures for a code-quality host.
//!
//! ## Pipeline
//!
//! For every module the [sensor::GallioSensor] goes through the same steps:
//!   - Resolve the module's settings into a [config::RunConfiguration].
//!     Broken settings fail the module before anything is launched.
//!   - Depending on the mode, launch the runner ([executor::Runner]) or
//!     locate an existing report ([report::locator]).
//!   - Parse the report ([report::parser]) and fold it into a
//!     [measures::MeasureSet].
//!   - Hand the measures to a [publish::MeasurePublisher].
//!
//! A module that fails is reported to the publisher and logged; the other
//! modules are still analysed.
//!
//! ## Configuration
//! Settings are read from a `gallio.toml` file in the configuration
//! directory. A `[gallio]` table holds settings shared by all modules and
//! each `[[modules]]` entry can override them.
//! ```toml
//! [gallio]
//! # Gallio installation. Defaults to C:/Program Files/Gallio on Windows.
//! installFolder = "/opt/gallio"
//! # (Optional) Program used to start Gallio.Echo.exe.
//! launcher = "mono"
//! # (Optional) Minutes before the runner is killed. Defaults to 30.
//! timeoutMinutes = 10
//!
//! [[modules]]
//! name = "Core"
//! dir = "src/Core"
//! testAssemblies = [ "bin/Debug/*.Tests.dll" ]
//! # (Optional) Only run tests of the unit category.
//! filter = "Category:unit"
//! ```
//!
//! ## Modes
//! The `mode` setting selects what happens for a module:
//!   - empty (or `run`): launch the runner and parse the report it writes.
//!     A report is parsed even when the runner exits non-zero or is killed
//!     at the timeout.
//!   - `skip`: do nothing. No measures are published.
//!   - `reuseReport`: parse the report(s) matching `reportsPath` instead of
//!     launching anything.
//!
//! ## Running
//! ```bash
//! gallio-sensor path/to/conf -i '^Core' -v
//! ```
//! The `--include` and `--exclude` flags select modules by name, `--dry-run`
//! prints the runner command of every module and `--measures` prints what
//! was published.
//!
//! [Gallio]: https://github.com/Gallio/mbunit-v3
pub mod cli;
pub mod config;
pub mod errors;
pub mod executor;
pub mod logging;
pub mod measures;
pub mod picker;
pub mod printer;
pub mod publish;
pub mod report;
pub mod sensor;
