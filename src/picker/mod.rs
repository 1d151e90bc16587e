//! Pickers decide which modules get analysed and with which settings.

pub mod toml;
