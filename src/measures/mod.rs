//! Measures contributed to the host: the declared metrics and the mapping
//! from a parsed report to values.

mod mapper;
pub mod metrics;

pub use mapper::{Counts, MeasureSet, TestDetail, UNASSIGNED_RESOURCE};
pub use metrics::{Measure, Metric, Value};
