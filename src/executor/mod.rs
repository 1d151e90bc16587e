//! The executor launches the external test runner and hands back what it
//! produced.

pub mod abort;
mod lock;
mod runner;

pub use abort::{AbortHandle, AbortSignal};
pub use lock::ReportLock;
pub use runner::{ExecutionResult, Runner, Termination};
