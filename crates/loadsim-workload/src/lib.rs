//! Workload execution: parameter generation and the concurrent query runner.

pub mod params;
pub mod runner;

pub use params::{ParamGenerator, Resolved};
pub use runner::WorkloadRunner;
