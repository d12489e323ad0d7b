//! Simulation orchestration: wires the workload runner and resource sampler
//! together for one run.

pub mod simulation;
pub mod telemetry;

pub use simulation::Simulation;
