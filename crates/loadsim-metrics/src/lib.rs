//! Append-only metric recording for simulation runs.

pub mod sink;

pub use sink::MetricSink;
