use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{SimError, SimResult};

/// Host-level metric kinds the sampler can collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostMetric {
    /// Overall CPU utilization percentage.
    CpuPercent,
    /// Memory utilization percentage.
    MemoryPercent,
    /// Cumulative disk read/write byte counters.
    DiskIo,
}

/// One database metric: a monitoring query issued on its own cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbMetricSpec {
    /// Metric name, tagged onto every emitted record.
    pub name: String,
    /// Monitoring query text.
    pub query: String,
    /// Minimum seconds between dispatches of this metric's query.
    #[serde(default = "default_frequency_secs")]
    pub frequency_secs: f64,
}

fn default_frequency_secs() -> f64 {
    60.0
}

impl DbMetricSpec {
    /// Dispatch frequency as a `Duration`.
    #[must_use]
    pub fn frequency(&self) -> Duration {
        Duration::from_secs_f64(self.frequency_secs)
    }
}

/// Monitoring configuration: which host metrics to sample, which database
/// metric queries to issue, and the base sampling interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSpec {
    /// Host metrics to sample each base-interval tick.
    #[serde(default)]
    pub host_metrics: Vec<HostMetric>,
    /// Database metric queries, each on its own frequency.
    #[serde(default)]
    pub db_metrics: Vec<DbMetricSpec>,
    /// Base sampling interval in seconds for the host loop.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: f64,
}

fn default_interval_secs() -> f64 {
    5.0
}

impl Default for MonitoringSpec {
    fn default() -> Self {
        Self {
            host_metrics: Vec::new(),
            db_metrics: Vec::new(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl MonitoringSpec {
    /// Base sampling interval as a `Duration`.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs)
    }

    /// Validates invariants: positive base interval and metric frequencies.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Validation` if any invariant is violated.
    pub fn validate(&self) -> SimResult<()> {
        if !(self.interval_secs > 0.0) {
            return Err(SimError::validation("monitoring interval must be > 0"));
        }
        for metric in &self.db_metrics {
            if !(metric.frequency_secs > 0.0) {
                return Err(SimError::validation(format!(
                    "db metric `{}`: frequency must be > 0",
                    metric.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_metric_names_are_snake_case() {
        let metrics: Vec<HostMetric> =
            serde_json::from_str(r#"["cpu_percent", "memory_percent", "disk_io"]"#).unwrap();
        assert_eq!(
            metrics,
            vec![
                HostMetric::CpuPercent,
                HostMetric::MemoryPercent,
                HostMetric::DiskIo
            ]
        );
    }

    #[test]
    fn monitoring_spec_defaults_and_validation() {
        let spec: MonitoringSpec = serde_json::from_str(
            r#"{"db_metrics": [{"name": "index_usage", "query": "SELECT 1"}]}"#,
        )
        .unwrap();
        assert_eq!(spec.interval_secs, 5.0);
        assert_eq!(spec.db_metrics[0].frequency_secs, 60.0);
        assert!(spec.validate().is_ok());

        let mut bad = spec.clone();
        bad.db_metrics[0].frequency_secs = 0.0;
        assert!(bad.validate().is_err());

        let mut bad = spec;
        bad.interval_secs = 0.0;
        assert!(bad.validate().is_err());
    }
}
