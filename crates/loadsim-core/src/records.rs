use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::{ParamValue, Row};

/// One recorded query execution, successful or not.
///
/// Records are append-only: once emitted through the sink they are never
/// mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryExecutionMetric {
    /// Wall-clock time the execution completed.
    pub timestamp: DateTime<Utc>,
    /// Name of the workload the query ran under.
    pub workload_name: String,
    /// Name of the executed query.
    pub query_name: String,
    /// Parameterized query text.
    pub query_template: String,
    /// Resolved parameter list, in declaration order.
    pub parameters: Vec<ParamValue>,
    /// Execution wall-clock duration in milliseconds (monotonic clock).
    pub duration_ms: f64,
    /// Row count for reads, affected count for writes; absent on failure.
    pub rows_affected_or_fetched: Option<u64>,
    /// Whether the execution produced a result.
    pub success: bool,
}

/// One host resource sample.
///
/// Only configured fields are set; the rest stay `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceMetric {
    /// Sample timestamp.
    pub timestamp: DateTime<Utc>,
    /// Overall CPU utilization percentage.
    pub cpu_percent: Option<f32>,
    /// Memory utilization percentage.
    pub memory_percent: Option<f32>,
    /// Cumulative disk read byte counter.
    pub disk_read_bytes: Option<u64>,
    /// Cumulative disk write byte counter.
    pub disk_write_bytes: Option<u64>,
}

impl ResourceMetric {
    /// Empty sample at the given timestamp.
    #[must_use]
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }
}

/// One row of a monitoring query's result set, tagged with the metric name.
///
/// A single dispatch can yield zero, one, or many of these records, all
/// sharing the dispatch's completion timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbMetricRecord {
    /// Configured metric name.
    pub metric_name: String,
    /// Completion timestamp of the dispatch that produced this row.
    pub timestamp: DateTime<Utc>,
    /// The raw result row, keyed by column name.
    pub data: Row,
}
