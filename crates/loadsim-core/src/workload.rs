use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{SimError, SimResult};

/// Declarative rule producing one (or one pair of) concrete query arguments.
///
/// Variants mirror the workload configuration: the tag selects the generator
/// kind and the remaining fields are only meaningful for that kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamGenSpec {
    /// Uniform random integer within the observed `[min_id, max_id]` of a
    /// table's primary key range.
    RangeFromTable {
        /// Table whose metadata supplies the bounds.
        table: String,
        /// Column the bounds refer to.
        column: String,
    },
    /// Uniform random element of a sampled set of existing column values.
    SampleFromTable {
        /// Table to sample from.
        table: String,
        /// Column to sample.
        column: String,
        /// Maximum number of sampled values to fetch and cache.
        #[serde(default = "default_sample_size")]
        sample_size: usize,
    },
    /// Pair of timestamp bounds, `start` before `end`, relative to now.
    DateRange {
        /// Days before now for the start bound.
        #[serde(default = "default_start_days_ago")]
        start_days_ago: i64,
        /// Days before now for the end bound.
        #[serde(default)]
        end_days_ago: i64,
    },
}

fn default_sample_size() -> usize {
    100
}

fn default_start_days_ago() -> i64 {
    30
}

/// One parameterized query inside a workload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Query name, used in logs and emitted metrics.
    pub name: String,
    /// Parameterized query text.
    pub template: String,
    /// Selection weight; probability of selection is `weight / Σ weights`.
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Parameter generators, resolved in declaration order.
    #[serde(default)]
    pub param_generators: Vec<ParamGenSpec>,
}

fn default_weight() -> u32 {
    1
}

/// A named, time-boxed, concurrently replicated stream of query executions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadSpec {
    /// Workload name, used in logs and emitted metrics.
    pub name: String,
    /// Free-form workload kind tag (e.g. `"OLTP"`, `"OLAP"`).
    #[serde(default)]
    pub kind: String,
    /// Disabled workloads are skipped by the runner.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Per-task duration in seconds.
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,
    /// Number of parallel task instances.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Queries the workload draws from.
    #[serde(default)]
    pub queries: Vec<QuerySpec>,
}

fn default_enabled() -> bool {
    true
}

fn default_duration_secs() -> u64 {
    60
}

fn default_concurrency() -> usize {
    1
}

impl WorkloadSpec {
    /// Per-task duration as a `Duration`.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    /// Validates invariants: concurrency ≥ 1 and every query weight ≥ 1.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Validation` if any invariant is violated.
    pub fn validate(&self) -> SimResult<()> {
        if self.concurrency == 0 {
            return Err(SimError::validation(format!(
                "workload `{}`: concurrency must be >= 1",
                self.name
            )));
        }
        for query in &self.queries {
            if query.weight == 0 {
                return Err(SimError::validation(format!(
                    "workload `{}`, query `{}`: weight must be >= 1",
                    self.name, query.name
                )));
            }
        }
        Ok(())
    }
}
