//! Core domain types and collaborator traits for the loadsim workload engine.

pub mod adapter;
pub mod config;
pub mod error;
pub mod metadata;
pub mod mock;
pub mod monitoring;
pub mod records;
pub mod value;
pub mod workload;

pub use adapter::DatabaseAdapter;
pub use config::SimConfig;
pub use error::{SimError, SimResult};
pub use metadata::TableMetadata;
pub use mock::MockAdapter;
pub use monitoring::{DbMetricSpec, HostMetric, MonitoringSpec};
pub use records::{DbMetricRecord, QueryExecutionMetric, ResourceMetric};
pub use value::{ParamValue, QueryResult, Row};
pub use workload::{ParamGenSpec, QuerySpec, WorkloadSpec};
