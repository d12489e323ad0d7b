use async_trait::async_trait;

use crate::error::SimResult;
use crate::metadata::TableMetadata;
use crate::value::{ParamValue, QueryResult};

/// Database collaborator interface consumed by the workload and monitoring
/// domains. One production implementation is selected at startup; both
/// domains share its underlying connection pool.
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// Executes a single query with the given parameters.
    ///
    /// Returns `Ok(None)` when the query itself failed (the null-on-failure
    /// contract); `Err` is reserved for adapter-level faults such as a lost
    /// pool. Callers treat both as a failed execution.
    async fn execute_query(
        &self,
        template: &str,
        params: &[ParamValue],
        fetch_results: bool,
    ) -> SimResult<Option<QueryResult>>;

    /// Cached metadata for a table, or `None` when unknown.
    async fn table_metadata(&self, table: &str) -> SimResult<Option<TableMetadata>>;

    /// Up to `sample_size` sampled values from a column.
    async fn column_sample(
        &self,
        table: &str,
        column: &str,
        sample_size: usize,
    ) -> SimResult<Vec<ParamValue>>;
}
