//! Scripted in-process adapter used by tests across the workspace.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::adapter::DatabaseAdapter;
use crate::error::SimResult;
use crate::metadata::TableMetadata;
use crate::value::{ParamValue, QueryResult, Row};

/// Scripted [`DatabaseAdapter`] with per-method call tracking.
///
/// Behavior defaults:
/// - queries matching a scripted failure substring return `Ok(None)`;
/// - queries matching a scripted rows substring return those rows;
/// - other `SELECT` queries return an empty row set;
/// - everything else reports one affected row.
#[derive(Default)]
pub struct MockAdapter {
    metadata: RwLock<HashMap<String, TableMetadata>>,
    samples: RwLock<HashMap<(String, String), Vec<ParamValue>>>,
    scripted_rows: RwLock<Vec<(String, Vec<Row>)>>,
    fail_on: RwLock<Vec<String>>,
    latency: RwLock<Option<Duration>>,
    executed: Mutex<Vec<(String, Vec<ParamValue>)>>,
    sample_fetches: AtomicUsize,
}

impl MockAdapter {
    /// Empty adapter: no metadata, no samples, every query succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts metadata for a table.
    #[must_use]
    pub fn with_table(self, table: impl Into<String>, metadata: TableMetadata) -> Self {
        self.metadata.write().insert(table.into(), metadata);
        self
    }

    /// Scripts the sample set returned for `(table, column)`.
    #[must_use]
    pub fn with_sample(
        self,
        table: impl Into<String>,
        column: impl Into<String>,
        values: Vec<ParamValue>,
    ) -> Self {
        self.samples.write().insert((table.into(), column.into()), values);
        self
    }

    /// Scripts result rows for queries containing `template_part`.
    #[must_use]
    pub fn with_rows(self, template_part: impl Into<String>, rows: Vec<Row>) -> Self {
        self.scripted_rows.write().push((template_part.into(), rows));
        self
    }

    /// Makes queries containing `template_part` fail (`Ok(None)`).
    #[must_use]
    pub fn with_failure(self, template_part: impl Into<String>) -> Self {
        self.fail_on.write().push(template_part.into());
        self
    }

    /// Adds a fixed latency to every `execute_query` call.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.write() = Some(latency);
        self
    }

    /// Number of `execute_query` calls so far.
    #[must_use]
    pub fn execute_count(&self) -> usize {
        self.executed.lock().len()
    }

    /// Number of `execute_query` calls whose template contains the substring.
    #[must_use]
    pub fn execute_count_matching(&self, template_part: &str) -> usize {
        self.executed
            .lock()
            .iter()
            .filter(|(template, _)| template.contains(template_part))
            .count()
    }

    /// Number of `column_sample` fetches so far.
    #[must_use]
    pub fn sample_fetch_count(&self) -> usize {
        self.sample_fetches.load(Ordering::Relaxed)
    }

    /// Executed `(template, params)` pairs, in execution order.
    #[must_use]
    pub fn executed(&self) -> Vec<(String, Vec<ParamValue>)> {
        self.executed.lock().clone()
    }
}

#[async_trait]
impl DatabaseAdapter for MockAdapter {
    async fn execute_query(
        &self,
        template: &str,
        params: &[ParamValue],
        _fetch_results: bool,
    ) -> SimResult<Option<QueryResult>> {
        let latency = *self.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        self.executed
            .lock()
            .push((template.to_string(), params.to_vec()));

        if self
            .fail_on
            .read()
            .iter()
            .any(|part| template.contains(part.as_str()))
        {
            return Ok(None);
        }

        let scripted = self
            .scripted_rows
            .read()
            .iter()
            .find(|(part, _)| template.contains(part.as_str()))
            .map(|(_, rows)| rows.clone());
        if let Some(rows) = scripted {
            return Ok(Some(QueryResult::Rows(rows)));
        }

        if template.trim_start().to_ascii_uppercase().starts_with("SELECT") {
            Ok(Some(QueryResult::Rows(Vec::new())))
        } else {
            Ok(Some(QueryResult::Affected(1)))
        }
    }

    async fn table_metadata(&self, table: &str) -> SimResult<Option<TableMetadata>> {
        Ok(self.metadata.read().get(table).cloned())
    }

    async fn column_sample(
        &self,
        table: &str,
        column: &str,
        sample_size: usize,
    ) -> SimResult<Vec<ParamValue>> {
        self.sample_fetches.fetch_add(1, Ordering::Relaxed);
        let values = self
            .samples
            .read()
            .get(&(table.to_string(), column.to_string()))
            .cloned()
            .unwrap_or_default();
        Ok(values.into_iter().take(sample_size).collect())
    }
}
