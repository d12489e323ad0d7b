use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use loadsim_core::{DbMetricRecord, QueryExecutionMetric, ResourceMetric, SimResult};

const QUERY_LOG: &str = "query_executions.jsonl";
const RESOURCE_LOG: &str = "resource_metrics.jsonl";
const DB_LOG: &str = "db_metrics.jsonl";
const RECOMMENDATION_LOG: &str = "recommendations.txt";

/// Append-only recorder for the three metric record kinds plus free-text
/// recommendation lines, each in its own log under a timestamped run
/// directory.
///
/// Every append goes through an unbuffered file handle and reaches the file
/// before the call returns, so a mid-run crash loses at most the in-flight
/// record. Records are never rewritten.
pub struct MetricSink {
    run_dir: PathBuf,
    query_log: Mutex<File>,
    resource_log: Mutex<File>,
    db_log: Mutex<File>,
    recommendation_log: Mutex<File>,
}

impl MetricSink {
    /// Creates the per-run directory `{output_dir}/{YYYYMMDD_HHMMSS}/` and
    /// opens its four logs for appending.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the directory or a log file cannot be
    /// created; the orchestrator treats this as startup-fatal.
    pub fn create(output_dir: impl AsRef<Path>) -> SimResult<Self> {
        let run_ts = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let run_dir = output_dir.as_ref().join(run_ts);
        fs::create_dir_all(&run_dir)?;

        let open = |name: &str| -> std::io::Result<File> {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(run_dir.join(name))
        };

        let sink = Self {
            query_log: Mutex::new(open(QUERY_LOG)?),
            resource_log: Mutex::new(open(RESOURCE_LOG)?),
            db_log: Mutex::new(open(DB_LOG)?),
            recommendation_log: Mutex::new(open(RECOMMENDATION_LOG)?),
            run_dir,
        };

        info!(run_dir = %sink.run_dir.display(), "metric sink ready");
        Ok(sink)
    }

    /// Directory holding this run's logs.
    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    fn append_json<T: Serialize>(log: &Mutex<File>, record: &T) -> SimResult<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let mut file = log.lock();
        file.write_all(&line)?;
        Ok(())
    }

    /// Appends one query-execution record.
    pub fn record_query_execution(&self, metric: &QueryExecutionMetric) -> SimResult<()> {
        debug!(
            query = %metric.query_name,
            duration_ms = metric.duration_ms,
            success = metric.success,
            "query metric"
        );
        Self::append_json(&self.query_log, metric)
    }

    /// Appends one host-resource record.
    pub fn record_resource_metric(&self, metric: &ResourceMetric) -> SimResult<()> {
        Self::append_json(&self.resource_log, metric)
    }

    /// Appends one database-metric record.
    pub fn record_db_metric(&self, record: &DbMetricRecord) -> SimResult<()> {
        Self::append_json(&self.db_log, record)
    }

    /// Appends one timestamp-prefixed recommendation line.
    ///
    /// Written through the sink by the downstream recommendation stage, not
    /// by the engine itself.
    pub fn record_recommendation(&self, text: &str) -> SimResult<()> {
        let line = format!("[{}] {}\n", Utc::now().to_rfc3339(), text);
        let mut file = self.recommendation_log.lock();
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Reads back database-metric records in file order.
    ///
    /// With a filter, only records whose `metric_name` equals the filter are
    /// returned. Unparsable lines are logged and skipped rather than failing
    /// the whole read.
    pub fn read_db_metrics(&self, filter: Option<&str>) -> SimResult<Vec<DbMetricRecord>> {
        let path = self.run_dir.join(DB_LOG);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<DbMetricRecord>(&line) {
                Ok(record) => {
                    if filter.map_or(true, |name| record.metric_name == name) {
                        records.push(record);
                    }
                }
                Err(err) => {
                    warn!(error = %err, "skipping malformed db metric line");
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use loadsim_core::Row;

    fn db_record(name: &str, value: i64) -> DbMetricRecord {
        let mut data = Row::new();
        data.insert("value".into(), serde_json::json!(value));
        DbMetricRecord {
            metric_name: name.to_string(),
            timestamp: Utc::now(),
            data,
        }
    }

    #[test]
    fn run_dir_is_created_under_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MetricSink::create(dir.path()).unwrap();
        assert!(sink.run_dir().starts_with(dir.path()));
        assert!(sink.run_dir().join(QUERY_LOG).exists());
        assert!(sink.run_dir().join(RECOMMENDATION_LOG).exists());
    }

    #[test]
    fn db_metrics_read_back_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MetricSink::create(dir.path()).unwrap();

        sink.record_db_metric(&db_record("index_usage", 1)).unwrap();
        sink.record_db_metric(&db_record("wait_stats", 2)).unwrap();
        sink.record_db_metric(&db_record("index_usage", 3)).unwrap();

        let all = sink.read_db_metrics(None).unwrap();
        assert_eq!(all.len(), 3);

        let filtered = sink.read_db_metrics(Some("index_usage")).unwrap();
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].data["value"], serde_json::json!(1));
        assert_eq!(filtered[1].data["value"], serde_json::json!(3));
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MetricSink::create(dir.path()).unwrap();

        sink.record_db_metric(&db_record("index_usage", 1)).unwrap();
        {
            let mut file = sink.db_log.lock();
            file.write_all(b"{ not json\n").unwrap();
        }
        sink.record_db_metric(&db_record("index_usage", 2)).unwrap();

        let records = sink.read_db_metrics(Some("index_usage")).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn recommendation_lines_are_timestamp_prefixed() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MetricSink::create(dir.path()).unwrap();

        sink.record_recommendation("add a covering index on Orders(CustomerID)")
            .unwrap();

        let text = fs::read_to_string(sink.run_dir().join(RECOMMENDATION_LOG)).unwrap();
        assert!(text.starts_with('['));
        assert!(text.contains("covering index"));
    }
}
