//! Integration tests for the workload runner: duration bounds, stop-signal
//! behavior, outcome classification, and failure isolation.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use loadsim_core::{
    MockAdapter, ParamGenSpec, ParamValue, QueryExecutionMetric, QuerySpec, TableMetadata,
    WorkloadSpec,
};
use loadsim_metrics::MetricSink;
use loadsim_workload::WorkloadRunner;

fn workload(name: &str, duration_secs: u64, concurrency: usize, queries: Vec<QuerySpec>) -> WorkloadSpec {
    WorkloadSpec {
        name: name.to_string(),
        kind: "OLTP".to_string(),
        enabled: true,
        duration_secs,
        concurrency,
        queries,
    }
}

fn query(name: &str, template: &str) -> QuerySpec {
    QuerySpec {
        name: name.to_string(),
        template: template.to_string(),
        weight: 1,
        param_generators: Vec::new(),
    }
}

fn read_query_log(run_dir: &Path) -> Vec<QueryExecutionMetric> {
    let file = File::open(run_dir.join("query_executions.jsonl")).unwrap();
    BufReader::new(file)
        .lines()
        .map(|line| serde_json::from_str(&line.unwrap()).unwrap())
        .collect()
}

#[tokio::test]
async fn stop_signal_ends_tasks_before_their_duration() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MetricSink::create(dir.path()).unwrap());
    let adapter = Arc::new(MockAdapter::new());

    // Workload nominally runs for a minute; the global deadline cuts it off.
    let workloads = vec![workload(
        "long",
        60,
        2,
        vec![query("probe", "SELECT * FROM Probe")],
    )];
    let runner = WorkloadRunner::new(adapter.clone(), sink.clone(), workloads)
        .with_jitter(Duration::from_millis(10), Duration::from_millis(30));

    let started = Instant::now();
    runner.run_all(Duration::from_secs(1)).await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(1));
    assert!(
        elapsed < Duration::from_secs(3),
        "stop signal not observed promptly: {elapsed:?}"
    );
    assert!(adapter.execute_count() > 0);
}

#[tokio::test]
async fn task_stops_at_its_own_duration() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MetricSink::create(dir.path()).unwrap());
    let adapter = Arc::new(MockAdapter::new());

    // Workload duration is shorter than the global deadline, so the task
    // must exit on its own clock; no executions should land late.
    let workloads = vec![workload(
        "short",
        1,
        1,
        vec![query("probe", "SELECT * FROM Probe")],
    )];
    let runner = WorkloadRunner::new(adapter, sink.clone(), workloads)
        .with_jitter(Duration::from_millis(10), Duration::from_millis(30));

    runner.run_all(Duration::from_secs(3)).await.unwrap();

    let records = read_query_log(sink.run_dir());
    assert!(!records.is_empty());
    let first = records.first().unwrap().timestamp;
    let last = records.last().unwrap().timestamp;
    let span = (last - first).num_milliseconds();
    assert!(
        span < 2_000,
        "executions continued past the workload duration: {span}ms"
    );
}

#[tokio::test]
async fn failures_are_recorded_and_do_not_kill_the_stream() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MetricSink::create(dir.path()).unwrap());
    let adapter = Arc::new(MockAdapter::new().with_failure("FROM Broken"));

    let workloads = vec![workload(
        "mixed",
        10,
        1,
        vec![
            query("good", "SELECT * FROM Fine"),
            query("bad", "SELECT * FROM Broken"),
        ],
    )];
    let runner = WorkloadRunner::new(adapter, sink.clone(), workloads)
        .with_jitter(Duration::from_millis(5), Duration::from_millis(15));

    runner.run_all(Duration::from_secs(1)).await.unwrap();

    let records = read_query_log(sink.run_dir());
    let failures: Vec<_> = records.iter().filter(|r| r.query_name == "bad").collect();
    let successes: Vec<_> = records.iter().filter(|r| r.query_name == "good").collect();

    assert!(!failures.is_empty(), "failed executions must be recorded");
    assert!(!successes.is_empty(), "stream must survive failing queries");
    for record in &failures {
        assert!(!record.success);
        assert!(record.rows_affected_or_fetched.is_none());
    }
    for record in &successes {
        assert!(record.success);
        assert_eq!(record.rows_affected_or_fetched, Some(0));
    }
    for record in &records {
        assert!(record.duration_ms >= 0.0);
    }
}

#[tokio::test]
async fn resolved_parameters_reach_the_adapter_and_the_log() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MetricSink::create(dir.path()).unwrap());
    let adapter = Arc::new(MockAdapter::new().with_table(
        "Orders",
        TableMetadata {
            pk_column: Some("OrderID".into()),
            min_id: Some(9),
            max_id: Some(9),
        },
    ));

    let mut spec = query("get_order", "SELECT * FROM Orders WHERE OrderID = ?");
    spec.param_generators = vec![ParamGenSpec::RangeFromTable {
        table: "Orders".into(),
        column: "OrderID".into(),
    }];
    let workloads = vec![workload("oltp", 10, 1, vec![spec])];
    let runner = WorkloadRunner::new(adapter.clone(), sink.clone(), workloads)
        .with_jitter(Duration::from_millis(5), Duration::from_millis(15));

    runner.run_all(Duration::from_secs(1)).await.unwrap();

    for (_, params) in adapter.executed() {
        assert_eq!(params, vec![ParamValue::Int(9)]);
    }
    let records = read_query_log(sink.run_dir());
    assert!(records
        .iter()
        .all(|r| r.parameters == vec![ParamValue::Int(9)]));
}

#[tokio::test]
async fn disabled_workloads_are_skipped_entirely() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MetricSink::create(dir.path()).unwrap());
    let adapter = Arc::new(MockAdapter::new());

    let mut spec = workload("off", 10, 4, vec![query("probe", "SELECT 1")]);
    spec.enabled = false;
    let runner = WorkloadRunner::new(adapter.clone(), sink, vec![spec]);

    let started = Instant::now();
    runner.run_all(Duration::from_secs(5)).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(adapter.execute_count(), 0);
}

#[tokio::test]
async fn invalid_workload_is_startup_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MetricSink::create(dir.path()).unwrap());
    let adapter = Arc::new(MockAdapter::new());

    let mut bad = query("q", "SELECT 1");
    bad.weight = 0;
    let runner = WorkloadRunner::new(adapter.clone(), sink, vec![workload("w", 1, 1, vec![bad])]);

    assert!(runner.run_all(Duration::from_millis(100)).await.is_err());
    assert_eq!(adapter.execute_count(), 0);
}
