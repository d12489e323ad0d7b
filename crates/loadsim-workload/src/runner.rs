use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use loadsim_core::{
    DatabaseAdapter, ParamValue, QueryExecutionMetric, QueryResult, QuerySpec, SimResult,
    WorkloadSpec,
};
use loadsim_metrics::MetricSink;

use crate::params::ParamGenerator;

/// Bound on waiting for tasks to observe the stop signal before the run
/// gives up on them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Default inter-iteration jitter bounds.
const DEFAULT_JITTER: (Duration, Duration) =
    (Duration::from_millis(50), Duration::from_millis(500));

/// Shared state handed to every workload task instance.
#[derive(Clone)]
struct TaskContext {
    adapter: Arc<dyn DatabaseAdapter>,
    params: Arc<ParamGenerator>,
    sink: Arc<MetricSink>,
    jitter: (Duration, Duration),
}

/// Runs every enabled workload as a pool of concurrent, time-boxed task
/// instances sharing one cooperative stop signal.
pub struct WorkloadRunner {
    context: TaskContext,
    workloads: Vec<WorkloadSpec>,
}

impl WorkloadRunner {
    /// New runner over the given workloads with default jitter bounds.
    pub fn new(
        adapter: Arc<dyn DatabaseAdapter>,
        sink: Arc<MetricSink>,
        workloads: Vec<WorkloadSpec>,
    ) -> Self {
        Self {
            context: TaskContext {
                params: Arc::new(ParamGenerator::new(adapter.clone())),
                adapter,
                sink,
                jitter: DEFAULT_JITTER,
            },
            workloads,
        }
    }

    /// Overrides the inter-iteration jitter bounds.
    #[must_use]
    pub fn with_jitter(mut self, min: Duration, max: Duration) -> Self {
        self.context.jitter = (min, max);
        self
    }

    /// Runs all enabled workloads for `global_duration`.
    ///
    /// Spawns `Σ concurrency` task instances, sleeps for the global
    /// duration, sets the shared stop signal, then waits up to a grace
    /// window for tasks to finish. Individual task failures are logged,
    /// never propagated; a task that outlives the grace window is left to
    /// finish detached.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Validation` when a workload spec violates its
    /// invariants (startup-fatal; nothing is spawned).
    pub async fn run_all(&self, global_duration: Duration) -> SimResult<()> {
        self.context.params.clear_cache();

        let active: Vec<&WorkloadSpec> =
            self.workloads.iter().filter(|wl| wl.enabled).collect();
        if active.is_empty() {
            info!("no enabled workloads to run");
            return Ok(());
        }
        for workload in &active {
            workload.validate()?;
        }

        info!(
            workloads = active.len(),
            global_duration_secs = global_duration.as_secs_f64(),
            "starting workload execution"
        );

        let stop = Arc::new(AtomicBool::new(false));
        let mut tasks: Vec<JoinHandle<()>> = Vec::new();
        for workload in &active {
            for instance in 0..workload.concurrency {
                tasks.push(tokio::spawn(run_workload_task(
                    self.context.clone(),
                    (*workload).clone(),
                    stop.clone(),
                    instance,
                )));
            }
        }

        tokio::time::sleep(global_duration).await;
        info!("global simulation time up, signaling workload tasks to stop");
        stop.store(true, Ordering::Relaxed);

        let drain = async {
            for result in futures::future::join_all(tasks).await {
                if let Err(err) = result {
                    error!(error = %err, "workload task failed");
                }
            }
        };
        if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
            warn!(
                grace_secs = SHUTDOWN_GRACE.as_secs(),
                "gave up waiting for workload tasks"
            );
        } else {
            info!("all workload tasks completed");
        }

        Ok(())
    }
}

/// Expands the query list into a weight-multiplied index pool: a query with
/// weight `w` appears `w` times, so a uniform pick over the pool selects a
/// query with probability `weight / Σ weights`.
fn weighted_pool(queries: &[QuerySpec]) -> Vec<usize> {
    let mut pool = Vec::new();
    for (index, query) in queries.iter().enumerate() {
        pool.extend(std::iter::repeat(index).take(query.weight as usize));
    }
    pool
}

/// One task instance: loop until the shared stop signal is set or the
/// workload's own duration elapses.
async fn run_workload_task(
    context: TaskContext,
    workload: WorkloadSpec,
    stop: Arc<AtomicBool>,
    instance: usize,
) {
    let pool = weighted_pool(&workload.queries);
    if pool.is_empty() {
        warn!(workload = %workload.name, "no queries in workload, task exiting");
        return;
    }

    info!(workload = %workload.name, instance, "workload task started");
    let started = Instant::now();
    let duration = workload.duration();

    while !stop.load(Ordering::Relaxed) && started.elapsed() < duration {
        let index = match pool.choose(&mut rand::thread_rng()) {
            Some(index) => *index,
            None => break,
        };
        let query = &workload.queries[index];

        // One bad iteration must not kill the whole stream.
        if let Err(err) = execute_once(&context, &workload.name, query).await {
            error!(
                workload = %workload.name,
                query = %query.name,
                error = %err,
                "workload iteration failed"
            );
        }

        let jitter_ms = {
            let (min, max) = context.jitter;
            rand::thread_rng().gen_range(min.as_millis() as u64..=max.as_millis() as u64)
        };
        tokio::time::sleep(Duration::from_millis(jitter_ms)).await;
    }

    info!(workload = %workload.name, instance, "workload task finished or was stopped");
}

/// Resolves parameters, executes the query, classifies the outcome, and
/// records it whether it succeeded or not.
async fn execute_once(
    context: &TaskContext,
    workload_name: &str,
    query: &QuerySpec,
) -> SimResult<()> {
    let parameters: Vec<ParamValue> =
        context.params.resolve_all(&query.param_generators).await;

    let started = Instant::now();
    let outcome = context
        .adapter
        .execute_query(&query.template, &parameters, true)
        .await;
    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

    let (rows_affected_or_fetched, success) = match &outcome {
        Ok(Some(result)) => (Some(result.row_count()), true),
        Ok(None) | Err(_) => (None, false),
    };

    let metric = QueryExecutionMetric {
        timestamp: Utc::now(),
        workload_name: workload_name.to_string(),
        query_name: query.name.clone(),
        query_template: query.template.clone(),
        parameters,
        duration_ms,
        rows_affected_or_fetched,
        success,
    };
    context.sink.record_query_execution(&metric)?;

    match outcome {
        Ok(Some(result)) => {
            let rows = match result {
                QueryResult::Rows(rows) => rows.len() as u64,
                QueryResult::Affected(n) => n,
            };
            debug!(
                workload = workload_name,
                query = %query.name,
                duration_ms,
                rows,
                "query executed"
            );
        }
        Ok(None) => {
            warn!(workload = workload_name, query = %query.name, "query failed");
        }
        Err(err) => {
            warn!(
                workload = workload_name,
                query = %query.name,
                error = %err,
                "query execution errored"
            );
        }
    }

    Ok(())
}
