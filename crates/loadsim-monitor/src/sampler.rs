use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use loadsim_core::{
    DatabaseAdapter, DbMetricRecord, MonitoringSpec, QueryResult, SimResult,
};
use loadsim_metrics::MetricSink;

use crate::probe::{HostProbe, SysinfoProbe};

/// Bound on waiting for the sampling loop to observe the stop signal.
const STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Background sampler for host resources and database metrics.
///
/// Runs one worker task independent of the workload domain. Host metrics
/// are sampled synchronously every base-interval tick; each configured
/// database metric is dispatched fire-and-forget on its own frequency so a
/// slow monitoring query never stalls host sampling.
///
/// State machine: idle → running → stopping → idle. `start` is a no-op when
/// already running; `stop` waits a bounded time and then abandons the loop
/// rather than force-killing it.
pub struct ResourceSampler {
    spec: MonitoringSpec,
    adapter: Arc<dyn DatabaseAdapter>,
    sink: Arc<MetricSink>,
    probe: Arc<Mutex<Box<dyn HostProbe>>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ResourceSampler {
    /// New sampler using the production `sysinfo` host probe.
    pub fn new(
        spec: MonitoringSpec,
        adapter: Arc<dyn DatabaseAdapter>,
        sink: Arc<MetricSink>,
    ) -> Self {
        Self::with_probe(spec, adapter, sink, Box::new(SysinfoProbe::new()))
    }

    /// New sampler with a caller-supplied host probe.
    pub fn with_probe(
        spec: MonitoringSpec,
        adapter: Arc<dyn DatabaseAdapter>,
        sink: Arc<MetricSink>,
        probe: Box<dyn HostProbe>,
    ) -> Self {
        Self {
            spec,
            adapter,
            sink,
            probe: Arc::new(Mutex::new(probe)),
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Whether the sampling loop is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Starts the sampling loop. No-op when already running.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Validation` when the monitoring spec violates its
    /// invariants (startup-fatal; nothing is spawned).
    pub fn start(&mut self) -> SimResult<()> {
        if self.is_running() {
            warn!("resource sampler already running");
            return Ok(());
        }
        self.spec.validate()?;

        self.stop.store(false, Ordering::Relaxed);
        let handle = tokio::spawn(sampling_loop(
            self.spec.clone(),
            self.adapter.clone(),
            self.sink.clone(),
            self.probe.clone(),
            self.stop.clone(),
        ));
        self.worker = Some(handle);
        info!(
            interval_secs = self.spec.interval_secs,
            db_metrics = self.spec.db_metrics.len(),
            "resource sampler started"
        );
        Ok(())
    }

    /// Signals the cooperative stop condition and waits up to the bounded
    /// timeout for the loop to exit. A loop that does not exit in time is
    /// abandoned, not aborted; that is logged as a non-fatal anomaly.
    pub async fn stop(&mut self) {
        let Some(handle) = self.worker.take() else {
            info!("resource sampler not running");
            return;
        };

        info!("stopping resource sampler");
        self.stop.store(true, Ordering::Relaxed);
        match tokio::time::timeout(STOP_TIMEOUT, handle).await {
            Ok(Ok(())) => info!("resource sampler stopped"),
            Ok(Err(err)) => error!(error = %err, "sampling loop failed"),
            Err(_) => warn!(
                timeout_secs = STOP_TIMEOUT.as_secs(),
                "sampling loop did not stop in time, abandoning it"
            ),
        }
    }
}

async fn sampling_loop(
    spec: MonitoringSpec,
    adapter: Arc<dyn DatabaseAdapter>,
    sink: Arc<MetricSink>,
    probe: Arc<Mutex<Box<dyn HostProbe>>>,
    stop: Arc<AtomicBool>,
) {
    let interval = spec.interval();
    // Absent entry means the metric has never been dispatched and is
    // immediately due on the first tick.
    let mut last_run: HashMap<String, Instant> = HashMap::new();

    probe.lock().prime();
    info!(interval_secs = interval.as_secs_f64(), "sampling loop started");

    while !stop.load(Ordering::Relaxed) {
        let host_sample = probe.lock().sample(&spec.host_metrics);
        if let Some(metric) = host_sample {
            if let Err(err) = sink.record_resource_metric(&metric) {
                warn!(error = %err, "failed to record host sample");
            }
        }

        let now = Instant::now();
        for metric in &spec.db_metrics {
            let due = last_run
                .get(&metric.name)
                .map(|last| now.duration_since(*last) >= metric.frequency())
                .unwrap_or(true);
            if due {
                // last_run advances at dispatch time, not completion time:
                // a slow query does not delay its own next dispatch, and
                // at-most-one-in-flight is not guaranteed.
                last_run.insert(metric.name.clone(), now);
                debug!(metric = %metric.name, "dispatching db metric query");
                tokio::spawn(collect_db_metric(
                    adapter.clone(),
                    sink.clone(),
                    metric.name.clone(),
                    metric.query.clone(),
                ));
            }
        }

        tokio::time::sleep(interval).await;
    }

    info!("sampling loop stopped");
}

/// Runs one monitoring query and emits one record per result row, all rows
/// sharing the completion timestamp. Failures are logged and skipped.
async fn collect_db_metric(
    adapter: Arc<dyn DatabaseAdapter>,
    sink: Arc<MetricSink>,
    name: String,
    query: String,
) {
    match adapter.execute_query(&query, &[], true).await {
        Ok(Some(QueryResult::Rows(rows))) => {
            let timestamp = Utc::now();
            for data in rows {
                let record = DbMetricRecord {
                    metric_name: name.clone(),
                    timestamp,
                    data,
                };
                if let Err(err) = sink.record_db_metric(&record) {
                    warn!(metric = %name, error = %err, "failed to record db metric row");
                }
            }
        }
        Ok(Some(QueryResult::Affected(_))) => {
            warn!(metric = %name, "monitoring query returned no result set");
        }
        Ok(None) => {
            warn!(metric = %name, "monitoring query failed");
        }
        Err(err) => {
            warn!(metric = %name, error = %err, "monitoring query errored");
        }
    }
}
