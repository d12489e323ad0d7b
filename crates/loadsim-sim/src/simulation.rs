use std::sync::Arc;
use tracing::info;

use loadsim_core::{
    DatabaseAdapter, MonitoringSpec, SimConfig, SimError, SimResult, WorkloadSpec,
};
use loadsim_metrics::MetricSink;
use loadsim_monitor::ResourceSampler;
use loadsim_workload::WorkloadRunner;

/// One simulation run: resource sampling in the background, workload
/// execution in the foreground, both ending on the shared deadline.
///
/// Collected data stays in the metric sink, which is the hand-off point to
/// the downstream analysis and recommendation stages.
pub struct Simulation {
    config: SimConfig,
    adapter: Arc<dyn DatabaseAdapter>,
    workloads: Vec<WorkloadSpec>,
    monitoring: MonitoringSpec,
    sink: Arc<MetricSink>,
}

impl Simulation {
    /// Builds a simulation after validating every spec.
    ///
    /// # Errors
    ///
    /// Returns a validation or configuration error when any spec is
    /// inconsistent; nothing is started.
    pub fn new(
        config: SimConfig,
        adapter: Arc<dyn DatabaseAdapter>,
        workloads: Vec<WorkloadSpec>,
        monitoring: MonitoringSpec,
        sink: Arc<MetricSink>,
    ) -> SimResult<Self> {
        config
            .validate()
            .map_err(|err| SimError::config(err.to_string()))?;
        for workload in &workloads {
            workload.validate()?;
        }
        monitoring.validate()?;

        Ok(Self {
            config,
            adapter,
            workloads,
            monitoring,
            sink,
        })
    }

    /// The sink receiving this run's metrics.
    #[must_use]
    pub fn sink(&self) -> &Arc<MetricSink> {
        &self.sink
    }

    /// Runs the simulation: start the sampler, run all workloads for the
    /// global duration, stop the sampler.
    pub async fn run(&self) -> SimResult<()> {
        info!(
            global_duration_secs = self.config.global_duration_secs,
            run_dir = %self.sink.run_dir().display(),
            "starting simulation"
        );

        let mut sampler = ResourceSampler::new(
            self.monitoring.clone(),
            self.adapter.clone(),
            self.sink.clone(),
        );
        sampler.start()?;

        let (jitter_min, jitter_max) = self.config.jitter_bounds();
        let runner = WorkloadRunner::new(
            self.adapter.clone(),
            self.sink.clone(),
            self.workloads.clone(),
        )
        .with_jitter(jitter_min, jitter_max);

        let result = runner.run_all(self.config.global_duration()).await;

        sampler.stop().await;
        info!("simulation finished");

        result
    }
}
