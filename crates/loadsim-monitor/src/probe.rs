use chrono::Utc;
use sysinfo::{CpuExt, ProcessExt, System, SystemExt};
use tracing::warn;

use loadsim_core::{HostMetric, ResourceMetric};

/// Cheap, synchronous source of host resource samples.
///
/// One production implementation; tests substitute their own.
pub trait HostProbe: Send {
    /// Warms up any counters that need a baseline reading (CPU usage is
    /// measured as a delta between refreshes).
    fn prime(&mut self) {}

    /// Takes one sample covering the requested metrics, or `None` when
    /// nothing is configured or the read failed.
    fn sample(&mut self, metrics: &[HostMetric]) -> Option<ResourceMetric>;
}

/// Host probe backed by the `sysinfo` crate.
pub struct SysinfoProbe {
    system: System,
}

impl SysinfoProbe {
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HostProbe for SysinfoProbe {
    fn prime(&mut self) {
        self.system.refresh_cpu();
    }

    fn sample(&mut self, metrics: &[HostMetric]) -> Option<ResourceMetric> {
        if metrics.is_empty() {
            return None;
        }

        let mut out = ResourceMetric::at(Utc::now());

        if metrics.contains(&HostMetric::CpuPercent) {
            self.system.refresh_cpu();
            out.cpu_percent = Some(self.system.global_cpu_info().cpu_usage());
        }

        if metrics.contains(&HostMetric::MemoryPercent) {
            self.system.refresh_memory();
            let total = self.system.total_memory();
            if total > 0 {
                out.memory_percent =
                    Some(self.system.used_memory() as f32 / total as f32 * 100.0);
            } else {
                warn!("total memory reported as zero, skipping memory sample");
            }
        }

        if metrics.contains(&HostMetric::DiskIo) {
            // sysinfo exposes disk I/O per process; the cumulative counters
            // are the sum over all live processes.
            self.system.refresh_processes();
            let (mut read, mut written) = (0u64, 0u64);
            for process in self.system.processes().values() {
                let usage = process.disk_usage();
                read = read.saturating_add(usage.total_read_bytes);
                written = written.saturating_add(usage.total_written_bytes);
            }
            out.disk_read_bytes = Some(read);
            out.disk_write_bytes = Some(written);
        }

        Some(out)
    }
}
