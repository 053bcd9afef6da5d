//! Synthetic load dispatch
//!
//! Launches one detached worker process per deficient resource and
//! cycle. Workers are fire-and-forget: the dispatcher never waits on or
//! supervises them, and a spawn failure only costs this cycle's nudge.
//! Repeated deficient cycles may stack additional workers; earlier ones
//! self-terminate or are reaped by the recovery tool.

use crate::config::OptimizerConfig;
use crate::models::{MemoryStat, UtilizationTier, VolumeCandidate, WorkerHandle, WorkerKind};
use crate::observability::OptimizerMetrics;
use crate::platform::Platform;
use crate::volume;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, info};

/// Largest memory increment a single cycle may request, in MB.
const MAX_MEMORY_STEP_MB: u64 = 1024;

/// Ceiling on the memory usage the controller will steer toward.
const MEMORY_USAGE_CEILING_PERCENT: f64 = 90.0;

pub struct LoadDispatcher {
    config: OptimizerConfig,
    platform: Platform,
    target_percent: f64,
    metrics: OptimizerMetrics,
}

impl LoadDispatcher {
    pub fn new(config: OptimizerConfig, platform: Platform, target_percent: f64) -> Self {
        Self {
            config,
            platform,
            target_percent,
            metrics: OptimizerMetrics::new(),
        }
    }

    /// Hold additional memory when the rolling average is under target.
    /// There is no release path here: freeing memory is the recovery
    /// tool's job.
    pub fn adjust_memory(&self, average_percent: f64, memory: MemoryStat) -> Option<WorkerHandle> {
        if average_percent >= self.target_percent {
            return None;
        }
        let increment_mb = memory_increment_mb(memory, self.target_percent)?;
        info!(
            average_percent = average_percent,
            increment_mb = increment_mb,
            "Memory below target, holding additional memory"
        );
        self.spawn(WorkerKind::Memory, "memory-stress", &memory_args(increment_mb))
    }

    /// Launch a CPU-saturating worker when the rolling average is under
    /// target. Binary on/off per cycle; no sizing.
    pub fn adjust_cpu(&self, average_percent: f64) -> Option<WorkerHandle> {
        if average_percent >= self.target_percent {
            return None;
        }
        info!(
            average_percent = average_percent,
            "CPU below target, launching CPU load worker"
        );
        self.spawn(
            WorkerKind::Cpu,
            "cpu-stress",
            &cpu_args(self.config.cpu_stress_threads),
        )
    }

    /// Place a bounded temp file on a data volume when the rolling
    /// average is under target. File size and retention follow the
    /// utilization tier of the current average.
    pub fn adjust_disk(
        &self,
        average_percent: f64,
        volumes: &[VolumeCandidate],
    ) -> Option<WorkerHandle> {
        if average_percent >= self.target_percent {
            return None;
        }

        let Some(path) = volume::select_target_volume(
            self.config.disk_stress_path.as_deref(),
            volumes,
            &self.platform,
            self.config.data_disk_only,
        ) else {
            debug!("No usable data volume, skipping disk load this cycle");
            return None;
        };

        let tier = UtilizationTier::from_disk_average(average_percent);
        let (size, duration) = self.config.disk_profile(tier);
        info!(
            path = %path.display(),
            size = size,
            duration_seconds = duration,
            tier = %tier,
            "Disk below target, creating temp load file"
        );
        self.spawn(WorkerKind::Disk, "disk-stress", &disk_args(&path, size, duration))
    }

    fn worker_path(&self, base: &str) -> PathBuf {
        self.config
            .worker_dir
            .join(self.platform.executable_name(base))
    }

    fn spawn(&self, kind: WorkerKind, base: &str, args: &[String]) -> Option<WorkerHandle> {
        let executable = self.worker_path(base);
        match Command::new(&executable)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => {
                let pid = child.id();
                info!(kind = %kind, pid = ?pid, "Spawned load worker");
                self.metrics.inc_workers_spawned(kind);
                Some(WorkerHandle::new(kind, pid))
            }
            Err(e) => {
                error!(
                    kind = %kind,
                    executable = %executable.display(),
                    error = %e,
                    "Failed to spawn load worker"
                );
                self.metrics.inc_dispatch_errors();
                None
            }
        }
    }
}

/// Memory to request this cycle, in whole MB.
///
/// Steers toward `min(target + 5, 90)` percent of total memory, capped
/// at one 1 GiB step per cycle. `None` when usage is already there.
pub fn memory_increment_mb(memory: MemoryStat, target_percent: f64) -> Option<u64> {
    let required_percent = (target_percent + 5.0).min(MEMORY_USAGE_CEILING_PERCENT);
    let required_used = memory.total_bytes as f64 * required_percent / 100.0;
    let deficit = required_used - memory.used_bytes as f64;
    if deficit <= 0.0 {
        return None;
    }

    let increment_mb = ((deficit / (1024.0 * 1024.0)) as u64).min(MAX_MEMORY_STEP_MB);
    if increment_mb == 0 {
        return None;
    }
    Some(increment_mb)
}

fn memory_args(increment_mb: u64) -> Vec<String> {
    vec![format!("{increment_mb}MB")]
}

fn cpu_args(threads: usize) -> Vec<String> {
    if threads > 0 {
        vec!["--threads".to_string(), threads.to_string()]
    } else {
        Vec::new()
    }
}

fn disk_args(path: &Path, size: &str, duration_seconds: u64) -> Vec<String> {
    vec![
        "--path".to_string(),
        path.display().to_string(),
        "--size".to_string(),
        size.to_string(),
        "--duration".to_string(),
        duration_seconds.to_string(),
    ]
}
