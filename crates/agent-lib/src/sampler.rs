//! Single-shot utilization sampling
//!
//! One sample per control cycle: CPU, memory, and the unweighted mean
//! utilization over eligible disk volumes. Per-volume read problems are
//! excluded from the disk average rather than failing the sample; a
//! sample never errors.

use crate::models::{MemoryStat, Sample, VolumeCandidate};
use crate::platform::Platform;
use async_trait::async_trait;
use sysinfo::{
    CpuRefreshKind, Disks, MemoryRefreshKind, RefreshKind, System, MINIMUM_CPU_UPDATE_INTERVAL,
};
use tracing::warn;

/// Filesystem kinds that never count toward disk utilization.
const PSEUDO_FILESYSTEMS: &[&str] = &[
    "", "sysfs", "proc", "devtmpfs", "tmpfs", "devpts", "cgroup", "cgroup2", "pstore", "squashfs",
    "overlay",
];

/// Source of utilization samples for the controller loop.
#[async_trait]
pub trait UtilizationSampler: Send {
    /// Take one measurement. Blocks for at least the platform's minimum
    /// CPU measurement interval so the CPU figure is meaningful.
    async fn sample(&mut self) -> Sample;

    /// Memory totals as of the last `sample` call.
    fn memory(&self) -> MemoryStat;

    /// Volumes eligible for disk load placement as of the last `sample`
    /// call. Rebuilt on every sample; callers must not cache it.
    fn volumes(&self) -> Vec<VolumeCandidate>;
}

/// sysinfo-backed sampler.
///
/// Keeps one `System` and one `Disks` instance alive across cycles so
/// consecutive CPU refreshes have a stable baseline.
pub struct SysinfoSampler {
    sys: System,
    disks: Disks,
    platform: Platform,
    data_disk_only: bool,
}

impl SysinfoSampler {
    pub fn new(platform: Platform, data_disk_only: bool) -> Self {
        let mut sys = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::everything())
                .with_memory(MemoryRefreshKind::everything()),
        );
        // Prime the CPU baseline so the first real sample is not zero.
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let disks = Disks::new_with_refreshed_list();

        Self {
            sys,
            disks,
            platform,
            data_disk_only,
        }
    }

    fn eligible_volume(&self, kind: &str, mount_point: &std::path::Path) -> bool {
        if PSEUDO_FILESYSTEMS.contains(&kind) {
            return false;
        }
        if self.data_disk_only && self.platform.is_system_volume(mount_point) {
            return false;
        }
        true
    }

    fn disk_percent(&self) -> f64 {
        let mut sum = 0.0;
        let mut count = 0u32;

        for disk in self.disks.list() {
            let kind = disk.file_system().to_string_lossy().to_ascii_lowercase();
            if !self.eligible_volume(&kind, disk.mount_point()) {
                continue;
            }
            let total = disk.total_space();
            if total == 0 {
                continue;
            }
            let used = total.saturating_sub(disk.available_space());
            sum += used as f64 / total as f64 * 100.0;
            count += 1;
        }

        if count == 0 {
            warn!("No eligible volumes found, reporting disk utilization as 0");
            return 0.0;
        }
        sum / f64::from(count)
    }
}

#[async_trait]
impl UtilizationSampler for SysinfoSampler {
    async fn sample(&mut self) -> Sample {
        // Two CPU refreshes at least MINIMUM_CPU_UPDATE_INTERVAL apart,
        // with a 1s floor so a single spike doesn't dominate the figure.
        self.sys.refresh_cpu_usage();
        tokio::time::sleep(MINIMUM_CPU_UPDATE_INTERVAL.max(std::time::Duration::from_secs(1)))
            .await;
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();

        self.disks.refresh();
        if self.disks.list().is_empty() {
            self.disks.refresh_list();
        }

        let cpu_percent = f64::from(self.sys.global_cpu_usage()).clamp(0.0, 100.0);

        let total = self.sys.total_memory();
        let memory_percent = if total > 0 {
            self.sys.used_memory() as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Sample {
            cpu_percent,
            memory_percent,
            disk_percent: self.disk_percent(),
        }
    }

    fn memory(&self) -> MemoryStat {
        MemoryStat {
            total_bytes: self.sys.total_memory(),
            used_bytes: self.sys.used_memory(),
        }
    }

    fn volumes(&self) -> Vec<VolumeCandidate> {
        self.disks
            .list()
            .iter()
            .filter_map(|disk| {
                let kind = disk.file_system().to_string_lossy().to_ascii_lowercase();
                if PSEUDO_FILESYSTEMS.contains(&kind.as_str()) {
                    return None;
                }
                Some(VolumeCandidate {
                    mount_point: disk.mount_point().to_path_buf(),
                    total_bytes: disk.total_space(),
                    free_bytes: disk.available_space(),
                    filesystem_kind: kind,
                })
            })
            .collect()
    }
}

/// Total system memory in GiB, for capacity classification at startup.
pub fn total_memory_gb() -> f64 {
    let mut sys =
        System::new_with_specifics(RefreshKind::new().with_memory(MemoryRefreshKind::everything()));
    sys.refresh_memory();
    sys.total_memory() as f64 / (1024.0 * 1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::LinuxDistro;

    #[test]
    fn pseudo_filesystems_are_ineligible() {
        let sampler = SysinfoSampler::new(Platform::Linux(LinuxDistro::Generic), true);
        for kind in ["proc", "sysfs", "tmpfs", "cgroup", "pstore", ""] {
            assert!(!sampler.eligible_volume(kind, std::path::Path::new("/data")), "{kind}");
        }
        assert!(sampler.eligible_volume("ext4", std::path::Path::new("/data")));
        assert!(sampler.eligible_volume("xfs", std::path::Path::new("/mnt/vol1")));
    }

    #[test]
    fn system_volumes_excluded_only_when_data_disk_only() {
        let restricted = SysinfoSampler::new(Platform::Linux(LinuxDistro::Generic), true);
        assert!(!restricted.eligible_volume("ext4", std::path::Path::new("/")));

        let unrestricted = SysinfoSampler::new(Platform::Linux(LinuxDistro::Generic), false);
        assert!(unrestricted.eligible_volume("ext4", std::path::Path::new("/")));
    }

    #[tokio::test]
    async fn sample_yields_finite_percentages() {
        let mut sampler = SysinfoSampler::new(Platform::detect("auto"), true);
        let sample = sampler.sample().await;
        assert!(sample.cpu_percent.is_finite());
        assert!((0.0..=100.0).contains(&sample.cpu_percent));
        assert!((0.0..=100.0).contains(&sample.memory_percent));
        assert!((0.0..=100.0).contains(&sample.disk_percent));
    }

    #[test]
    fn total_memory_is_positive() {
        assert!(total_memory_gb() > 0.0);
    }
}
