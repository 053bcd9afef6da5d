//! Core data models for the resource optimizer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One utilization measurement across all tracked resources, captured at a
/// single instant. Percentages are in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
}

/// Resource dimensions tracked by the rolling history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cpu,
    Memory,
    Disk,
}

/// Host capacity class derived from total memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityClass {
    Small,
    Large,
}

impl std::fmt::Display for CapacityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapacityClass::Small => f.write_str("small"),
            CapacityClass::Large => f.write_str("large"),
        }
    }
}

/// Disk utilization tier driving synthetic file size and retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UtilizationTier {
    Low,
    Medium,
    High,
}

impl UtilizationTier {
    /// Bucket the current average disk utilization. Exact 30% falls into
    /// `Medium` and exact 60% into `High` (strict `<` comparisons).
    pub fn from_disk_average(average_percent: f64) -> Self {
        if average_percent < 30.0 {
            UtilizationTier::Low
        } else if average_percent < 60.0 {
            UtilizationTier::Medium
        } else {
            UtilizationTier::High
        }
    }
}

impl std::fmt::Display for UtilizationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UtilizationTier::Low => f.write_str("low"),
            UtilizationTier::Medium => f.write_str("medium"),
            UtilizationTier::High => f.write_str("high"),
        }
    }
}

/// A mounted storage volume considered for disk load placement.
/// Enumerated fresh each cycle; never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeCandidate {
    pub mount_point: PathBuf,
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub filesystem_kind: String,
}

/// Total and used system memory at one instant, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStat {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

/// Kind of synthetic load worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerKind {
    Cpu,
    Memory,
    Disk,
}

impl WorkerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerKind::Cpu => "cpu",
            WorkerKind::Memory => "memory",
            WorkerKind::Disk => "disk",
        }
    }
}

impl std::fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle for a spawned load worker.
///
/// Workers run fully detached; the controller never joins or supervises
/// them. The handle exists so a future supervisor could track spawns
/// without changing the dispatcher interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerHandle {
    pub kind: WorkerKind,
    pub pid: Option<u32>,
    pub spawned_at: DateTime<Utc>,
}

impl WorkerHandle {
    pub fn new(kind: WorkerKind, pid: Option<u32>) -> Self {
        Self {
            kind,
            pid,
            spawned_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_buckets_follow_strict_bounds() {
        assert_eq!(UtilizationTier::from_disk_average(0.0), UtilizationTier::Low);
        assert_eq!(UtilizationTier::from_disk_average(25.0), UtilizationTier::Low);
        assert_eq!(
            UtilizationTier::from_disk_average(45.0),
            UtilizationTier::Medium
        );
        assert_eq!(
            UtilizationTier::from_disk_average(75.0),
            UtilizationTier::High
        );
    }

    #[test]
    fn tier_boundaries_resolve_upward() {
        // 30% is no longer "low" and 60% is no longer "medium".
        assert_eq!(
            UtilizationTier::from_disk_average(30.0),
            UtilizationTier::Medium
        );
        assert_eq!(
            UtilizationTier::from_disk_average(60.0),
            UtilizationTier::High
        );
    }

    #[test]
    fn worker_kind_labels() {
        assert_eq!(WorkerKind::Cpu.as_str(), "cpu");
        assert_eq!(WorkerKind::Memory.to_string(), "memory");
        assert_eq!(WorkerKind::Disk.to_string(), "disk");
    }
}
