//! Optimizer configuration
//!
//! Settings are read once at startup from the environment (prefix
//! `OPTIMIZER_`) and an optional `optimizer` file under the config
//! directory. Any load or deserialization error falls back to the
//! built-in defaults as a whole set, never per key.

use crate::models::UtilizationTier;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Optimizer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OptimizerConfig {
    /// Hosts with at most this much total memory (GiB) are "small"
    #[serde(default = "default_small_memory_max")]
    pub small_memory_max: u64,

    /// Hosts with at least this much total memory (GiB) are "large"
    #[serde(default = "default_large_memory_min")]
    pub large_memory_min: u64,

    /// Target utilization percent for small hosts
    #[serde(default = "default_target_small")]
    pub target_utilization_small: f64,

    /// Target utilization percent for large hosts
    #[serde(default = "default_target_large")]
    pub target_utilization_large: f64,

    /// Rolling history span in days
    #[serde(default = "default_monitor_period_days")]
    pub monitor_period_days: u64,

    /// Seconds between control cycles
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,

    /// Root directory for runtime artifacts
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,

    /// Directory holding the load worker executables
    #[serde(default = "default_worker_dir")]
    pub worker_dir: PathBuf,

    /// Directory for log artifacts written by collaborator tools
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Directory searched for the optional `optimizer` config file
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Restrict disk sampling and load placement to non-system volumes
    #[serde(default = "default_true")]
    pub data_disk_only: bool,

    /// Serve the embedded health/metrics endpoints
    #[serde(default = "default_true")]
    pub monitor_enabled: bool,

    /// Port for the embedded monitor server
    #[serde(default = "default_monitor_port")]
    pub monitor_port: u16,

    /// Advertised refresh interval for monitor consumers, seconds
    #[serde(default = "default_monitor_refresh")]
    pub monitor_refresh_seconds: u64,

    /// Platform selection: "auto", "windows", "linux", or a distro name
    #[serde(default = "default_platform")]
    pub platform: String,

    /// Fixed disk load path; overrides volume auto-selection when usable
    #[serde(default)]
    pub disk_stress_path: Option<PathBuf>,

    /// CPU worker thread count; 0 means all logical cores
    #[serde(default)]
    pub cpu_stress_threads: usize,

    #[serde(default = "default_low_disk_size")]
    pub low_util_disk_size: String,
    #[serde(default = "default_low_duration")]
    pub low_util_duration: u64,
    #[serde(default = "default_med_disk_size")]
    pub med_util_disk_size: String,
    #[serde(default = "default_med_duration")]
    pub med_util_duration: u64,
    #[serde(default = "default_high_disk_size")]
    pub high_util_disk_size: String,
    #[serde(default = "default_high_duration")]
    pub high_util_duration: u64,
}

fn default_small_memory_max() -> u64 {
    8
}

fn default_large_memory_min() -> u64 {
    16
}

fn default_target_small() -> f64 {
    25.0
}

fn default_target_large() -> f64 {
    40.0
}

fn default_monitor_period_days() -> u64 {
    30
}

fn default_check_interval() -> u64 {
    60
}

fn default_workspace_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn default_worker_dir() -> PathBuf {
    // Workers are installed alongside the optimizer binary by default.
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_log_dir() -> PathBuf {
    default_workspace_dir().join("logs")
}

fn default_config_dir() -> PathBuf {
    default_workspace_dir().join("config")
}

fn default_true() -> bool {
    true
}

fn default_monitor_port() -> u16 {
    61208
}

fn default_monitor_refresh() -> u64 {
    2
}

fn default_platform() -> String {
    "auto".to_string()
}

fn default_low_disk_size() -> String {
    "200MB".to_string()
}

fn default_low_duration() -> u64 {
    3600
}

fn default_med_disk_size() -> String {
    "100MB".to_string()
}

fn default_med_duration() -> u64 {
    1800
}

fn default_high_disk_size() -> String {
    "50MB".to_string()
}

fn default_high_duration() -> u64 {
    600
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            small_memory_max: default_small_memory_max(),
            large_memory_min: default_large_memory_min(),
            target_utilization_small: default_target_small(),
            target_utilization_large: default_target_large(),
            monitor_period_days: default_monitor_period_days(),
            check_interval_seconds: default_check_interval(),
            workspace_dir: default_workspace_dir(),
            worker_dir: default_worker_dir(),
            log_dir: default_log_dir(),
            config_dir: default_config_dir(),
            data_disk_only: default_true(),
            monitor_enabled: default_true(),
            monitor_port: default_monitor_port(),
            monitor_refresh_seconds: default_monitor_refresh(),
            platform: default_platform(),
            disk_stress_path: None,
            cpu_stress_threads: 0,
            low_util_disk_size: default_low_disk_size(),
            low_util_duration: default_low_duration(),
            med_util_disk_size: default_med_disk_size(),
            med_util_duration: default_med_duration(),
            high_util_disk_size: default_high_disk_size(),
            high_util_duration: default_high_duration(),
        }
    }
}

impl OptimizerConfig {
    /// Load configuration from the environment and the optional config
    /// file. Falls back to defaults wholesale on any error.
    pub fn load() -> Self {
        let config_dir = std::env::var("OPTIMIZER_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_dir());

        let loaded = config::Config::builder()
            .add_source(config::File::from(config_dir.join("optimizer")).required(false))
            .add_source(config::Environment::with_prefix("OPTIMIZER"))
            .build()
            .and_then(|c| c.try_deserialize::<OptimizerConfig>());

        match loaded {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Failed to load configuration, using built-in defaults");
                Self::default()
            }
        }
    }

    /// Number of samples the rolling history retains.
    pub fn max_samples(&self) -> usize {
        let interval = self.check_interval_seconds.max(1);
        (self.monitor_period_days.saturating_mul(86_400) / interval) as usize
    }

    /// Sleep span between control cycles.
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds.max(1))
    }

    /// Disk load sizing for a utilization tier: (size string, retention seconds).
    pub fn disk_profile(&self, tier: UtilizationTier) -> (&str, u64) {
        match tier {
            UtilizationTier::Low => (&self.low_util_disk_size, self.low_util_duration),
            UtilizationTier::Medium => (&self.med_util_disk_size, self.med_util_duration),
            UtilizationTier::High => (&self.high_util_disk_size, self.high_util_duration),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = OptimizerConfig::default();
        assert_eq!(config.small_memory_max, 8);
        assert_eq!(config.large_memory_min, 16);
        assert_eq!(config.target_utilization_small, 25.0);
        assert_eq!(config.target_utilization_large, 40.0);
        assert_eq!(config.monitor_period_days, 30);
        assert_eq!(config.check_interval_seconds, 60);
        assert!(config.data_disk_only);
        assert!(config.monitor_enabled);
        assert_eq!(config.monitor_port, 61208);
        assert_eq!(config.platform, "auto");
        assert!(config.disk_stress_path.is_none());
    }

    #[test]
    fn max_samples_derivation() {
        let config = OptimizerConfig::default();
        assert_eq!(config.max_samples(), 30 * 86_400 / 60);

        let config = OptimizerConfig {
            monitor_period_days: 1,
            check_interval_seconds: 0,
            ..OptimizerConfig::default()
        };
        assert_eq!(config.max_samples(), 86_400);
    }

    #[test]
    fn disk_profiles_per_tier() {
        let config = OptimizerConfig::default();
        assert_eq!(config.disk_profile(UtilizationTier::Low), ("200MB", 3600));
        assert_eq!(config.disk_profile(UtilizationTier::Medium), ("100MB", 1800));
        assert_eq!(config.disk_profile(UtilizationTier::High), ("50MB", 600));
    }
}
