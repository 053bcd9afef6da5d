//! Host capacity classification
//!
//! Maps total memory to a capacity class and the utilization target the
//! controller steers toward. Pure and deterministic; thresholds come
//! from configuration.

use crate::config::OptimizerConfig;
use crate::models::CapacityClass;

/// Classify a host by total memory (GiB) and return its utilization target.
///
/// `total ≤ small_memory_max` is small, `total ≥ large_memory_min` is
/// large. Hosts strictly between the two thresholds are treated as small.
pub fn classify(total_memory_gb: f64, config: &OptimizerConfig) -> (CapacityClass, f64) {
    let class = if total_memory_gb <= config.small_memory_max as f64 {
        CapacityClass::Small
    } else if total_memory_gb >= config.large_memory_min as f64 {
        CapacityClass::Large
    } else {
        CapacityClass::Small
    };

    let target = match class {
        CapacityClass::Small => config.target_utilization_small,
        CapacityClass::Large => config.target_utilization_large,
    };

    (class, target)
}
