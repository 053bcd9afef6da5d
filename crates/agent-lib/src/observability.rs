//! Observability infrastructure for the optimizer
//!
//! Provides:
//! - Prometheus metrics (utilization gauges, cycle and worker counters)
//! - Structured JSON logging with tracing

use crate::models::{CapacityClass, Sample, WorkerHandle, WorkerKind};
use prometheus::{
    register_gauge, register_gauge_vec, register_int_gauge, register_int_gauge_vec, Gauge,
    GaugeVec, IntGauge, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<OptimizerMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct OptimizerMetricsInner {
    utilization_percent: GaugeVec,
    target_utilization_percent: Gauge,
    capacity_class_info: GaugeVec,
    cycles_completed: IntGauge,
    workers_spawned: IntGaugeVec,
    dispatch_errors: IntGauge,
    sample_warnings: IntGauge,
}

impl OptimizerMetricsInner {
    fn new() -> Self {
        Self {
            utilization_percent: register_gauge_vec!(
                "optimizer_utilization_percent",
                "Host utilization percentage per resource",
                &["resource", "stat"]
            )
            .expect("Failed to register utilization_percent"),

            target_utilization_percent: register_gauge!(
                "optimizer_target_utilization_percent",
                "Utilization target the controller steers toward"
            )
            .expect("Failed to register target_utilization_percent"),

            capacity_class_info: register_gauge_vec!(
                "optimizer_capacity_class_info",
                "Capacity class derived from total memory",
                &["class"]
            )
            .expect("Failed to register capacity_class_info"),

            cycles_completed: register_int_gauge!(
                "optimizer_cycles_completed_total",
                "Number of completed control cycles"
            )
            .expect("Failed to register cycles_completed_total"),

            workers_spawned: register_int_gauge_vec!(
                "optimizer_workers_spawned_total",
                "Load workers spawned per resource kind",
                &["kind"]
            )
            .expect("Failed to register workers_spawned_total"),

            dispatch_errors: register_int_gauge!(
                "optimizer_dispatch_errors_total",
                "Load worker spawn failures"
            )
            .expect("Failed to register dispatch_errors_total"),

            sample_warnings: register_int_gauge!(
                "optimizer_sample_warnings_total",
                "Sampling degradations such as zero eligible volumes"
            )
            .expect("Failed to register sample_warnings_total"),
        }
    }
}

/// Optimizer metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct OptimizerMetrics {
    _private: (),
}

impl Default for OptimizerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl OptimizerMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(OptimizerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &OptimizerMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record current and rolling-average utilization for one cycle.
    pub fn set_utilization(&self, current: &Sample, average: &Sample) {
        let m = &self.inner().utilization_percent;
        m.with_label_values(&["cpu", "current"]).set(current.cpu_percent);
        m.with_label_values(&["memory", "current"])
            .set(current.memory_percent);
        m.with_label_values(&["disk", "current"]).set(current.disk_percent);
        m.with_label_values(&["cpu", "average"]).set(average.cpu_percent);
        m.with_label_values(&["memory", "average"])
            .set(average.memory_percent);
        m.with_label_values(&["disk", "average"]).set(average.disk_percent);
    }

    /// Record the capacity class and target chosen at startup.
    pub fn set_capacity_class(&self, class: CapacityClass, target_percent: f64) {
        self.inner().capacity_class_info.reset();
        self.inner()
            .capacity_class_info
            .with_label_values(&[class.to_string().as_str()])
            .set(1.0);
        self.inner().target_utilization_percent.set(target_percent);
    }

    pub fn inc_cycles_completed(&self) {
        self.inner().cycles_completed.inc();
    }

    pub fn inc_workers_spawned(&self, kind: WorkerKind) {
        self.inner()
            .workers_spawned
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    pub fn inc_dispatch_errors(&self) {
        self.inner().dispatch_errors.inc();
    }

    pub fn inc_sample_warnings(&self) {
        self.inner().sample_warnings.inc();
    }
}

/// Structured logger for optimizer events
///
/// Provides consistent JSON-formatted logging for cycle reports and
/// worker lifecycle events.
#[derive(Clone)]
pub struct StructuredLogger {
    host: String,
}

impl StructuredLogger {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    /// Log controller startup with the classification outcome.
    pub fn log_startup(
        &self,
        version: &str,
        platform: &str,
        class: CapacityClass,
        target_percent: f64,
        total_memory_gb: f64,
    ) {
        info!(
            event = "optimizer_started",
            host = %self.host,
            version = %version,
            platform = %platform,
            capacity_class = %class,
            target_percent = target_percent,
            total_memory_gb = total_memory_gb,
            "Resource optimizer started"
        );
    }

    /// One line per cycle, before any dispatch decision.
    pub fn log_cycle_report(&self, current: &Sample, average: &Sample) {
        info!(
            event = "cycle_report",
            host = %self.host,
            cpu_percent = current.cpu_percent,
            cpu_average = average.cpu_percent,
            memory_percent = current.memory_percent,
            memory_average = average.memory_percent,
            disk_percent = current.disk_percent,
            disk_average = average.disk_percent,
            "Utilization report"
        );
    }

    /// Log a successful worker spawn.
    pub fn log_worker_spawned(&self, handle: &WorkerHandle) {
        info!(
            event = "worker_spawned",
            host = %self.host,
            kind = %handle.kind,
            pid = ?handle.pid,
            spawned_at = %handle.spawned_at,
            "Launched load worker"
        );
    }

    /// Log a dispatch failure; the cycle continues regardless.
    pub fn log_dispatch_failure(&self, kind: WorkerKind, detail: &str) {
        error!(
            event = "dispatch_failed",
            host = %self.host,
            kind = %kind,
            detail = %detail,
            "Load worker dispatch failed"
        );
    }

    /// Log monitor server shutdown outcome.
    pub fn log_monitor_stopped(&self, graceful: bool) {
        if graceful {
            info!(
                event = "monitor_stopped",
                host = %self.host,
                "Monitor server stopped"
            );
        } else {
            warn!(
                event = "monitor_stopped",
                host = %self.host,
                "Monitor server did not stop in time, abandoning it"
            );
        }
    }

    /// Log controller shutdown.
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "optimizer_shutdown",
            host = %self.host,
            reason = %reason,
            "Resource optimizer shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_handle_records_without_panicking() {
        let metrics = OptimizerMetrics::new();
        let sample = Sample {
            cpu_percent: 10.0,
            memory_percent: 20.0,
            disk_percent: 30.0,
        };
        metrics.set_utilization(&sample, &sample);
        metrics.set_capacity_class(CapacityClass::Small, 25.0);
        metrics.inc_cycles_completed();
        metrics.inc_workers_spawned(WorkerKind::Cpu);
        metrics.inc_dispatch_errors();
        metrics.inc_sample_warnings();
    }

    #[test]
    fn structured_logger_creation() {
        let logger = StructuredLogger::new("test-host");
        assert_eq!(logger.host, "test-host");
    }
}
