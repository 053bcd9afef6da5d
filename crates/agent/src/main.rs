//! Resource Optimizer - host utilization controller
//!
//! This binary samples CPU, memory, and disk utilization, compares the
//! rolling averages against a capacity-derived target, and launches
//! bounded synthetic load workers for resources running under target.

use anyhow::Result;
use optimizer_lib::{
    classify::classify,
    config::OptimizerConfig,
    controller::ControllerLoop,
    dispatch::LoadDispatcher,
    health::{components, HealthRegistry},
    observability::{OptimizerMetrics, StructuredLogger},
    platform::Platform,
    sampler::{self, SysinfoSampler},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;

const OPTIMIZER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Bounded wait for the monitor server after the stop signal.
const MONITOR_STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting resource-optimizer");

    // Load configuration (falls back to defaults wholesale on error)
    let config = OptimizerConfig::load();
    let platform = Platform::detect(&config.platform);
    info!(
        workspace_dir = %config.workspace_dir.display(),
        worker_dir = %config.worker_dir.display(),
        check_interval_seconds = config.check_interval_seconds,
        monitor_period_days = config.monitor_period_days,
        data_disk_only = config.data_disk_only,
        platform = platform.label(),
        "Optimizer configured"
    );

    // Classify the host and derive the utilization target
    let total_memory_gb = sampler::total_memory_gb();
    let (class, target_percent) = classify(total_memory_gb, &config);

    let metrics = OptimizerMetrics::new();
    metrics.set_capacity_class(class, target_percent);

    let host = sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string());
    let logger = StructuredLogger::new(&host);
    logger.log_startup(
        OPTIMIZER_VERSION,
        platform.label(),
        class,
        target_percent,
        total_memory_gb,
    );

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::SAMPLER).await;
    health_registry.register(components::DISPATCHER).await;
    health_registry.register(components::MONITOR).await;
    health_registry.set_ready(true).await;

    let (shutdown_tx, _) = broadcast::channel(1);

    // Start the embedded monitor server when enabled
    let monitor_handle = if config.monitor_enabled {
        let info = api::MonitorInfo {
            version: OPTIMIZER_VERSION.to_string(),
            host: host.clone(),
            platform: platform.label().to_string(),
            capacity_class: class.to_string(),
            target_percent,
            refresh_seconds: config.monitor_refresh_seconds,
        };
        let state = Arc::new(api::AppState::new(
            health_registry.clone(),
            metrics.clone(),
            info,
        ));
        Some(tokio::spawn(api::serve(
            config.monitor_port,
            state,
            shutdown_tx.subscribe(),
        )))
    } else {
        None
    };

    // Assemble and start the controller loop
    let sampler = SysinfoSampler::new(platform, config.data_disk_only);
    let dispatcher = LoadDispatcher::new(config.clone(), platform, target_percent);
    let controller = ControllerLoop::new(
        Box::new(sampler),
        dispatcher,
        config,
        logger.clone(),
        health_registry.clone(),
    );
    let controller_handle = tokio::spawn(controller.run(shutdown_tx.subscribe()));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    let _ = shutdown_tx.send(());

    // The loop finishes its in-flight cycle before stopping.
    let _ = controller_handle.await;

    // Ask the monitor to stop; bounded wait, then abandon it.
    if let Some(mut handle) = monitor_handle {
        match tokio::time::timeout(MONITOR_STOP_TIMEOUT, &mut handle).await {
            Ok(_) => logger.log_monitor_stopped(true),
            Err(_) => {
                handle.abort();
                logger.log_monitor_stopped(false);
            }
        }
    }

    info!("Shutting down");

    Ok(())
}
