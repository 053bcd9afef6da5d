//! HTTP API for health checks and Prometheus metrics
//!
//! The embedded monitor server. Started only when `monitor_enabled` is
//! set; stopped via the shared shutdown signal with a bounded wait.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use optimizer_lib::health::{ComponentStatus, HealthRegistry};
use optimizer_lib::observability::OptimizerMetrics;
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// Static facts about this optimizer instance, shown on the index page.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorInfo {
    pub version: String,
    pub host: String,
    pub platform: String,
    pub capacity_class: String,
    pub target_percent: f64,
    pub refresh_seconds: u64,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: OptimizerMetrics,
    pub info: MonitorInfo,
}

impl AppState {
    pub fn new(health_registry: HealthRegistry, metrics: OptimizerMetrics, info: MonitorInfo) -> Self {
        Self {
            health_registry,
            metrics,
            info,
        }
    }
}

/// Instance summary for dashboard consumers
async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.info.clone())
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).unwrap();

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the monitor server; runs until the shutdown signal fires.
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting monitor server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    Ok(())
}
