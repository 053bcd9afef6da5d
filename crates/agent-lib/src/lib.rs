//! Core library for the cloud resource optimizer
//!
//! This crate provides the building blocks for the optimizer daemon:
//! - Single-shot utilization sampling (CPU / memory / disk)
//! - Rolling utilization history with bounded retention
//! - Capacity classification and target selection
//! - Data-volume selection for disk load placement
//! - Dispatch of detached synthetic load workers
//! - The controller loop tying the above together

pub mod classify;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod health;
pub mod history;
pub mod models;
pub mod observability;
pub mod platform;
pub mod sampler;
pub mod volume;

pub use classify::classify;
pub use config::OptimizerConfig;
pub use controller::{ControllerLoop, LoopState};
pub use dispatch::LoadDispatcher;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use history::HistoryWindow;
pub use models::*;
pub use observability::{OptimizerMetrics, StructuredLogger};
pub use platform::{LinuxDistro, Platform};
pub use sampler::{SysinfoSampler, UtilizationSampler};
