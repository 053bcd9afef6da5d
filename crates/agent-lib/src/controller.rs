//! Controller loop
//!
//! One cycle: sample → update history → compare rolling averages to the
//! target → dispatch load for deficient resources → sleep. The loop is
//! single-threaded and cooperative; a stop signal is honored only at the
//! cycle boundary, so an in-flight cycle always runs to completion.
//! Internal errors never terminate the loop.

use crate::config::OptimizerConfig;
use crate::dispatch::LoadDispatcher;
use crate::health::{components, HealthRegistry};
use crate::history::HistoryWindow;
use crate::models::WorkerHandle;
use crate::observability::{OptimizerMetrics, StructuredLogger};
use crate::sampler::UtilizationSampler;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{debug, info};

/// Phase the controller is currently in. Purely informational; exposed
/// through logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Sampling,
    Evaluating,
    Dispatching,
    Sleeping,
    Stopped,
}

pub struct ControllerLoop {
    sampler: Box<dyn UtilizationSampler>,
    dispatcher: LoadDispatcher,
    history: HistoryWindow,
    config: OptimizerConfig,
    metrics: OptimizerMetrics,
    logger: StructuredLogger,
    health: HealthRegistry,
    state: LoopState,
    cycle_count: u64,
}

impl ControllerLoop {
    pub fn new(
        sampler: Box<dyn UtilizationSampler>,
        dispatcher: LoadDispatcher,
        config: OptimizerConfig,
        logger: StructuredLogger,
        health: HealthRegistry,
    ) -> Self {
        let history = HistoryWindow::new(config.max_samples());
        Self {
            sampler,
            dispatcher,
            history,
            config,
            metrics: OptimizerMetrics::new(),
            logger,
            health,
            state: LoopState::Idle,
            cycle_count: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn history(&self) -> &HistoryWindow {
        &self.history
    }

    /// Run until a stop signal arrives. The signal is checked only
    /// between cycles, so worst-case shutdown latency is one sleep
    /// interval plus one cycle's work.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.check_interval_seconds,
            max_samples = self.history.max_samples(),
            "Starting controller loop"
        );

        loop {
            self.run_cycle().await;

            self.state = LoopState::Sleeping;
            tokio::select! {
                _ = sleep(self.config.check_interval()) => {}
                _ = shutdown.recv() => {
                    break;
                }
            }
        }

        self.state = LoopState::Stopped;
        info!(cycles = self.cycle_count, "Controller loop stopped");
    }

    /// Execute one control cycle and return the workers spawned by it.
    pub async fn run_cycle(&mut self) -> Vec<WorkerHandle> {
        self.state = LoopState::Sampling;
        let current = self.sampler.sample().await;
        self.history.push(&current);

        self.state = LoopState::Evaluating;
        let average = self.history.averages();
        self.logger.log_cycle_report(&current, &average);
        self.metrics.set_utilization(&current, &average);

        let memory = self.sampler.memory();
        let volumes = self.sampler.volumes();
        if volumes.is_empty() {
            self.metrics.inc_sample_warnings();
            self.health
                .set_degraded(components::SAMPLER, "no eligible volumes")
                .await;
        } else {
            self.health.set_healthy(components::SAMPLER).await;
        }

        self.state = LoopState::Dispatching;
        let mut spawned = Vec::new();
        for handle in [
            self.dispatcher.adjust_memory(average.memory_percent, memory),
            self.dispatcher.adjust_cpu(average.cpu_percent),
            self.dispatcher.adjust_disk(average.disk_percent, &volumes),
        ]
        .into_iter()
        .flatten()
        {
            self.logger.log_worker_spawned(&handle);
            spawned.push(handle);
        }

        self.cycle_count += 1;
        self.metrics.inc_cycles_completed();
        debug!(
            cycle = self.cycle_count,
            spawned = spawned.len(),
            history_len = self.history.len(),
            "Cycle complete"
        );
        spawned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MemoryStat, Sample, VolumeCandidate};
    use crate::platform::{LinuxDistro, Platform};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::time::Duration;

    struct FixedSampler {
        sample: Sample,
        memory: MemoryStat,
        volumes: Vec<VolumeCandidate>,
    }

    #[async_trait]
    impl UtilizationSampler for FixedSampler {
        async fn sample(&mut self) -> Sample {
            self.sample
        }

        fn memory(&self) -> MemoryStat {
            self.memory
        }

        fn volumes(&self) -> Vec<VolumeCandidate> {
            self.volumes.clone()
        }
    }

    fn test_config() -> OptimizerConfig {
        OptimizerConfig {
            check_interval_seconds: 1,
            // No worker executables exist here; spawns fail gracefully.
            worker_dir: PathBuf::from("/nonexistent/workers"),
            ..OptimizerConfig::default()
        }
    }

    fn controller(sample: Sample) -> ControllerLoop {
        let config = test_config();
        let dispatcher = LoadDispatcher::new(
            config.clone(),
            Platform::Linux(LinuxDistro::Generic),
            25.0,
        );
        let sampler = FixedSampler {
            sample,
            memory: MemoryStat {
                total_bytes: 16 * 1024 * 1024 * 1024,
                used_bytes: 8 * 1024 * 1024 * 1024,
            },
            volumes: Vec::new(),
        };
        ControllerLoop::new(
            Box::new(sampler),
            dispatcher,
            config,
            StructuredLogger::new("test-host"),
            HealthRegistry::new(),
        )
    }

    #[tokio::test]
    async fn cycle_updates_history_and_never_panics() {
        let mut loop_instance = controller(Sample {
            cpu_percent: 10.0,
            memory_percent: 10.0,
            disk_percent: 10.0,
        });

        let spawned = loop_instance.run_cycle().await;
        assert_eq!(loop_instance.history().len(), 1);
        // All three resources are deficient, but no worker executables
        // exist, so every dispatch fails without aborting the cycle.
        assert!(spawned.is_empty());

        loop_instance.run_cycle().await;
        assert_eq!(loop_instance.history().len(), 2);
    }

    #[tokio::test]
    async fn saturated_host_dispatches_nothing() {
        let mut loop_instance = controller(Sample {
            cpu_percent: 90.0,
            memory_percent: 90.0,
            disk_percent: 90.0,
        });

        let spawned = loop_instance.run_cycle().await;
        assert!(spawned.is_empty());
    }

    #[tokio::test]
    async fn empty_volume_set_degrades_sampler_health() {
        let mut loop_instance = controller(Sample {
            cpu_percent: 90.0,
            memory_percent: 90.0,
            disk_percent: 90.0,
        });
        loop_instance.run_cycle().await;

        let health = loop_instance.health.health().await;
        let sampler = health.components.get(components::SAMPLER).unwrap();
        assert_eq!(sampler.status, crate::health::ComponentStatus::Degraded);
    }

    #[tokio::test]
    async fn stop_signal_breaks_the_loop_at_cycle_boundary() {
        let loop_instance = controller(Sample {
            cpu_percent: 90.0,
            memory_percent: 90.0,
            disk_percent: 90.0,
        });

        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(loop_instance.run(rx));
        tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("loop did not stop after the signal")
            .unwrap();
    }
}
