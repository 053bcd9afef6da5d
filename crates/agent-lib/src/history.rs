//! Rolling utilization history
//!
//! Keeps one bounded FIFO sequence per resource and produces plain
//! trailing averages over them. The window is owned by the controller
//! loop; it starts empty on every process start.

use crate::models::{Metric, Sample};
use std::collections::VecDeque;

/// Bounded rolling window over utilization samples.
///
/// All three sequences share the same bound and are truncated from the
/// front (oldest first) when it is exceeded. Averages weight every
/// retained sample equally; callers rely on that, so no decay or
/// smoothing is applied here.
#[derive(Debug)]
pub struct HistoryWindow {
    cpu: VecDeque<f64>,
    memory: VecDeque<f64>,
    disk: VecDeque<f64>,
    max_samples: usize,
}

impl HistoryWindow {
    /// Create a window retaining at most `max_samples` entries per metric.
    pub fn new(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            cpu: VecDeque::with_capacity(max_samples.min(10_000)),
            memory: VecDeque::with_capacity(max_samples.min(10_000)),
            disk: VecDeque::with_capacity(max_samples.min(10_000)),
            max_samples,
        }
    }

    /// Derive the bound from a monitoring period and check interval.
    pub fn from_period(period_days: u64, interval_seconds: u64) -> Self {
        let interval = interval_seconds.max(1);
        Self::new((period_days.saturating_mul(86_400) / interval) as usize)
    }

    /// Append one sample to all three sequences, evicting the oldest
    /// entries when the bound is exceeded.
    pub fn push(&mut self, sample: &Sample) {
        self.cpu.push_back(sample.cpu_percent);
        self.memory.push_back(sample.memory_percent);
        self.disk.push_back(sample.disk_percent);

        for seq in [&mut self.cpu, &mut self.memory, &mut self.disk] {
            while seq.len() > self.max_samples {
                seq.pop_front();
            }
        }
    }

    /// Arithmetic mean of the retained samples for one metric.
    /// Returns 0 while the window is empty.
    pub fn average(&self, metric: Metric) -> f64 {
        let seq = self.sequence(metric);
        if seq.is_empty() {
            return 0.0;
        }
        seq.iter().sum::<f64>() / seq.len() as f64
    }

    /// All three averages packed as a [`Sample`] for cycle reporting.
    pub fn averages(&self) -> Sample {
        Sample {
            cpu_percent: self.average(Metric::Cpu),
            memory_percent: self.average(Metric::Memory),
            disk_percent: self.average(Metric::Disk),
        }
    }

    pub fn len(&self) -> usize {
        self.cpu.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpu.is_empty()
    }

    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    fn sequence(&self, metric: Metric) -> &VecDeque<f64> {
        match metric {
            Metric::Cpu => &self.cpu,
            Metric::Memory => &self.memory,
            Metric::Disk => &self.disk,
        }
    }
}
