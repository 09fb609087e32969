use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Default number of samples retained (one minute at the default interval).
pub const MAX_HISTORY: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSample {
    /// Unix time in milliseconds.
    pub timestamp: i64,
    pub cpu: f64,
    pub memory: f64,
}

/// Point-in-time copy of the history handed to readers. The three series
/// always have the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsHistory {
    pub cpu: Vec<f64>,
    pub memory: Vec<f64>,
    pub timestamps: Vec<i64>,
}

impl MetricsHistory {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Fixed-capacity FIFO of samples stored as three parallel series.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    capacity: usize,
    cpu: VecDeque<f64>,
    memory: VecDeque<f64>,
    timestamps: VecDeque<i64>,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            cpu: VecDeque::with_capacity(capacity + 1),
            memory: VecDeque::with_capacity(capacity + 1),
            timestamps: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Append a sample, evicting the oldest one once over capacity.
    pub fn push(&mut self, sample: MetricsSample) {
        self.cpu.push_back(sample.cpu);
        self.memory.push_back(sample.memory);
        self.timestamps.push_back(sample.timestamp);

        if self.timestamps.len() > self.capacity {
            self.cpu.pop_front();
            self.memory.pop_front();
            self.timestamps.pop_front();
        }
    }

    pub fn snapshot(&self) -> MetricsHistory {
        MetricsHistory {
            cpu: self.cpu.iter().copied().collect(),
            memory: self.memory.iter().copied().collect(),
            timestamps: self.timestamps.iter().copied().collect(),
        }
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}
