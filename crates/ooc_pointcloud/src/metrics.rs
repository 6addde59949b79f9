//! Streaming statistics for the octant loader.
//!
//! Updated by the loader on every tick; read by hosts for overlays and logs.
//!
//! ```ignore
//! let stats = loader.stats();
//! println!(
//!     "{} visible / {} resident, avg load {:.1} ms",
//!     stats.visible_nodes,
//!     stats.resident_nodes,
//!     stats.avg_load_us() / 1000.0,
//! );
//! ```

use std::collections::VecDeque;

/// Rolling window for storing recent values (e.g., timing history).
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    /// Create a new rolling window with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Push a new value, evicting the oldest if at capacity.
    pub fn push(&mut self, value: T) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Iterate over values (oldest to newest).
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffer.iter()
    }

    /// Most recent value.
    pub fn last(&self) -> Option<&T> {
        self.buffer.back()
    }
}

impl<T: Copy + Default + std::ops::Add<Output = T>> RollingWindow<T> {
    pub fn sum(&self) -> T {
        self.buffer.iter().copied().fold(T::default(), |acc, x| acc + x)
    }
}

impl RollingWindow<u64> {
    pub fn average(&self) -> f64 {
        if self.buffer.is_empty() {
            0.0
        } else {
            self.sum() as f64 / self.buffer.len() as f64
        }
    }

    pub fn min_max(&self) -> Option<(u64, u64)> {
        let min = *self.buffer.iter().min()?;
        let max = *self.buffer.iter().max()?;
        Some((min, max))
    }
}

impl Default for RollingWindow<u64> {
    fn default() -> Self {
        Self::new(128)
    }
}

/// Loader statistics.
#[derive(Debug, Clone, Default)]
pub struct LoaderStats {
    // Visibility (last evaluation)
    /// Nodes selected as visible.
    pub visible_nodes: usize,
    /// Points counted against the budget.
    pub visible_points: u64,
    /// Visible nodes still waiting for their geometry.
    pub visible_unloaded: usize,

    // Residency
    /// Nodes holding geometry.
    pub resident_nodes: usize,
    /// Entries queued or in flight on the loading thread.
    pub loading: usize,

    // Cumulative
    /// Ticks that ran a full evaluation.
    pub evaluations: u64,
    pub loads_completed: u64,
    pub loads_failed: u64,
    /// Geometry handed to the render graph.
    pub attachments: u64,
    /// Geometry detached and disposed.
    pub evictions: u64,

    // Timing
    /// Background load times (read + geometry) in microseconds.
    pub load_timings: RollingWindow<u64>,
    /// Evaluation times (traversal + scheduling + sync) in microseconds.
    pub evaluate_timings: RollingWindow<u64>,
}

impl LoaderStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_load(&mut self, timing_us: u64) {
        self.loads_completed += 1;
        self.load_timings.push(timing_us);
    }

    pub fn record_failure(&mut self) {
        self.loads_failed += 1;
    }

    pub fn record_evaluation(&mut self, timing_us: u64) {
        self.evaluations += 1;
        self.evaluate_timings.push(timing_us);
    }

    /// Average background load time in microseconds.
    pub fn avg_load_us(&self) -> f64 {
        self.load_timings.average()
    }

    pub fn avg_evaluate_us(&self) -> f64 {
        self.evaluate_timings.average()
    }
}
