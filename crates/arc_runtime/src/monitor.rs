//! Runtime statistics.

use serde::Serialize;

/// Counters accumulated across frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Frames processed, including failed ones
    pub frames: u64,
    /// Committed node executions that ran the stage at least once
    pub node_executions: u64,
    /// Affected nodes that stayed dormant
    pub nodes_skipped: u64,
    /// Stage function calls
    pub invocations: u64,
    /// Series dropped by garbage collection
    pub series_collected: u64,
    /// Ingested series addressed to unknown channels
    pub series_dropped: u64,
}

impl Stats {
    /// Create zeroed statistics
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a processed frame
    pub fn record_frame(&mut self) {
        self.frames += 1;
    }

    /// Record a node execution and its invocation count
    pub fn record_execution(&mut self, invocations: usize) {
        self.node_executions += 1;
        self.invocations += invocations as u64;
    }

    /// Record a dormant node
    pub fn record_skip(&mut self) {
        self.record_skips(1);
    }

    /// Record `count` dormant nodes
    pub fn record_skips(&mut self, count: usize) {
        self.nodes_skipped += count as u64;
    }

    /// Record series dropped by garbage collection
    pub fn record_collected(&mut self, count: usize) {
        self.series_collected += count as u64;
    }

    /// Record a series for an unknown channel
    pub fn record_dropped(&mut self) {
        self.series_dropped += 1;
    }

    /// Mean invocations per execution
    #[must_use]
    pub fn invocations_per_execution(&self) -> f64 {
        if self.node_executions == 0 {
            return 0.0;
        }
        self.invocations as f64 / self.node_executions as f64
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_recording() {
        let mut stats = Stats::new();
        stats.record_frame();
        stats.record_execution(4);
        stats.record_execution(2);
        stats.record_skip();
        stats.record_collected(3);
        stats.record_dropped();

        assert_eq!(stats.frames, 1);
        assert_eq!(stats.node_executions, 2);
        assert_eq!(stats.invocations, 6);
        assert_eq!(stats.nodes_skipped, 1);
        assert_eq!(stats.series_collected, 3);
        assert_eq!(stats.series_dropped, 1);
        assert!((stats.invocations_per_execution() - 3.0).abs() < f64::EPSILON);

        stats.reset();
        assert_eq!(stats, Stats::default());
    }
}
