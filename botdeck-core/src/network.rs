//! Sliding window of network throughput samples.

use crate::event::NetworkSample;
use std::collections::VecDeque;

/// Number of samples retained for the throughput chart.
pub const NETWORK_WINDOW: usize = 40;

/// FIFO window of recent throughput samples; insertion order is display
/// order.
#[derive(Debug, Clone, Default)]
pub struct NetworkHistory {
    samples: VecDeque<NetworkSample>,
}

impl NetworkHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sample, evicting the oldest past the window.
    pub fn record(&mut self, sample: NetworkSample) {
        self.samples.push_back(sample);
        while self.samples.len() > NETWORK_WINDOW {
            self.samples.pop_front();
        }
    }

    /// Samples in arrival order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &NetworkSample> {
        self.samples.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(n: usize) -> NetworkSample {
        NetworkSample {
            label: format!("t{n}"),
            rx: n as f64,
            tx: 0.0,
        }
    }

    #[test]
    fn test_window_keeps_most_recent_in_order() {
        let mut history = NetworkHistory::new();
        for n in 0..100 {
            history.record(sample(n));
        }
        assert_eq!(history.len(), NETWORK_WINDOW);
        let labels: Vec<_> = history.iter().map(|s| s.label.clone()).collect();
        let expected: Vec<_> = (60..100).map(|n| format!("t{n}")).collect();
        assert_eq!(labels, expected);
    }

    #[test]
    fn test_under_capacity_keeps_everything() {
        let mut history = NetworkHistory::new();
        for n in 0..10 {
            history.record(sample(n));
        }
        assert_eq!(history.len(), 10);
        assert_eq!(history.iter().next().map(|s| s.label.as_str()), Some("t0"));
    }
}
