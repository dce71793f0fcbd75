//! Smoothed per-minute rates for the dashboard

use std::time::Instant;

/// Shortest interval a sample is measured over, in milliseconds
const MIN_ELAPSED_MS: u64 = 10;

/// Exponentially smoothed events-per-minute for one metric
#[derive(Debug, Clone)]
pub struct RateTracker {
    per_minute: Option<f64>,
    baseline: Instant,
}

impl Default for RateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RateTracker {
    pub fn new() -> Self {
        Self {
            per_minute: None,
            baseline: Instant::now(),
        }
    }

    /// Folds in `count` events observed over `elapsed_ms`
    ///
    /// The first sample sets the rate outright; later ones are smoothed as
    /// `(old * 4 + instant) / 5`.
    pub fn update(&mut self, count: u64, elapsed_ms: u64) -> f64 {
        let instant = count as f64 / elapsed_ms.max(MIN_ELAPSED_MS) as f64 * 60_000.0;
        let rate = match self.per_minute {
            Some(old) => (old * 4.0 + instant) / 5.0,
            None => instant,
        };
        self.per_minute = Some(rate);
        rate
    }

    /// Folds in `count` events observed since the previous sample
    pub fn record(&mut self, count: u64) -> f64 {
        let elapsed = self.baseline.elapsed().as_millis() as u64;
        self.baseline = Instant::now();
        self.update(count, elapsed)
    }

    /// Restarts the elapsed-time baseline, keeping the smoothed rate
    ///
    /// Called on resume so time spent paused does not drag the rate down.
    pub fn reset_time(&mut self) {
        self.baseline = Instant::now();
    }

    pub fn per_minute(&self) -> Option<f64> {
        self.per_minute
    }
}
