//! Click-error-rate detection
//!
//! Counts clicks and the share that land outside the tracked container.

use crate::config::TrackerConfig;
use crate::smoothing::ease_toward;

/// Cumulative click counters with a smoothed error rate
#[derive(Debug, Clone, Default)]
pub struct ClickErrorDetector {
    total_clicks: u32,
    error_clicks: u32,
    /// Smoothed error rate in percent
    rate: f64,
}

impl ClickErrorDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a click and return the updated smoothed rate.
    ///
    /// Formula: `raw = error_clicks / total_clicks * 100`, then eased toward
    /// `min(raw, click_rate_ceiling)` by `click_smoothing`.
    pub fn record(&mut self, inside: bool, config: &TrackerConfig) -> f64 {
        self.total_clicks = self.total_clicks.saturating_add(1);
        if !inside {
            self.error_clicks = self.error_clicks.saturating_add(1);
        }

        self.rate = ease_toward(
            self.rate,
            self.raw_rate(),
            config.click_rate_ceiling,
            config.click_smoothing,
        );
        self.rate
    }

    /// Unsmoothed error rate in percent
    pub fn raw_rate(&self) -> f64 {
        if self.total_clicks == 0 {
            return 0.0;
        }
        self.error_clicks as f64 / self.total_clicks as f64 * 100.0
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn total_clicks(&self) -> u32 {
        self.total_clicks
    }

    pub fn error_clicks(&self) -> u32 {
        self.error_clicks
    }

    /// Zero both counters and the rate
    pub fn reset(&mut self) {
        self.total_clicks = 0;
        self.error_clicks = 0;
        self.rate = 0.0;
    }
}
