//! Scroll-velocity estimation
//!
//! Turns (position, timestamp) samples into a capped, exponentially smoothed
//! velocity and classifies each sample as slow or fast scrolling.

use crate::config::TrackerConfig;
use crate::smoothing::ease_toward;
use crate::types::Millis;

/// How a scroll sample relates to the slow-scroll threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollPace {
    /// Smoothed velocity at or above the threshold
    Fast,
    /// Smoothed velocity strictly between zero and the threshold
    Slow(f64),
    /// Smoothed velocity is zero
    Still,
}

/// Smoothed scroll velocity estimator
#[derive(Debug, Clone)]
pub struct ScrollVelocityEstimator {
    last_position: f64,
    last_ts: Millis,
    velocity: f64,
    /// Velocity captured when the slow-scroll debounce was last armed
    pending_slow: Option<f64>,
}

impl ScrollVelocityEstimator {
    /// Start at page top at the given clock reading
    pub fn new(origin_ts: Millis) -> Self {
        Self {
            last_position: 0.0,
            last_ts: origin_ts,
            velocity: 0.0,
            pending_slow: None,
        }
    }

    /// Feed a scroll sample and return its pace
    pub fn sample(&mut self, position: f64, ts: Millis, config: &TrackerConfig) -> ScrollPace {
        let dy = (position - self.last_position).abs();
        let dt_sec = ts.saturating_sub(self.last_ts) as f64 / 1000.0;

        let raw = if dt_sec > 0.0 { dy / dt_sec } else { 0.0 };
        let raw = raw.min(config.scroll_raw_cap);

        self.velocity = ease_toward(
            self.velocity,
            raw,
            config.scroll_velocity_ceiling,
            config.scroll_smoothing,
        );
        self.last_position = position;
        self.last_ts = ts;

        if self.velocity >= config.slow_scroll_threshold {
            self.pending_slow = None;
            ScrollPace::Fast
        } else if self.velocity > 0.0 {
            self.pending_slow = Some(self.velocity);
            ScrollPace::Slow(self.velocity)
        } else {
            ScrollPace::Still
        }
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Whether the current velocity is under the slow threshold
    pub fn is_slow(&self, config: &TrackerConfig) -> bool {
        self.velocity < config.slow_scroll_threshold
    }

    /// Take the velocity captured when the debounce was armed
    pub fn take_pending_slow(&mut self) -> Option<f64> {
        self.pending_slow.take()
    }

    /// Zero the velocity after a quiet period
    pub fn reset_idle(&mut self) {
        self.velocity = 0.0;
    }

    /// Forget everything except the reference position
    pub fn reset(&mut self) {
        self.velocity = 0.0;
        self.pending_slow = None;
    }
}
