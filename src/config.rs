//! Tracker configuration
//!
//! Thresholds and windows for the three detectors. Defaults reproduce the
//! classroom views; hosts override them per view through JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::TrackerError;
use crate::types::{Millis, Region};

/// Fixed storage key of the behavior log
pub const DEFAULT_STORAGE_KEY: &str = "userBehaviors";

/// Detector thresholds and timer windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    // Scroll
    /// Hard cap on raw velocity before smoothing (px/s)
    pub scroll_raw_cap: f64,
    /// Ceiling of the smoothed velocity (px/s)
    pub scroll_velocity_ceiling: f64,
    /// EMA weight for scroll velocity
    pub scroll_smoothing: f64,
    /// Velocities strictly below this count as slow scrolling (px/s)
    pub slow_scroll_threshold: f64,
    /// How long scrolling must stay slow before enlarging
    pub slow_scroll_debounce_ms: Millis,
    /// Velocity resets to zero after this long without a scroll sample
    pub scroll_idle_reset_ms: Millis,
    /// Hide the sidebar once a slow scroll settles
    pub hide_sidebar_when_idle: bool,
    pub sidebar_idle_ms: Millis,

    // Hover
    pub hover_sample_ms: Millis,
    pub focus_dwell_ms: Millis,
    pub focus_duration_ms: Millis,

    // Click
    /// Ceiling of the smoothed error rate (percent)
    pub click_rate_ceiling: f64,
    pub click_smoothing: f64,
    /// Smoothed rate at or above which click-error mode starts (percent)
    pub click_error_trigger: f64,
    pub click_mode_duration_ms: Millis,
    /// Container used for clicks that carry no explicit inside flag
    pub container: Option<Region>,

    // Modes
    pub enlarge_duration_ms: Millis,

    pub storage_key: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            scroll_raw_cap: 100.0,
            scroll_velocity_ceiling: 50.0,
            scroll_smoothing: 0.05,
            slow_scroll_threshold: 30.0,
            slow_scroll_debounce_ms: 2_000,
            scroll_idle_reset_ms: 2_000,
            hide_sidebar_when_idle: false,
            sidebar_idle_ms: 2_000,
            hover_sample_ms: 100,
            focus_dwell_ms: 3_000,
            focus_duration_ms: 10_000,
            click_rate_ceiling: 20.0,
            click_smoothing: 0.1,
            click_error_trigger: 15.0,
            click_mode_duration_ms: 10_000,
            container: None,
            enlarge_duration_ms: 10_000,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl TrackerConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, TrackerError> {
        let config: TrackerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_file(path: &Path) -> Result<Self, TrackerError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Serialize to pretty JSON
    pub fn to_json_pretty(&self) -> Result<String, TrackerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that thresholds are consistent
    pub fn validate(&self) -> Result<(), TrackerError> {
        for (name, factor) in [
            ("scroll_smoothing", self.scroll_smoothing),
            ("click_smoothing", self.click_smoothing),
        ] {
            if !(factor > 0.0 && factor <= 1.0) {
                return Err(TrackerError::InvalidConfig(format!(
                    "{name} must be in (0, 1], got {factor}"
                )));
            }
        }

        for (name, value) in [
            ("scroll_raw_cap", self.scroll_raw_cap),
            ("scroll_velocity_ceiling", self.scroll_velocity_ceiling),
            ("slow_scroll_threshold", self.slow_scroll_threshold),
            ("click_rate_ceiling", self.click_rate_ceiling),
            ("click_error_trigger", self.click_error_trigger),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(TrackerError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        if self.click_rate_ceiling > 100.0 {
            return Err(TrackerError::InvalidConfig(
                "click_rate_ceiling cannot exceed 100".to_string(),
            ));
        }

        // An eased value only approaches its ceiling, so with smoothing below 1
        // a threshold equal to the ceiling is never reached either
        if !reachable(
            self.click_error_trigger,
            self.click_rate_ceiling,
            self.click_smoothing,
        ) {
            return Err(TrackerError::InvalidConfig(format!(
                "click_error_trigger ({}) is not below click_rate_ceiling ({}) and can never fire",
                self.click_error_trigger, self.click_rate_ceiling
            )));
        }

        let top_velocity = self.scroll_velocity_ceiling.min(self.scroll_raw_cap);
        if !reachable(self.slow_scroll_threshold, top_velocity, self.scroll_smoothing) {
            return Err(TrackerError::InvalidConfig(format!(
                "slow_scroll_threshold ({}) is not below the velocity ceiling ({top_velocity}), \
                 so every scroll would count as slow",
                self.slow_scroll_threshold
            )));
        }

        if self.hover_sample_ms == 0 {
            return Err(TrackerError::InvalidConfig(
                "hover_sample_ms must be at least 1".to_string(),
            ));
        }

        if self.storage_key.is_empty() {
            return Err(TrackerError::InvalidConfig(
                "storage_key must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Whether a smoothed value capped at `ceiling` can ever reach `threshold`
fn reachable(threshold: f64, ceiling: f64, smoothing: f64) -> bool {
    threshold < ceiling || (threshold == ceiling && smoothing >= 1.0)
}
