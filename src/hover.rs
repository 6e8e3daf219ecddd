//! Hover dwell tracking
//!
//! Tracks how long the pointer has rested on one item and which items have
//! been promoted to focus. Timer scheduling lives in the tracker; this type
//! only holds the dwell bookkeeping.

use std::collections::BTreeSet;

use crate::smoothing::round_tenth;
use crate::types::{ItemId, Millis};

#[derive(Debug, Clone)]
struct Dwell {
    id: ItemId,
    started_at: Millis,
}

/// Dwell and focus bookkeeping for one view
#[derive(Debug, Clone, Default)]
pub struct HoverTracker {
    dwell: Option<Dwell>,
    /// Last sampled dwell in seconds
    duration: f64,
    focused: BTreeSet<ItemId>,
}

impl HoverTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer entered `id`; any earlier dwell is abandoned
    pub fn start(&mut self, id: ItemId, ts: Millis) {
        self.dwell = Some(Dwell { id, started_at: ts });
        self.duration = 0.0;
    }

    /// Pointer left; dwell time is dropped immediately
    pub fn end(&mut self) {
        self.dwell = None;
        self.duration = 0.0;
    }

    /// Update the displayed duration from the clock
    pub fn sample(&mut self, now: Millis) -> f64 {
        if let Some(elapsed) = self.elapsed_secs(now) {
            self.duration = round_tenth(elapsed);
        }
        self.duration
    }

    fn elapsed_secs(&self, now: Millis) -> Option<f64> {
        self.dwell
            .as_ref()
            .map(|d| now.saturating_sub(d.started_at) as f64 / 1000.0)
    }

    /// Promote the current item to focus once the dwell threshold is met.
    ///
    /// Returns the item and its dwell in seconds, or `None` when nothing is
    /// hovered or the threshold has not been reached.
    pub fn confirm_dwell(&mut self, now: Millis, threshold_ms: Millis) -> Option<(ItemId, f64)> {
        let dwell = self.dwell.as_ref()?;
        let elapsed_ms = now.saturating_sub(dwell.started_at);
        if elapsed_ms < threshold_ms {
            return None;
        }
        let id = dwell.id.clone();
        self.focused.insert(id.clone());
        Some((id, round_tenth(elapsed_ms as f64 / 1000.0)))
    }

    /// Drop every focused item
    pub fn clear_focus(&mut self) {
        self.focused.clear();
    }

    pub fn hovered(&self) -> Option<&str> {
        self.dwell.as_ref().map(|d| d.id.as_str())
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn focused(&self) -> &BTreeSet<ItemId> {
        &self.focused
    }

    pub fn reset(&mut self) {
        self.dwell = None;
        self.duration = 0.0;
        self.focused.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_rounds_to_tenth() {
        let mut hover = HoverTracker::new();
        hover.start("chat-1".to_string(), 1_000);
        assert_eq!(hover.sample(2_340), 1.3);
        assert_eq!(hover.duration(), 1.3);
    }

    #[test]
    fn test_end_zeroes_duration() {
        let mut hover = HoverTracker::new();
        hover.start("chat-1".to_string(), 0);
        hover.sample(2_900);
        hover.end();
        assert_eq!(hover.duration(), 0.0);
        assert_eq!(hover.hovered(), None);
        // Sampling with nothing hovered keeps zero
        assert_eq!(hover.sample(5_000), 0.0);
    }

    #[test]
    fn test_confirm_requires_threshold() {
        let mut hover = HoverTracker::new();
        hover.start("class-2".to_string(), 100);
        assert!(hover.confirm_dwell(3_000, 3_000).is_none());

        let (id, secs) = hover.confirm_dwell(3_100, 3_000).unwrap();
        assert_eq!(id, "class-2");
        assert_eq!(secs, 3.0);
        assert!(hover.focused().contains("class-2"));
    }

    #[test]
    fn test_focus_set_has_no_duplicates() {
        let mut hover = HoverTracker::new();
        hover.start("a".to_string(), 0);
        hover.confirm_dwell(3_000, 3_000);
        hover.start("a".to_string(), 4_000);
        hover.confirm_dwell(7_000, 3_000);
        hover.start("b".to_string(), 8_000);
        hover.confirm_dwell(11_000, 3_000);

        let focused: Vec<&str> = hover.focused().iter().map(String::as_str).collect();
        assert_eq!(focused, vec!["a", "b"]);

        hover.clear_focus();
        assert!(hover.focused().is_empty());
    }
}
