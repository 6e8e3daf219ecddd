//! Core types for the behavior tracker
//!
//! This module defines the input events the host feeds in, the derived state
//! vector it reads back, and the log entries recorded along the way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::TrackerError;

/// Identifier of a trackable item (a chat, a class card, ...)
pub type ItemId = String;

/// Milliseconds on the host's monotonic clock
pub type Millis = u64;

// ============================================================================
// Input events
// ============================================================================

/// A time-stamped input signal from the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    /// Page scrolled to a new vertical position
    Scroll {
        ts: Millis,
        /// Scroll offset in pixels
        y: f64,
    },
    /// Pointer click
    Click {
        ts: Millis,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
        /// Whether the click target sits inside the tracked container.
        /// When absent the configured container region decides.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        inside: Option<bool>,
    },
    /// Pointer entered a trackable item
    HoverStart { ts: Millis, id: ItemId },
    /// Pointer left the hovered item
    HoverEnd { ts: Millis },
    /// Time passed with no input
    Tick { ts: Millis },
}

impl InputEvent {
    /// Timestamp of the event
    pub fn ts(&self) -> Millis {
        match self {
            InputEvent::Scroll { ts, .. }
            | InputEvent::Click { ts, .. }
            | InputEvent::HoverStart { ts, .. }
            | InputEvent::HoverEnd { ts }
            | InputEvent::Tick { ts } => *ts,
        }
    }

    /// Short name of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            InputEvent::Scroll { .. } => "scroll",
            InputEvent::Click { .. } => "click",
            InputEvent::HoverStart { .. } => "hover_start",
            InputEvent::HoverEnd { .. } => "hover_end",
            InputEvent::Tick { .. } => "tick",
        }
    }

    /// Check field-level constraints
    pub fn validate(&self) -> Result<(), TrackerError> {
        match self {
            InputEvent::Scroll { y, .. } if !y.is_finite() => Err(TrackerError::InvalidEvent(
                "scroll position must be finite".to_string(),
            )),
            InputEvent::Click { x, y, .. } if !x.is_finite() || !y.is_finite() => Err(
                TrackerError::InvalidEvent("click coordinates must be finite".to_string()),
            ),
            InputEvent::HoverStart { id, .. } if id.trim().is_empty() => Err(
                TrackerError::InvalidEvent("hover_start requires a non-empty id".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

/// Axis-aligned container rectangle in page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Region {
    /// Whether a point falls inside the region (edges inclusive)
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

// ============================================================================
// Derived state
// ============================================================================

/// Human-readable summary of what the tracker last decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionLabel {
    #[serde(rename = "Normal")]
    Normal,
    #[serde(rename = "Normal Scrolling")]
    NormalScrolling,
    #[serde(rename = "Slow Scroll Detected")]
    SlowScroll,
    #[serde(rename = "Focus View")]
    FocusView,
    #[serde(rename = "Hovering")]
    Hovering,
    #[serde(rename = "Click Error Mode Active")]
    ClickErrorMode,
    #[serde(rename = "Sidebar Hidden (Idle after 2s Slow Scroll)")]
    SidebarHidden,
}

impl ActionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionLabel::Normal => "Normal",
            ActionLabel::NormalScrolling => "Normal Scrolling",
            ActionLabel::SlowScroll => "Slow Scroll Detected",
            ActionLabel::FocusView => "Focus View",
            ActionLabel::Hovering => "Hovering",
            ActionLabel::ClickErrorMode => "Click Error Mode Active",
            ActionLabel::SidebarHidden => "Sidebar Hidden (Idle after 2s Slow Scroll)",
        }
    }
}

impl fmt::Display for ActionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The state vector consumed by the rendering layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorState {
    /// Smoothed scroll velocity in px/s
    pub scroll_velocity: f64,
    /// Current hover dwell in seconds (0.1s resolution)
    pub hover_duration: f64,
    /// Smoothed click-error rate in percent
    pub click_error_rate: f64,
    /// Best-effort label, not authoritative
    pub action: ActionLabel,
    pub focus_mode: bool,
    pub focused_ids: BTreeSet<ItemId>,
    pub click_mode_active: bool,
    pub sidebar_hidden: bool,
}

impl Default for BehaviorState {
    fn default() -> Self {
        Self {
            scroll_velocity: 0.0,
            hover_duration: 0.0,
            click_error_rate: 0.0,
            action: ActionLabel::Normal,
            focus_mode: false,
            focused_ids: BTreeSet::new(),
            click_mode_active: false,
            sidebar_hidden: false,
        }
    }
}

// ============================================================================
// Modes
// ============================================================================

/// Transient UI modes, in dominance order (highest first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    ClickError,
    Focus,
    Enlarge,
    SidebarHidden,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::ClickError, Mode::Focus, Mode::Enlarge, Mode::SidebarHidden];

    /// Label shown while this mode dominates
    pub fn label(&self) -> ActionLabel {
        match self {
            Mode::ClickError => ActionLabel::ClickErrorMode,
            Mode::Focus => ActionLabel::FocusView,
            Mode::Enlarge => ActionLabel::SlowScroll,
            Mode::SidebarHidden => ActionLabel::SidebarHidden,
        }
    }

    /// Emphasis classes the view layer applies while this mode dominates
    pub fn emphasis(&self) -> &'static [ViewClass] {
        match self {
            Mode::ClickError => &[ViewClass::ClickErrorEnlarged, ViewClass::ClickErrorOverlay],
            Mode::Focus => &[ViewClass::FocusActive],
            Mode::Enlarge => &[ViewClass::EnlargeMode, ViewClass::Enlarged],
            Mode::SidebarHidden => &[],
        }
    }
}

/// Lifecycle of a single mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModePhase {
    Idle,
    Triggered,
    Active,
    Expiring,
}

/// One step in a mode's lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeTransition {
    pub mode: Mode,
    pub from: ModePhase,
    pub to: ModePhase,
    pub at_ms: Millis,
}

/// Styling hints for the view layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewClass {
    /// Page-level enlarge styling
    EnlargeMode,
    /// Container enlarged after slow scroll
    Enlarged,
    ClickErrorEnlarged,
    ClickErrorOverlay,
    FocusActive,
    SidebarHidden,
}

impl ViewClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewClass::EnlargeMode => "enlarge-mode",
            ViewClass::Enlarged => "enlarged",
            ViewClass::ClickErrorEnlarged => "click-error-enlarged",
            ViewClass::ClickErrorOverlay => "click-error-overlay",
            ViewClass::FocusActive => "focus-active",
            ViewClass::SidebarHidden => "sidebar-hidden",
        }
    }
}

// ============================================================================
// Behavior log
// ============================================================================

/// A recorded behavior transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorLogEntry {
    pub timestamp: DateTime<Utc>,
    pub key: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_event_deserialization() {
        let json = r#"{"type": "hover_start", "ts": 1200, "id": "math-101"}"#;
        let event: InputEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            InputEvent::HoverStart {
                ts: 1200,
                id: "math-101".to_string()
            }
        );
        assert_eq!(event.ts(), 1200);
        assert_eq!(event.kind(), "hover_start");
    }

    #[test]
    fn test_click_defaults() {
        let json = r#"{"type": "click", "ts": 5}"#;
        let event: InputEvent = serde_json::from_str(json).unwrap();
        match event {
            InputEvent::Click { x, y, inside, .. } => {
                assert_eq!(x, 0.0);
                assert_eq!(y, 0.0);
                assert!(inside.is_none());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_blank_id() {
        let event = InputEvent::HoverStart {
            ts: 0,
            id: "  ".to_string(),
        };
        assert!(event.validate().is_err());

        let event = InputEvent::Scroll { ts: 0, y: f64::NAN };
        assert!(event.validate().is_err());
    }

    #[test]
    fn test_action_label_serializes_as_text() {
        let json = serde_json::to_string(&ActionLabel::SlowScroll).unwrap();
        assert_eq!(json, "\"Slow Scroll Detected\"");
        assert_eq!(ActionLabel::ClickErrorMode.to_string(), "Click Error Mode Active");
    }

    #[test]
    fn test_view_class_serialization() {
        let json = serde_json::to_string(&ViewClass::ClickErrorEnlarged).unwrap();
        assert_eq!(json, format!("\"{}\"", ViewClass::ClickErrorEnlarged.as_str()));
    }

    #[test]
    fn test_region_contains_edges() {
        let region = Region {
            x: 10.0,
            y: 10.0,
            width: 100.0,
            height: 50.0,
        };
        assert!(region.contains(10.0, 10.0));
        assert!(region.contains(110.0, 60.0));
        assert!(!region.contains(9.9, 30.0));
        assert!(!region.contains(50.0, 60.1));
    }
}
