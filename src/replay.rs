//! Event-script replay
//!
//! Runs a recorded script through a fresh tracker and reports the outcome.
//! Useful for tuning thresholds offline and for reproducing a session from
//! its event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::events::EventAdapter;
use crate::journal::{LogStore, MemoryStore};
use crate::tracker::BehaviorTracker;
use crate::types::{BehaviorLogEntry, BehaviorState, InputEvent, Millis, Mode, ModeTransition, ViewClass};
use crate::{PRODUCER_NAME, TRACKER_VERSION};

/// Replay knobs
#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    /// Record the state after every event
    pub trace: bool,
    /// Keep the clock running this long after the last event
    pub settle_ms: Millis,
    /// Wall-clock time of the first event; now when absent
    pub origin: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// State right after one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub index: usize,
    pub ts: Millis,
    pub event: String,
    pub state: BehaviorState,
}

/// Outcome of a replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    pub producer: ReplayProducer,
    pub started_at: DateTime<Utc>,
    pub events_processed: usize,
    /// Tracker clock when the replay stopped
    pub final_clock_ms: Millis,
    pub final_state: BehaviorState,
    pub active_modes: Vec<Mode>,
    pub view_classes: Vec<ViewClass>,
    pub transitions: Vec<ModeTransition>,
    pub log_entries: Vec<BehaviorLogEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceRecord>>,
}

/// Replay events against a fresh tracker with an in-memory log store
pub fn replay(
    events: &[InputEvent],
    config: &TrackerConfig,
    options: &ReplayOptions,
) -> Result<ReplayReport, TrackerError> {
    replay_with_store(events, config, options, Box::new(MemoryStore::new()))
}

/// Replay events, appending log entries to `store`
pub fn replay_with_store(
    events: &[InputEvent],
    config: &TrackerConfig,
    options: &ReplayOptions,
    store: Box<dyn LogStore>,
) -> Result<ReplayReport, TrackerError> {
    config.validate()?;
    if let Some(failure) = EventAdapter::validate_events(events).into_iter().next() {
        return Err(TrackerError::InvalidEvent(format!(
            "event {} ({} at {}ms): {}",
            failure.index, failure.kind, failure.ts, failure.message
        )));
    }

    let origin = options.origin.unwrap_or_else(Utc::now);
    let start_ts = events.first().map(InputEvent::ts).unwrap_or(0);
    let mut tracker =
        BehaviorTracker::with_store(config.clone(), store).starting_at(origin, start_ts);

    let mut trace = options.trace.then(Vec::new);
    for (index, event) in events.iter().enumerate() {
        tracker.handle(event);
        if let Some(records) = trace.as_mut() {
            records.push(TraceRecord {
                index,
                ts: tracker.now(),
                event: event.kind().to_string(),
                state: tracker.state(),
            });
        }
    }
    if options.settle_ms > 0 {
        tracker.advance_to(tracker.now().saturating_add(options.settle_ms));
    }

    Ok(ReplayReport {
        producer: ReplayProducer {
            name: PRODUCER_NAME.to_string(),
            version: TRACKER_VERSION.to_string(),
            instance_id: tracker.instance_id().to_string(),
        },
        started_at: origin,
        events_processed: events.len(),
        final_clock_ms: tracker.now(),
        final_state: tracker.state(),
        active_modes: tracker.active_modes(),
        view_classes: tracker.view_classes().into_iter().collect(),
        transitions: tracker.drain_transitions(),
        log_entries: tracker.recorded().to_vec(),
        trace,
    })
}

/// Replay a script (JSON array or NDJSON) with default settings (stateless, one-shot).
///
/// # Returns
/// Pretty-printed `ReplayReport` JSON
pub fn replay_to_json(script: &str) -> Result<String, TrackerError> {
    let events = EventAdapter::parse_auto(script)?;
    let report = replay(&events, &TrackerConfig::default(), &ReplayOptions::default())?;
    Ok(serde_json::to_string_pretty(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActionLabel, ModePhase};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn dwell_script() -> Vec<InputEvent> {
        vec![
            InputEvent::HoverStart {
                ts: 10_000,
                id: "class-7".to_string(),
            },
            InputEvent::Tick { ts: 13_500 },
            InputEvent::HoverEnd { ts: 14_000 },
        ]
    }

    #[test]
    fn test_replay_dwell_script() {
        let options = ReplayOptions {
            origin: Some(Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()),
            ..ReplayOptions::default()
        };
        let report = replay(&dwell_script(), &TrackerConfig::default(), &options).unwrap();

        assert_eq!(report.events_processed, 3);
        assert_eq!(report.final_clock_ms, 14_000);
        assert!(report.final_state.focus_mode);
        assert_eq!(report.active_modes, vec![Mode::Focus]);
        assert_eq!(report.view_classes, vec![ViewClass::FocusActive]);
        assert_eq!(report.log_entries.len(), 1);
        // Dwell confirmed 3s after the first event
        assert_eq!(
            report.log_entries[0].timestamp,
            Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 3).unwrap()
        );
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert!(report.trace.is_none());
    }

    #[test]
    fn test_settle_lets_modes_expire() {
        let options = ReplayOptions {
            settle_ms: 20_000,
            ..ReplayOptions::default()
        };
        let report = replay(&dwell_script(), &TrackerConfig::default(), &options).unwrap();

        assert_eq!(report.final_clock_ms, 34_000);
        assert!(!report.final_state.focus_mode);
        assert_eq!(report.final_state.action, ActionLabel::Normal);
        let last = report.transitions.last().unwrap();
        assert_eq!((last.mode, last.to), (Mode::Focus, ModePhase::Idle));
    }

    #[test]
    fn test_trace_records_every_event() {
        let options = ReplayOptions {
            trace: true,
            ..ReplayOptions::default()
        };
        let report = replay(&dwell_script(), &TrackerConfig::default(), &options).unwrap();
        let trace = report.trace.unwrap();

        assert_eq!(trace.len(), 3);
        assert_eq!(trace[1].event, "tick");
        assert_eq!(trace[1].state.hover_duration, 3.5);
        assert_eq!(trace[2].state.hover_duration, 0.0);
    }

    #[test]
    fn test_invalid_event_rejected() {
        let events = vec![InputEvent::HoverStart {
            ts: 0,
            id: String::new(),
        }];
        let err = replay(&events, &TrackerConfig::default(), &ReplayOptions::default())
            .unwrap_err();
        assert!(matches!(err, TrackerError::InvalidEvent(_)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TrackerConfig {
            click_smoothing: 0.0,
            ..TrackerConfig::default()
        };
        let err = replay(&dwell_script(), &config, &ReplayOptions::default()).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidConfig(_)));
    }

    #[test]
    fn test_replay_to_json() {
        let script = "{\"type\":\"click\",\"ts\":0,\"inside\":false}\n";
        let json = replay_to_json(script).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["events_processed"], 1);
        assert_eq!(value["final_state"]["action"], "Normal");
        assert!(value.get("trace").is_none());
    }

    #[test]
    fn test_empty_script() {
        let report = replay(&[], &TrackerConfig::default(), &ReplayOptions::default()).unwrap();
        assert_eq!(report.events_processed, 0);
        assert_eq!(report.final_state, BehaviorState::default());
    }
}
