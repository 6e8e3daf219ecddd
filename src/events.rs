//! Event-script parsing
//!
//! Scripts are either a JSON array of input events or NDJSON, one event per
//! line. Blank lines in NDJSON are skipped.

use crate::error::TrackerError;
use crate::types::{InputEvent, Millis};

/// Parser for recorded input-event scripts
pub struct EventAdapter;

impl EventAdapter {
    /// Parse a JSON array of events
    pub fn parse_array(json: &str) -> Result<Vec<InputEvent>, TrackerError> {
        let events: Vec<InputEvent> = serde_json::from_str(json)?;
        Ok(events)
    }

    /// Parse NDJSON (newline-delimited JSON) events
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<InputEvent>, TrackerError> {
        let mut events = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<InputEvent>(trimmed) {
                Ok(event) => events.push(event),
                Err(e) => {
                    return Err(TrackerError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(events)
    }

    /// Array when the first non-blank character is `[`, NDJSON otherwise
    pub fn parse_auto(input: &str) -> Result<Vec<InputEvent>, TrackerError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Validate a batch of events, returning only the failures
    pub fn validate_events(events: &[InputEvent]) -> Vec<ValidationResult> {
        events
            .iter()
            .enumerate()
            .filter_map(|(index, event)| {
                event.validate().err().map(|e| ValidationResult {
                    index,
                    kind: event.kind(),
                    ts: event.ts(),
                    message: e.to_string(),
                })
            })
            .collect()
    }
}

/// One rejected event
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub index: usize,
    pub kind: &'static str,
    pub ts: Millis,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_array() {
        let json = r#"[
            {"type": "scroll", "ts": 100, "y": 40.0},
            {"type": "hover_start", "ts": 200, "id": "chat-1"},
            {"type": "click", "ts": 300, "inside": false}
        ]"#;
        let events = EventAdapter::parse_array(json).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1].kind(), "hover_start");
        assert_eq!(events[2].ts(), 300);
    }

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let ndjson = "{\"type\":\"tick\",\"ts\":5}\n\n{\"type\":\"hover_end\",\"ts\":9}\n";
        let events = EventAdapter::parse_ndjson(ndjson).unwrap();
        assert_eq!(
            events,
            vec![InputEvent::Tick { ts: 5 }, InputEvent::HoverEnd { ts: 9 }]
        );
    }

    #[test]
    fn test_ndjson_error_names_line() {
        let ndjson = "{\"type\":\"tick\",\"ts\":5}\n{\"type\":\"wobble\",\"ts\":6}\n";
        let err = EventAdapter::parse_ndjson(ndjson).unwrap_err();
        assert!(err.to_string().contains("Failed to parse line 2"));
    }

    #[test]
    fn test_parse_auto() {
        let array = "  [{\"type\":\"tick\",\"ts\":1}]";
        let ndjson = "{\"type\":\"tick\",\"ts\":1}";
        assert_eq!(
            EventAdapter::parse_auto(array).unwrap(),
            EventAdapter::parse_auto(ndjson).unwrap()
        );
    }

    #[test]
    fn test_validate_events_reports_failures_only() {
        let events = vec![
            InputEvent::Tick { ts: 1 },
            InputEvent::HoverStart {
                ts: 2,
                id: "  ".to_string(),
            },
            InputEvent::Scroll {
                ts: 3,
                y: f64::NAN,
            },
        ];
        let failures = EventAdapter::validate_events(&events);
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].index, 1);
        assert_eq!(failures[0].kind, "hover_start");
        assert_eq!(failures[1].index, 2);
        assert_eq!(failures[1].ts, 3);
    }
}
