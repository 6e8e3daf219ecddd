use behavior_tracker::journal::{BehaviorJournal, LogStore, MemoryStore};
use behavior_tracker::replay::{replay_with_store, ReplayOptions};
use behavior_tracker::{
    replay, ActionLabel, BehaviorTracker, EventAdapter, InputEvent, Mode, ModePhase,
    TrackerConfig, ViewClass,
};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;

fn tracker() -> BehaviorTracker {
    BehaviorTracker::new(TrackerConfig::default())
        .starting_at(Utc.with_ymd_and_hms(2025, 10, 17, 9, 35, 0).unwrap(), 0)
}

#[test]
fn scroll_velocity_stays_within_bounds_for_erratic_input() {
    let config = TrackerConfig::default();
    let mut t = tracker();
    let mut ts = 0;
    let mut position = 0.0;
    for step in 0..3_000u64 {
        // Alternate bursts, crawls, jumps back to the top and same-instant samples
        ts += match step % 7 {
            0 => 0,
            1 | 2 => 16,
            3 => 900,
            _ => 120,
        };
        position = match step % 11 {
            0 => 0.0,
            5 => position + 25_000.0,
            _ => position + (step % 13) as f64 * 3.0,
        };
        t.on_scroll(position, ts);

        let v = t.state().scroll_velocity;
        assert!(v >= 0.0, "negative velocity {v} at step {step}");
        assert!(
            v <= config.scroll_velocity_ceiling,
            "velocity {v} above ceiling at step {step}"
        );
    }
}

#[test]
fn hover_duration_resets_immediately_on_hover_end() {
    for held_ms in [50u64, 2_999, 3_000, 9_000, 60_000] {
        let mut t = tracker();
        t.on_hover_start("item", 0);
        t.advance_to(held_ms);
        t.on_hover_end(held_ms);
        assert_eq!(t.state().hover_duration, 0.0, "after holding {held_ms}ms");
    }
}

#[test]
fn focus_requires_continuous_dwell_on_one_item() {
    // Held exactly long enough
    let mut t = tracker();
    t.on_hover_start("a", 0);
    t.on_hover_end(3_000);
    assert!(t.state().focus_mode);

    // One millisecond short
    let mut t = tracker();
    t.on_hover_start("a", 0);
    t.on_hover_end(2_999);
    t.advance_to(10_000);
    assert!(!t.state().focus_mode);

    // Two short visits do not add up
    let mut t = tracker();
    t.on_hover_start("a", 0);
    t.on_hover_end(2_000);
    t.on_hover_start("a", 2_100);
    t.on_hover_end(4_100);
    t.advance_to(10_000);
    assert!(!t.state().focus_mode);
}

#[test]
fn click_error_mode_triggers_once_and_expires_after_window() {
    let mut t = tracker();
    let mut trigger_at = None;
    for i in 1..=40u64 {
        let ts = i * 100;
        t.on_click(0.0, 0.0, Some(false), ts);
        if trigger_at.is_none() && t.state().click_mode_active {
            trigger_at = Some(ts);
        }
    }
    let trigger_at = trigger_at.unwrap();

    let entries: Vec<_> = t
        .recorded()
        .iter()
        .filter(|e| e.key == "Click Error Rate Trigger (>15%)")
        .collect();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].value.ends_with('%'));

    t.advance_to(trigger_at + 9_999);
    assert!(t.state().click_mode_active);
    t.advance_to(trigger_at + 10_000);
    assert!(!t.state().click_mode_active);
    assert_eq!(t.click_counts(), (0, 0));
    assert_eq!(t.state().click_error_rate, 0.0);

    let activations = t
        .transitions()
        .iter()
        .filter(|tr| tr.mode == Mode::ClickError && tr.to == ModePhase::Active)
        .count();
    assert_eq!(activations, 1);
}

#[test]
fn click_mode_can_trigger_again_after_expiry() {
    let config = TrackerConfig {
        click_smoothing: 1.0,
        ..TrackerConfig::default()
    };
    let mut t = BehaviorTracker::new(config);
    t.on_click(0.0, 0.0, Some(false), 0);
    t.advance_to(10_000);
    assert!(!t.state().click_mode_active);

    t.on_click(0.0, 0.0, Some(false), 10_500);
    assert!(t.state().click_mode_active);
    assert_eq!(t.recorded().len(), 2);
}

#[test]
fn log_entries_land_in_shared_store_as_one_array() {
    let store = MemoryStore::new();
    store.insert("userBehaviors", r#"[{"from": "older build"}]"#);

    let events = EventAdapter::parse_ndjson(
        "{\"type\":\"hover_start\",\"ts\":0,\"id\":\"chat-3\"}\n\
         {\"type\":\"tick\",\"ts\":3200}\n\
         {\"type\":\"hover_end\",\"ts\":3300}\n",
    )
    .unwrap();
    let report = replay_with_store(
        &events,
        &TrackerConfig::default(),
        &ReplayOptions::default(),
        Box::new(store.clone()),
    )
    .unwrap();
    assert_eq!(report.log_entries.len(), 1);

    let raw = store.read("userBehaviors").unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let items = value.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[1]["key"], "Hover Duration (>3s)");
    assert_eq!(items[1]["value"], "3.0s");

    let journal = BehaviorJournal::new(Box::new(store), "userBehaviors");
    assert_eq!(journal.entries().unwrap().len(), 1);
}

#[test]
fn replay_reports_dominant_emphasis() {
    let config = TrackerConfig {
        click_smoothing: 1.0,
        ..TrackerConfig::default()
    };
    let events = vec![
        InputEvent::HoverStart {
            ts: 0,
            id: "card".to_string(),
        },
        InputEvent::Tick { ts: 3_000 },
        InputEvent::Click {
            ts: 3_500,
            x: 0.0,
            y: 0.0,
            inside: Some(false),
        },
    ];
    let report = replay(&events, &config, &ReplayOptions::default()).unwrap();

    assert_eq!(report.active_modes, vec![Mode::ClickError, Mode::Focus]);
    assert_eq!(
        report.view_classes,
        vec![ViewClass::ClickErrorEnlarged, ViewClass::ClickErrorOverlay]
    );
    assert_eq!(report.final_state.action, ActionLabel::ClickErrorMode);
}

#[test]
fn events_at_the_end_of_the_clock_are_handled() {
    let config = TrackerConfig {
        click_smoothing: 1.0,
        ..TrackerConfig::default()
    };
    let events = vec![
        InputEvent::HoverStart {
            ts: u64::MAX - 4_000,
            id: "last".to_string(),
        },
        InputEvent::Click {
            ts: u64::MAX - 1_000,
            x: 0.0,
            y: 0.0,
            inside: Some(false),
        },
        InputEvent::Scroll {
            ts: u64::MAX,
            y: 40.0,
        },
    ];
    let options = ReplayOptions {
        settle_ms: 60_000,
        ..ReplayOptions::default()
    };
    let report = replay(&events, &config, &options).unwrap();

    assert_eq!(report.final_clock_ms, u64::MAX);
    assert_eq!(report.events_processed, 3);
    let keys: Vec<&str> = report.log_entries.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "Hover Duration (>3s)",
            "Click Error Rate Trigger (>15%)",
            "Scroll Velocity (<30px/s)",
        ]
    );
    // Expiry deadlines saturate at the last millisecond and fire there
    assert!(report.active_modes.is_empty());
    assert!(!report.final_state.focus_mode);
    assert!(!report.final_state.click_mode_active);
    assert_eq!(report.final_state.hover_duration, 4.0);
}

#[test]
fn long_idle_gaps_keep_hover_duration_exact() {
    let mut t = tracker();
    t.on_hover_start("slide", 500);
    for gap in [86_400_000u64, 31_536_000_000, 3_153_600_000_000] {
        t.advance_to(500 + gap);
        assert_eq!(t.state().hover_duration, gap as f64 / 1000.0);
    }
    t.on_hover_end(500 + 3_153_600_000_000);
    assert_eq!(t.state().hover_duration, 0.0);
}
