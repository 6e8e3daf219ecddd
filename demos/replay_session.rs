//! Replay a short classroom session and print the report

fn main() {
    let script = r#"[
        { "type": "scroll", "ts": 0, "y": 0 },
        { "type": "scroll", "ts": 1000, "y": 12 },
        { "type": "scroll", "ts": 2000, "y": 25 },
        { "type": "hover_start", "ts": 2500, "id": "class-card-4" },
        { "type": "tick", "ts": 6000 },
        { "type": "hover_end", "ts": 6200 },
        { "type": "click", "ts": 6500, "inside": false },
        { "type": "click", "ts": 6700, "inside": true },
        { "type": "tick", "ts": 20000 }
    ]"#;

    match behavior_tracker::replay_to_json(script) {
        Ok(report) => print!("{report}"),
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
