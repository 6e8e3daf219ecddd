//! Behavior Tracker - adaptive-UI signals from raw pointer input
//!
//! A tracker turns scroll, click and hover events into a small state vector
//! (scroll velocity, hover dwell, click-error rate, an action label and mode
//! flags) and records notable moments to an append-only behavior log.
//!
//! ## Modules
//!
//! - **Detectors**: scroll velocity, hover dwell, click-error rate
//! - **Orchestrator**: transient modes (enlarge, focus, click-error, sidebar)
//!   with timed expiry
//! - **Journal**: behavior log over a pluggable key-value store
//! - **Replay**: run recorded event scripts offline

pub mod click;
pub mod config;
pub mod error;
pub mod events;
pub mod hover;
pub mod journal;
pub mod orchestrator;
pub mod replay;
pub mod scroll;
pub mod smoothing;
pub mod timer;
pub mod tracker;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::TrackerConfig;
pub use error::TrackerError;
pub use events::EventAdapter;
pub use journal::{BehaviorJournal, FileStore, LogStore, MemoryStore};
pub use replay::{replay, replay_to_json, ReplayOptions, ReplayReport};
pub use tracker::BehaviorTracker;
pub use types::{
    ActionLabel, BehaviorLogEntry, BehaviorState, InputEvent, Mode, ModePhase, ModeTransition,
    Region, ViewClass,
};

/// Library version stamped into replay reports
pub const TRACKER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for replay reports
pub const PRODUCER_NAME: &str = "behavior-tracker";
