//! Behavior tracker
//!
//! One tracker per view. It owns its detectors, its timers and its mode
//! state; nothing is shared between instances except an optional log store.
//!
//! Time only moves when the host says so: every handler first fires the
//! timers whose deadline is at or before the event timestamp, in deadline
//! order, then applies the event.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::click::ClickErrorDetector;
use crate::config::TrackerConfig;
use crate::hover::HoverTracker;
use crate::journal::{BehaviorJournal, LogStore, MemoryStore};
use crate::orchestrator::ModeOrchestrator;
use crate::scroll::{ScrollPace, ScrollVelocityEstimator};
use crate::timer::{TimerArena, TimerKind};
use crate::types::{
    ActionLabel, BehaviorLogEntry, BehaviorState, InputEvent, Millis, Mode, ModeTransition,
    ViewClass,
};

/// Converts raw input signals into the behavior state vector
pub struct BehaviorTracker {
    config: TrackerConfig,
    instance_id: Uuid,
    /// Wall-clock time matching `origin_ms`
    origin: DateTime<Utc>,
    origin_ms: Millis,
    clock: Millis,
    timers: TimerArena,
    scroll: ScrollVelocityEstimator,
    hover: HoverTracker,
    click: ClickErrorDetector,
    modes: ModeOrchestrator,
    journal: BehaviorJournal,
    recorded: Vec<BehaviorLogEntry>,
    /// Fast scrolling seen since the last slow-scroll enlarge
    fast_since_slow: bool,
    detached: bool,
}

impl BehaviorTracker {
    /// Tracker logging to a private in-memory store
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_store(config, Box::new(MemoryStore::new()))
    }

    /// Tracker logging to the given store
    pub fn with_store(config: TrackerConfig, store: Box<dyn LogStore>) -> Self {
        let journal = BehaviorJournal::new(store, config.storage_key.clone());
        Self {
            config,
            instance_id: Uuid::new_v4(),
            origin: Utc::now(),
            origin_ms: 0,
            clock: 0,
            timers: TimerArena::new(),
            scroll: ScrollVelocityEstimator::new(0),
            hover: HoverTracker::new(),
            click: ClickErrorDetector::new(),
            modes: ModeOrchestrator::new(),
            journal,
            recorded: Vec::new(),
            fast_since_slow: false,
            detached: false,
        }
    }

    /// Anchor the event clock: `ts` milliseconds corresponds to `origin`
    pub fn starting_at(mut self, origin: DateTime<Utc>, ts: Millis) -> Self {
        self.origin = origin;
        self.origin_ms = ts;
        self.clock = ts;
        self.scroll = ScrollVelocityEstimator::new(ts);
        self
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Dispatch one input event
    pub fn handle(&mut self, event: &InputEvent) {
        match event {
            InputEvent::Scroll { ts, y } => self.on_scroll(*y, *ts),
            InputEvent::Click { ts, x, y, inside } => self.on_click(*x, *y, *inside, *ts),
            InputEvent::HoverStart { ts, id } => self.on_hover_start(id, *ts),
            InputEvent::HoverEnd { ts } => self.on_hover_end(*ts),
            InputEvent::Tick { ts } => self.advance_to(*ts),
        }
    }

    /// Fire every timer due at or before `ts` and move the clock there.
    ///
    /// Timestamps behind the clock are clamped to it.
    pub fn advance_to(&mut self, ts: Millis) {
        if self.detached {
            return;
        }
        if ts < self.clock {
            warn!(
                "event at {ts}ms is behind the tracker clock ({}ms), using the clock",
                self.clock
            );
            return;
        }
        while let Some((kind, at)) = self.timers.pop_due(ts) {
            self.clock = at;
            self.fire(kind);
        }
        self.clock = ts;
    }

    /// Scroll position sample
    pub fn on_scroll(&mut self, position: f64, ts: Millis) {
        if self.detached {
            return;
        }
        self.advance_to(ts);
        let now = self.clock;

        let pace = self.scroll.sample(position, now, &self.config);
        self.timers.schedule(
            TimerKind::ScrollIdleReset,
            now.saturating_add(self.config.scroll_idle_reset_ms),
        );

        // Any scrolling shows the sidebar again
        self.timers.cancel(TimerKind::SidebarIdle);
        self.modes.expire(Mode::SidebarHidden, now);

        match pace {
            ScrollPace::Fast => {
                if self.timers.cancel(TimerKind::SlowScrollDebounce) {
                    debug!("fast scroll at {now}ms cancelled pending slow-scroll trigger");
                }
                self.fast_since_slow = true;
                if !self.modes.any_active() {
                    self.modes.set_action(ActionLabel::NormalScrolling);
                }
            }
            ScrollPace::Slow(_) => {
                self.timers.schedule(
                    TimerKind::SlowScrollDebounce,
                    now.saturating_add(self.config.slow_scroll_debounce_ms),
                );
            }
            ScrollPace::Still => {}
        }
    }

    /// Pointer click; `inside` overrides the configured container region
    pub fn on_click(&mut self, x: f64, y: f64, inside: Option<bool>, ts: Millis) {
        if self.detached {
            return;
        }
        self.advance_to(ts);
        let now = self.clock;

        let inside = self.classify_click(x, y, inside);
        let rate = self.click.record(inside, &self.config);

        if rate >= self.config.click_error_trigger && !self.modes.is_active(Mode::ClickError) {
            self.modes.trigger(Mode::ClickError, now);
            let key = format!(
                "Click Error Rate Trigger (>{}%)",
                self.config.click_error_trigger
            );
            self.record(key, format!("{rate:.1}%"));
            self.timers.schedule(
                TimerKind::ClickModeExpiry,
                now.saturating_add(self.config.click_mode_duration_ms),
            );
        }
    }

    fn classify_click(&self, x: f64, y: f64, inside: Option<bool>) -> bool {
        inside
            .or_else(|| self.config.container.map(|region| region.contains(x, y)))
            .unwrap_or(true)
    }

    /// Pointer entered a trackable item
    pub fn on_hover_start(&mut self, id: &str, ts: Millis) {
        if self.detached {
            return;
        }
        self.advance_to(ts);
        let now = self.clock;

        self.hover.start(id.to_string(), now);
        let period = self.config.hover_sample_ms;
        self.timers
            .schedule_interval(TimerKind::HoverSample, now.saturating_add(period), period);
        self.timers.schedule(
            TimerKind::FocusDwell,
            now.saturating_add(self.config.focus_dwell_ms),
        );
    }

    /// Pointer left the hovered item
    pub fn on_hover_end(&mut self, ts: Millis) {
        if self.detached {
            return;
        }
        self.advance_to(ts);

        self.timers.cancel(TimerKind::HoverSample);
        if self.timers.cancel(TimerKind::FocusDwell) {
            debug!("hover ended at {}ms before the dwell threshold", self.clock);
        }
        self.hover.end();

        if !self.modes.is_active(Mode::ClickError) {
            self.modes.set_action(ActionLabel::Hovering);
        }
    }

    /// Clear every timer and reset all state; later input is ignored
    pub fn teardown(&mut self) {
        self.timers.clear();
        self.scroll.reset();
        self.hover.reset();
        self.click.reset();
        self.modes.reset();
        self.fast_since_slow = false;
        self.detached = true;
        info!("tracker {} torn down at {}ms", self.instance_id, self.clock);
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    fn fire(&mut self, kind: TimerKind) {
        let now = self.clock;
        debug!("{kind:?} fired at {now}ms");
        match kind {
            TimerKind::ScrollIdleReset => self.scroll.reset_idle(),
            TimerKind::SlowScrollDebounce => self.on_slow_scroll_settled(),
            TimerKind::SidebarIdle => self.on_sidebar_idle(),
            TimerKind::HoverSample => {
                self.hover.sample(now);
            }
            TimerKind::FocusDwell => self.on_dwell_reached(),
            TimerKind::FocusExpiry => {
                self.hover.clear_focus();
                self.modes.expire(Mode::Focus, now);
            }
            TimerKind::EnlargeExpiry => {
                self.modes.expire(Mode::Enlarge, now);
            }
            TimerKind::ClickModeExpiry => {
                self.click.reset();
                self.modes.expire(Mode::ClickError, now);
            }
        }
    }

    fn on_slow_scroll_settled(&mut self) {
        let captured = self.scroll.take_pending_slow();
        if !self.scroll.is_slow(&self.config) {
            return;
        }
        let Some(velocity) = captured else {
            return;
        };
        let now = self.clock;

        let key = format!(
            "Scroll Velocity (<{}px/s)",
            self.config.slow_scroll_threshold
        );
        self.record(key, format!("{velocity:.1} px/s"));

        self.modes.trigger(Mode::Enlarge, now);
        self.timers.schedule(
            TimerKind::EnlargeExpiry,
            now.saturating_add(self.config.enlarge_duration_ms),
        );

        if self.config.hide_sidebar_when_idle {
            self.fast_since_slow = false;
            self.timers.schedule(
                TimerKind::SidebarIdle,
                now.saturating_add(self.config.sidebar_idle_ms),
            );
        }
    }

    fn on_sidebar_idle(&mut self) {
        if self.fast_since_slow || !self.scroll.is_slow(&self.config) {
            return;
        }
        self.modes.trigger(Mode::SidebarHidden, self.clock);
    }

    fn on_dwell_reached(&mut self) {
        let now = self.clock;
        let Some((id, secs)) = self.hover.confirm_dwell(now, self.config.focus_dwell_ms) else {
            return;
        };
        debug!("item {id:?} focused after {secs:.1}s");

        self.modes.trigger(Mode::Focus, now);
        self.timers.schedule(
            TimerKind::FocusExpiry,
            now.saturating_add(self.config.focus_duration_ms),
        );

        let key = format!(
            "Hover Duration (>{}s)",
            self.config.focus_dwell_ms as f64 / 1000.0
        );
        self.record(key, format!("{secs:.1}s"));
    }

    // ------------------------------------------------------------------
    // Log
    // ------------------------------------------------------------------

    fn record(&mut self, key: String, value: String) {
        let entry = BehaviorLogEntry {
            timestamp: self.wall_clock(self.clock),
            key,
            value,
        };
        info!("behavior: {} = {}", entry.key, entry.value);
        if let Err(e) = self.journal.append(&entry) {
            warn!("skipping behavior log append: {e}");
        }
        self.recorded.push(entry);
    }

    /// Wall-clock time of a clock reading
    ///
    /// Readings past chrono's range clamp to the latest representable time.
    pub fn wall_clock(&self, ts: Millis) -> DateTime<Utc> {
        let offset = ts.saturating_sub(self.origin_ms);
        i64::try_from(offset)
            .ok()
            .and_then(Duration::try_milliseconds)
            .and_then(|delta| self.origin.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    /// Current state vector
    pub fn state(&self) -> BehaviorState {
        BehaviorState {
            scroll_velocity: self.scroll.velocity(),
            hover_duration: self.hover.duration(),
            click_error_rate: self.click.rate(),
            action: self.modes.action(),
            focus_mode: self.modes.is_active(Mode::Focus),
            focused_ids: self.hover.focused().clone(),
            click_mode_active: self.modes.is_active(Mode::ClickError),
            sidebar_hidden: self.modes.is_active(Mode::SidebarHidden),
        }
    }

    /// Styling hints for the view layer
    pub fn view_classes(&self) -> BTreeSet<ViewClass> {
        self.modes.view_classes()
    }

    /// Active modes in dominance order
    pub fn active_modes(&self) -> Vec<Mode> {
        Mode::ALL
            .iter()
            .copied()
            .filter(|m| self.modes.is_active(*m))
            .collect()
    }

    pub fn transitions(&self) -> &[ModeTransition] {
        self.modes.transitions()
    }

    pub fn drain_transitions(&mut self) -> Vec<ModeTransition> {
        self.modes.drain_transitions()
    }

    /// Entries this tracker appended, in order
    pub fn recorded(&self) -> &[BehaviorLogEntry] {
        &self.recorded
    }

    pub fn journal(&self) -> &BehaviorJournal {
        &self.journal
    }

    /// (total, outside) click counters
    pub fn click_counts(&self) -> (u32, u32) {
        (self.click.total_clicks(), self.click.error_clicks())
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hover.hovered()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn origin(&self) -> DateTime<Utc> {
        self.origin
    }

    pub fn now(&self) -> Millis {
        self.clock
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }
}
