//! Per-instance cancellable timers
//!
//! Every tracker owns one `TimerArena`. Each `TimerKind` has at most one
//! pending deadline; scheduling a kind again replaces (cancels) the previous
//! one. Deadlines live on the tracker's virtual millisecond clock and fire when
//! the tracker advances past them.

use crate::types::Millis;

/// Named timer slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Velocity falls back to zero after a quiet period
    ScrollIdleReset,
    /// Slow scrolling must persist before enlarging
    SlowScrollDebounce,
    /// Sidebar hides once a slow scroll settles
    SidebarIdle,
    /// Hover duration sampler (interval)
    HoverSample,
    /// Dwell threshold for entering focus
    FocusDwell,
    FocusExpiry,
    EnlargeExpiry,
    ClickModeExpiry,
}

#[derive(Debug, Clone)]
struct Timer {
    kind: TimerKind,
    deadline: Millis,
    period: Option<Millis>,
    seq: u64,
}

/// Arena of pending timers keyed by kind
#[derive(Debug, Clone, Default)]
pub struct TimerArena {
    timers: Vec<Timer>,
    next_seq: u64,
}

impl TimerArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a one-shot timer, replacing any pending timer of the same kind
    pub fn schedule(&mut self, kind: TimerKind, deadline: Millis) {
        self.insert(kind, deadline, None);
    }

    /// Schedule a repeating timer first firing at `first`, then every `period`
    pub fn schedule_interval(&mut self, kind: TimerKind, first: Millis, period: Millis) {
        self.insert(kind, first, Some(period.max(1)));
    }

    fn insert(&mut self, kind: TimerKind, deadline: Millis, period: Option<Millis>) {
        self.cancel(kind);
        let seq = self.bump_seq();
        self.timers.push(Timer {
            kind,
            deadline,
            period,
            seq,
        });
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Cancel a pending timer; returns whether one was pending
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.kind != kind);
        self.timers.len() != before
    }

    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.timers.iter().any(|t| t.kind == kind)
    }

    pub fn deadline(&self, kind: TimerKind) -> Option<Millis> {
        self.timers
            .iter()
            .find(|t| t.kind == kind)
            .map(|t| t.deadline)
    }

    /// Pop the earliest timer due at or before `now`.
    ///
    /// Ties fire in scheduling order. An interval timer that fell several
    /// periods behind fires once, at its latest missed tick that still
    /// precedes every other pending deadline, then re-arms one period later
    /// behind timers already scheduled. A re-arm past the end of the clock
    /// drops the timer.
    pub fn pop_due(&mut self, now: Millis) -> Option<(TimerKind, Millis)> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.deadline <= now)
            .min_by_key(|(_, t)| (t.deadline, t.seq))
            .map(|(idx, _)| idx)?;

        let kind = self.timers[idx].kind;
        let Some(period) = self.timers[idx].period else {
            let timer = self.timers.swap_remove(idx);
            return Some((kind, timer.deadline));
        };

        let deadline = self.timers[idx].deadline;
        let bound = self
            .timers
            .iter()
            .filter(|t| t.kind != kind)
            .map(|t| t.deadline.saturating_sub(1))
            .min()
            .map_or(now, |next| next.min(now))
            .max(deadline);
        let fired_at = deadline + (bound - deadline) / period * period;

        match fired_at.checked_add(period) {
            Some(next) => {
                let seq = self.bump_seq();
                let timer = &mut self.timers[idx];
                timer.deadline = next;
                timer.seq = seq;
            }
            None => {
                self.timers.swap_remove(idx);
            }
        }

        Some((kind, fired_at))
    }

    /// Drop every pending timer
    pub fn clear(&mut self) {
        self.timers.clear();
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
