//! Mode orchestration
//!
//! Each mode walks `Idle → Triggered → Active → Expiring → Idle`. The
//! orchestrator records every step, keeps the action label, and decides which
//! single mode is visually emphasized.

use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{ActionLabel, Millis, Mode, ModePhase, ModeTransition, ViewClass};

/// Phase bookkeeping for all modes of one view
#[derive(Debug, Clone)]
pub struct ModeOrchestrator {
    phases: BTreeMap<Mode, ModePhase>,
    action: ActionLabel,
    transitions: Vec<ModeTransition>,
}

impl Default for ModeOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeOrchestrator {
    pub fn new() -> Self {
        Self {
            phases: Mode::ALL.iter().map(|m| (*m, ModePhase::Idle)).collect(),
            action: ActionLabel::Normal,
            transitions: Vec::new(),
        }
    }

    pub fn phase(&self, mode: Mode) -> ModePhase {
        self.phases.get(&mode).copied().unwrap_or(ModePhase::Idle)
    }

    pub fn is_active(&self, mode: Mode) -> bool {
        self.phase(mode) == ModePhase::Active
    }

    pub fn any_active(&self) -> bool {
        Mode::ALL.iter().any(|m| self.is_active(*m))
    }

    /// Highest-priority active mode
    pub fn dominant(&self) -> Option<Mode> {
        Mode::ALL.iter().copied().find(|m| self.is_active(*m))
    }

    /// Activate a mode and take over the action label.
    ///
    /// Returns `false` when the mode was already active; the caller refreshes
    /// its expiry in that case.
    pub fn trigger(&mut self, mode: Mode, at_ms: Millis) -> bool {
        self.action = mode.label();
        if self.is_active(mode) {
            debug!("{mode:?} re-triggered at {at_ms}ms");
            return false;
        }
        self.step(mode, ModePhase::Triggered, at_ms);
        self.step(mode, ModePhase::Active, at_ms);
        info!("{mode:?} mode active at {at_ms}ms");
        true
    }

    /// Return an active mode to idle.
    ///
    /// The action label falls back to the dominant remaining mode, or to
    /// `Normal` when none is left. Returns `false` when the mode was not active.
    pub fn expire(&mut self, mode: Mode, at_ms: Millis) -> bool {
        if !self.is_active(mode) {
            return false;
        }
        self.step(mode, ModePhase::Expiring, at_ms);
        self.step(mode, ModePhase::Idle, at_ms);
        self.action = self
            .dominant()
            .map(|m| m.label())
            .unwrap_or(ActionLabel::Normal);
        info!("{mode:?} mode expired at {at_ms}ms, action now {}", self.action);
        true
    }

    fn step(&mut self, mode: Mode, to: ModePhase, at_ms: Millis) {
        let from = self.phase(mode);
        self.phases.insert(mode, to);
        self.transitions.push(ModeTransition {
            mode,
            from,
            to,
            at_ms,
        });
    }

    pub fn action(&self) -> ActionLabel {
        self.action
    }

    pub fn set_action(&mut self, action: ActionLabel) {
        self.action = action;
    }

    /// Styling the view layer should apply right now.
    ///
    /// Only the dominant mode contributes emphasis classes. A hidden sidebar
    /// is layout rather than emphasis and is always reported.
    pub fn view_classes(&self) -> BTreeSet<ViewClass> {
        let mut classes: BTreeSet<ViewClass> = self
            .dominant()
            .map(|m| m.emphasis().iter().copied().collect())
            .unwrap_or_default();
        if self.is_active(Mode::SidebarHidden) {
            classes.insert(ViewClass::SidebarHidden);
        }
        classes
    }

    pub fn transitions(&self) -> &[ModeTransition] {
        &self.transitions
    }

    /// Hand recorded transitions to the caller
    pub fn drain_transitions(&mut self) -> Vec<ModeTransition> {
        std::mem::take(&mut self.transitions)
    }

    /// Back to all-idle without recording transitions
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
