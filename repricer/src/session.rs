use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

use crate::NodeHandle;

/// One state of the repricing workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Watching for a product page
    Idle,
    /// Edit pressed, waiting for the edit screen to settle
    WaitEditTransition,
    /// Scrolling the edit screen until the price field shows up
    ForceScroll,
    /// Scroll budget spent, checking once per notification
    FindPriceInput,
    /// Price field located, entering the new price
    InputPrice,
    /// Looking for the save control, then navigating back
    ClickSave,
    /// Terminal
    Finished,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::WaitEditTransition => "wait_edit_transition",
            Phase::ForceScroll => "force_scroll",
            Phase::FindPriceInput => "find_price_input",
            Phase::InputPrice => "input_price",
            Phase::ClickSave => "click_save",
            Phase::Finished => "finished",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Finished)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable summary of a session, published by the service after every stimulus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub phase: Phase,
    pub current_price: Option<i64>,
    pub target_price: Option<i64>,
    pub scroll_attempts: u32,
    pub epoch: u64,
}

/// Mutable record of one automation run, owned by the phase controller.
#[derive(Debug, Clone)]
pub struct AutomationSession {
    phase: Phase,
    current_price: Option<i64>,
    target_price: Option<i64>,
    scroll_attempts: u32,
    cached_price_input: Option<NodeHandle>,
    phase_entered_at: Instant,
    /// Bumped on every phase entry and reset; deferred work carries the value it was
    /// created under
    epoch: u64,
    /// A deferred step for the current phase entry is outstanding
    step_pending: bool,
}

impl AutomationSession {
    pub fn new(now: Instant) -> Self {
        Self {
            phase: Phase::Idle,
            current_price: None,
            target_price: None,
            scroll_attempts: 0,
            cached_price_input: None,
            phase_entered_at: now,
            epoch: 0,
            step_pending: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_price(&self) -> Option<i64> {
        self.current_price
    }

    pub fn target_price(&self) -> Option<i64> {
        self.target_price
    }

    pub fn scroll_attempts(&self) -> u32 {
        self.scroll_attempts
    }

    pub fn cached_price_input(&self) -> Option<&NodeHandle> {
        self.cached_price_input.as_ref()
    }

    pub fn phase_entered_at(&self) -> Instant {
        self.phase_entered_at
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn step_pending(&self) -> bool {
        self.step_pending
    }

    pub fn elapsed_in_phase(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.phase_entered_at)
    }

    /// Enter `phase`. Entering the scroll phase restarts the scroll budget.
    pub(crate) fn enter(&mut self, phase: Phase, now: Instant) {
        self.phase = phase;
        self.phase_entered_at = now;
        self.epoch += 1;
        self.step_pending = false;
        if phase == Phase::ForceScroll {
            self.scroll_attempts = 0;
        }
    }

    /// Record the detected price and derive the target.
    ///
    /// Prices are only taken while idle; once the workflow has left the product page they
    /// stay fixed until [`AutomationSession::reset`]. No lower bound is applied to the
    /// target.
    pub(crate) fn record_price(&mut self, current: i64, decrement: i64) -> Option<i64> {
        if self.phase != Phase::Idle {
            return self.target_price;
        }
        let target = current.saturating_sub(decrement);
        self.current_price = Some(current);
        self.target_price = Some(target);
        Some(target)
    }

    pub(crate) fn record_scroll(&mut self) -> u32 {
        self.scroll_attempts += 1;
        self.scroll_attempts
    }

    pub(crate) fn cache_price_input(&mut self, handle: NodeHandle) {
        self.cached_price_input = Some(handle);
    }

    pub(crate) fn set_step_pending(&mut self, pending: bool) {
        self.step_pending = pending;
    }

    /// Back to idle with every field cleared. The epoch keeps counting so that work
    /// scheduled before the reset goes stale.
    pub fn reset(&mut self, now: Instant) {
        let epoch = self.epoch + 1;
        *self = Self::new(now);
        self.epoch = epoch;
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            phase: self.phase,
            current_price: self.current_price,
            target_price: self.target_price,
            scroll_attempts: self.scroll_attempts,
            epoch: self.epoch,
        }
    }
}
