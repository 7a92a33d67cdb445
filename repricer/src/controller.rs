//! The repricing state machine
//!
//! The controller is re-entered by two stimuli: change notifications from the host and
//! deferred tasks it scheduled itself. It never waits. Work that has to happen later is
//! pushed to an outbox as a [`DeferredTask`] tagged with the phase and epoch it was created
//! under; the runtime hands it back through [`PhaseController::on_deferred`] once the delay
//! has passed, and a task whose phase entry is no longer current is dropped.
//!
//! Every handler fetches a fresh snapshot. A locator miss is never an error, only a sign
//! that the screen is not there yet.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, trace, warn};

use crate::actions::ActionDispatcher;
use crate::config::{AutomationConfig, ExhaustionPolicy, FocusStrategy};
use crate::locator::ElementLocators;
use crate::platforms::{AccessibilityEvent, AccessibilityHost};
use crate::scroll::perform_scroll;
use crate::session::{AutomationSession, Phase};
use crate::{AutomationError, UINode};

/// Work the controller asked to be re-entered with later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Edit screen settle delay is over; start forced scrolling
    SettleElapsed,
    /// Next forced scroll
    ScrollRetry,
    /// Focus has had time to land; replace the field text
    SetText,
    /// Text has had time to settle; clear focus to commit it
    ClearFocus,
    /// Look for the save control
    CheckSave,
    /// Save was pressed; navigate back
    GoBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeferredTask {
    pub phase: Phase,
    pub epoch: u64,
    pub step: Step,
}

pub struct PhaseController {
    config: AutomationConfig,
    locators: ElementLocators,
    dispatcher: ActionDispatcher,
    session: AutomationSession,
    outbox: Vec<(Duration, DeferredTask)>,
}

impl PhaseController {
    pub fn new(
        host: Arc<dyn AccessibilityHost>,
        config: AutomationConfig,
        now: Instant,
    ) -> Result<Self, AutomationError> {
        config.validate()?;
        let locators = ElementLocators::from_config(&config)?;
        Ok(Self {
            config,
            locators,
            dispatcher: ActionDispatcher::new(host),
            session: AutomationSession::new(now),
            outbox: Vec::new(),
        })
    }

    pub fn config(&self) -> &AutomationConfig {
        &self.config
    }

    pub fn session(&self) -> &AutomationSession {
        &self.session
    }

    pub fn locators(&self) -> &ElementLocators {
        &self.locators
    }

    /// Deferred tasks scheduled since the last call, with their delays.
    pub fn take_scheduled(&mut self) -> Vec<(Duration, DeferredTask)> {
        std::mem::take(&mut self.outbox)
    }

    /// External restart: drop the session and go back to watching for a product page.
    pub fn reset(&mut self, now: Instant) {
        info!(from = %self.session.phase(), "resetting automation session");
        self.session.reset(now);
        self.outbox.clear();
    }

    /// Handle a change notification from the host.
    #[instrument(level = "debug", skip(self, event, now), fields(phase = %self.session.phase()))]
    pub fn on_event(&mut self, event: &AccessibilityEvent, now: Instant) {
        if event.package != self.config.target_package {
            trace!(package = %event.package, "ignoring event from foreign package");
            return;
        }

        match self.session.phase() {
            Phase::Idle => self.detect_product_page(now),
            Phase::WaitEditTransition => self.await_edit_screen(now),
            Phase::ForceScroll => self.force_scroll(now),
            Phase::FindPriceInput => self.find_price_input_once(now),
            Phase::InputPrice => self.focus_price_input(),
            Phase::ClickSave => self.schedule_save_check(),
            Phase::Finished => {}
        }
    }

    /// Handle a deferred task whose delay has passed.
    #[instrument(level = "debug", skip(self, now), fields(phase = %self.session.phase()))]
    pub fn on_deferred(&mut self, task: DeferredTask, now: Instant) {
        if task.phase != self.session.phase() || task.epoch != self.session.epoch() {
            debug!(?task, "dropping stale deferred task");
            return;
        }
        self.session.set_step_pending(false);

        match task.step {
            Step::SettleElapsed => self.enter_force_scroll(now),
            Step::ScrollRetry => self.force_scroll(now),
            Step::SetText => self.enter_price(),
            Step::ClearFocus => self.commit_price(now),
            Step::CheckSave => self.press_save(now),
            Step::GoBack => {
                self.dispatcher.go_back();
            }
        }
    }

    fn transition(&mut self, to: Phase, now: Instant) {
        info!(from = %self.session.phase(), to = %to, "phase transition");
        self.session.enter(to, now);
    }

    /// Queue `step` for the current phase entry and mark it outstanding.
    fn schedule(&mut self, delay: Duration, step: Step) {
        let task = DeferredTask {
            phase: self.session.phase(),
            epoch: self.session.epoch(),
            step,
        };
        debug!(?delay, ?step, "scheduling deferred step");
        self.outbox.push((delay, task));
        self.session.set_step_pending(true);
    }

    fn detect_product_page(&mut self, now: Instant) {
        let Some(root) = self.dispatcher.fetch_root() else {
            return;
        };
        let Some(price) = self.locators.find_price(&root) else {
            debug!("no price on screen");
            return;
        };
        if let Some(target) = self.session.record_price(price, self.config.price_decrement) {
            info!(current = price, target, "detected listing price");
        }

        let Some(edit) = self.locators.find_edit_button(&root) else {
            debug!("price found but no edit control on screen");
            return;
        };
        if self.dispatcher.click(&edit) {
            self.transition(Phase::WaitEditTransition, now);
            self.await_edit_screen(now);
        }
    }

    fn await_edit_screen(&mut self, now: Instant) {
        if !self.session.step_pending() {
            self.schedule(self.config.settle_delay(), Step::SettleElapsed);
            return;
        }
        // The settle timer may lag behind a busy notification stream
        if self.session.elapsed_in_phase(now) >= self.config.settle_delay() {
            debug!("settle delay elapsed before its timer fired");
            self.enter_force_scroll(now);
        }
    }

    fn enter_force_scroll(&mut self, now: Instant) {
        self.transition(Phase::ForceScroll, now);
        self.force_scroll(now);
    }

    /// One round of the forced-scroll loop. Finding the field always wins; scrolling only
    /// happens when no retry is already outstanding.
    fn force_scroll(&mut self, now: Instant) {
        let root = self.dispatcher.fetch_root();
        if let Some(root) = root.as_ref() {
            if self.try_cache_price_input(root, now) {
                return;
            }
        }
        if self.session.step_pending() {
            return;
        }

        let max = self.config.max_scroll_attempts;
        if self.session.scroll_attempts() >= max {
            self.scroll_budget_exhausted(now);
            return;
        }

        let scrolled = root
            .as_ref()
            .is_some_and(|root| perform_scroll(&self.dispatcher, root));
        let attempt = self.session.record_scroll();
        debug!(attempt, max, scrolled, "forced scroll");
        self.schedule(self.config.scroll_retry_interval(), Step::ScrollRetry);
    }

    fn scroll_budget_exhausted(&mut self, now: Instant) {
        match self.config.exhaustion {
            ExhaustionPolicy::FallbackSearch => {
                warn!(
                    attempts = self.session.scroll_attempts(),
                    "price field not found by scrolling, falling back to passive search"
                );
                self.transition(Phase::FindPriceInput, now);
                self.find_price_input_once(now);
            }
            ExhaustionPolicy::Finish => {
                warn!(
                    attempts = self.session.scroll_attempts(),
                    "price field not found by scrolling, giving up"
                );
                self.transition(Phase::Finished, now);
            }
        }
    }

    fn find_price_input_once(&mut self, now: Instant) {
        let Some(root) = self.dispatcher.fetch_root() else {
            return;
        };
        if !self.try_cache_price_input(&root, now) {
            debug!("price field still not on screen");
        }
    }

    /// Cache the price field and move on to input if it is on screen.
    fn try_cache_price_input(&mut self, root: &UINode, now: Instant) -> bool {
        let Some(field) = self.locators.find_price_input(root) else {
            return false;
        };
        info!(field = %field.describe(), "price field located");
        self.session.cache_price_input(field);
        self.transition(Phase::InputPrice, now);
        self.focus_price_input();
        true
    }

    fn focus_price_input(&mut self) {
        if self.session.step_pending() {
            return;
        }
        let Some(root) = self.dispatcher.fetch_root() else {
            return;
        };
        let Some(field) = self
            .locators
            .resolve_price_input(&root, self.session.cached_price_input())
        else {
            debug!("price field not resolvable in current snapshot");
            return;
        };

        match self.config.focus {
            FocusStrategy::TapThenFocus => {
                self.dispatcher.click(&field);
                self.dispatcher.focus(&field);
            }
            FocusStrategy::DirectFocus => {
                self.dispatcher.focus(&field);
            }
        }
        self.session.cache_price_input(field);
        self.schedule(self.config.focus_delay(), Step::SetText);
    }

    fn enter_price(&mut self) {
        let Some(target_price) = self.session.target_price() else {
            warn!("no target price recorded, cannot enter price");
            return;
        };
        let Some(root) = self.dispatcher.fetch_root() else {
            return;
        };
        let Some(field) = self
            .locators
            .resolve_price_input(&root, self.session.cached_price_input())
        else {
            debug!("price field vanished before text could be set");
            return;
        };

        if self.dispatcher.set_text(&field, &target_price.to_string()) {
            self.session.cache_price_input(field);
            self.schedule(self.config.commit_delay(), Step::ClearFocus);
        } else {
            warn!("set-text rejected, waiting for the next notification to retry");
        }
    }

    fn commit_price(&mut self, now: Instant) {
        let Some(root) = self.dispatcher.fetch_root() else {
            return;
        };
        let Some(field) = self
            .locators
            .resolve_price_input(&root, self.session.cached_price_input())
        else {
            debug!("price field vanished before focus could be cleared");
            return;
        };
        self.dispatcher.clear_focus(&field);
        self.transition(Phase::ClickSave, now);
        self.schedule_save_check();
    }

    fn schedule_save_check(&mut self) {
        if !self.session.step_pending() {
            self.schedule(self.config.save_check_delay(), Step::CheckSave);
        }
    }

    fn press_save(&mut self, now: Instant) {
        let Some(root) = self.dispatcher.fetch_root() else {
            return;
        };
        let Some(save) = self.locators.find_save_button(&root) else {
            let scrolled = perform_scroll(&self.dispatcher, &root);
            debug!(scrolled, "save control not on screen");
            return;
        };
        if !self.dispatcher.click(&save) {
            warn!("save click rejected, waiting for the next notification to retry");
            return;
        }
        info!(
            current = ?self.session.current_price(),
            target = ?self.session.target_price(),
            "price saved"
        );
        self.transition(Phase::Finished, now);
        self.schedule(self.config.back_delay(), Step::GoBack);
    }
}
