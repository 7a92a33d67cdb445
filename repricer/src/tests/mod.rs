mod locator_tests;
mod tree_search_tests;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use crate::controller::{DeferredTask, PhaseController, Step};
use crate::platforms::scripted::{Scenario, Screen, ScriptedHost};
use crate::platforms::AccessibilityEvent;
use crate::session::Phase;
use crate::{AutomationConfig, Bounds, UINode};

pub const PACKAGE: &str = "com.example.marketplace";

// Initialize tracing for tests
#[allow(dead_code)]
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .with_target(true)
        .with_test_writer()
        .try_init();
}

/// Drives a controller against a scripted host with a manual clock.
///
/// Deferred tasks are kept in a local list with their due instants; `advance` fires the
/// ones that come due in order, the way the service's delay queue would.
pub struct Harness {
    pub host: Arc<ScriptedHost>,
    pub controller: PhaseController,
    pub now: Instant,
    pending: Vec<(Instant, DeferredTask)>,
    host_events: Arc<Mutex<VecDeque<AccessibilityEvent>>>,
}

impl Harness {
    pub fn new(scenario: Scenario, config: AutomationConfig) -> Self {
        let host = Arc::new(ScriptedHost::new(scenario).expect("valid scenario"));
        let host_events = Arc::new(Mutex::new(VecDeque::new()));
        let sink = host_events.clone();
        host.set_event_sink(move |event| sink.lock().unwrap().push_back(event));
        let now = Instant::now();
        let controller = PhaseController::new(host.clone(), config, now).expect("valid config");
        Self {
            host,
            controller,
            now,
            pending: Vec::new(),
            host_events,
        }
    }

    pub fn phase(&self) -> Phase {
        self.controller.session().phase()
    }

    pub fn pending_steps(&self) -> Vec<Step> {
        let mut pending = self.pending.clone();
        pending.sort_by_key(|(due, _)| *due);
        pending.into_iter().map(|(_, task)| task.step).collect()
    }

    /// Deliver one content-changed notification for the target package.
    pub fn notify(&mut self) {
        self.deliver(AccessibilityEvent::content_changed(PACKAGE));
    }

    pub fn deliver(&mut self, event: AccessibilityEvent) {
        self.controller.on_event(&event, self.now);
        self.collect();
    }

    /// Deliver every event the host has emitted so far. Returns how many were delivered.
    pub fn pump_host_events(&mut self) -> usize {
        let mut delivered = 0;
        loop {
            let next = self.host_events.lock().unwrap().pop_front();
            match next {
                Some(event) => {
                    self.deliver(event);
                    delivered += 1;
                }
                None => return delivered,
            }
        }
    }

    /// Throw away events the host emitted so far.
    pub fn drop_host_events(&mut self) {
        self.host_events.lock().unwrap().clear();
    }

    /// Move the clock forward, firing deferred tasks as they come due.
    pub fn advance(&mut self, by: Duration) {
        let until = self.now + by;
        loop {
            let next = self
                .pending
                .iter()
                .enumerate()
                .filter(|(_, (due, _))| *due <= until)
                .min_by_key(|(_, (due, _))| *due)
                .map(|(index, _)| index);
            let Some(index) = next else {
                break;
            };
            let (due, task) = self.pending.remove(index);
            self.now = self.now.max(due);
            self.controller.on_deferred(task, self.now);
            self.collect();
        }
        self.now = self.now.max(until);
    }

    /// Deliver the next host event, or else move the clock to the next deadline.
    /// Returns `false` when there is nothing left to do.
    pub fn step(&mut self) -> bool {
        let next = self.host_events.lock().unwrap().pop_front();
        if let Some(event) = next {
            self.deliver(event);
            return true;
        }
        let Some(due) = self.pending.iter().map(|(due, _)| *due).min() else {
            return false;
        };
        let wait = due.saturating_duration_since(self.now);
        self.advance(wait);
        true
    }

    pub fn run(&mut self, limit: usize) {
        for _ in 0..limit {
            if !self.step() {
                return;
            }
        }
    }

    /// Step until the session is in `phase`. Returns whether it got there.
    pub fn run_until(&mut self, phase: Phase, limit: usize) -> bool {
        for _ in 0..limit {
            if self.phase() == phase {
                return true;
            }
            if !self.step() {
                break;
            }
        }
        self.phase() == phase
    }

    pub fn reset(&mut self) {
        self.controller.reset(self.now);
        self.collect();
    }

    fn collect(&mut self) {
        for (delay, task) in self.controller.take_scheduled() {
            self.pending.push((self.now + delay, task));
        }
    }
}

pub fn label(text: &str) -> UINode {
    UINode::new("android.widget.TextView").with_text(text)
}

/// A clickable container wrapping a non-clickable label, the way list rows and
/// material buttons are often exposed.
pub fn button_row(id: &str, text: &str) -> UINode {
    UINode::new("android.widget.LinearLayout")
        .with_id(id)
        .clickable()
        .with_child(label(text))
}

pub fn price_field(text: &str) -> UINode {
    UINode::new("android.widget.EditText")
        .with_id("price_input")
        .with_text(text)
        .with_hint("販売価格")
        .clickable()
        .with_bounds(Bounds::new(40, 900, 1040, 1000))
}

pub fn product_page(price: &str) -> UINode {
    UINode::new("android.widget.FrameLayout").with_child(
        UINode::new("androidx.recyclerview.widget.RecyclerView")
            .with_id("product_scroll")
            .scrollable(1800)
            .with_children([
                label("Vintage camera"),
                label(price),
                button_row("edit_button", "Edit"),
            ]),
    )
}

/// The edit screen after `offset` forward scrolls. The price field is materialized once
/// `offset >= field_at`, the save row once `offset >= save_at`.
pub fn edit_page(offset: usize, field_at: usize, save_at: usize) -> UINode {
    let mut content = vec![label(&format!("Section {offset}"))];
    if offset >= field_at {
        content.push(price_field("12,800"));
    }
    if offset >= save_at {
        content.push(button_row("save_button", "Save changes"));
    }
    UINode::new("android.widget.FrameLayout").with_children([
        UINode::new("android.widget.HorizontalScrollView").scrollable(200),
        UINode::new("android.widget.ScrollView")
            .with_id("edit_scroll")
            .scrollable(2000)
            .with_children(content),
    ])
}

/// Product page, then an edit screen that needs `field_at` scrolls to reveal the price
/// field and `save_at` scrolls to reveal the save row. Back from the last edit screen
/// returns to the product page.
pub fn listing_scenario(field_at: usize, save_at: usize) -> Scenario {
    let last = field_at.max(save_at);
    let mut scenario = Scenario::new(PACKAGE, "product")
        .with_screen("product", Screen::new(product_page("12,800")).on_click("Edit", "edit_0"));
    for offset in 0..=last {
        let mut screen = Screen::new(edit_page(offset, field_at, save_at)).on_back("product");
        if offset < last {
            screen = screen.on_scroll(format!("edit_{}", offset + 1));
        }
        scenario = scenario.with_screen(format!("edit_{offset}"), screen);
    }
    scenario
}
