//! Primitive actions against the controlled application
//!
//! The dispatcher is the only caller of [`AccessibilityHost`]. It turns every outcome into
//! a plain `bool` ("accepted for dispatch") and logs host failures instead of propagating
//! them: for the workflow a failed action is just one more reason to wait for the next
//! stimulus.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::platforms::AccessibilityHost;
use crate::{AutomationError, NodeHandle, UINode};

#[derive(Clone)]
pub struct ActionDispatcher {
    host: Arc<dyn AccessibilityHost>,
}

impl std::fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDispatcher").finish_non_exhaustive()
    }
}

impl ActionDispatcher {
    pub fn new(host: Arc<dyn AccessibilityHost>) -> Self {
        Self { host }
    }

    /// Fetch a fresh snapshot of the active window.
    pub fn fetch_root(&self) -> Option<UINode> {
        match self.host.active_root() {
            Ok(Some(root)) => Some(root),
            Ok(None) => {
                debug!("host has no active window");
                None
            }
            Err(e) => {
                warn!("Failed to fetch active window tree: {}", e);
                None
            }
        }
    }

    pub fn click(&self, target: &NodeHandle) -> bool {
        self.dispatch("click", Some(target), || self.host.click(target))
    }

    pub fn focus(&self, target: &NodeHandle) -> bool {
        self.dispatch("focus", Some(target), || self.host.focus(target))
    }

    pub fn set_text(&self, target: &NodeHandle, value: &str) -> bool {
        self.dispatch("set_text", Some(target), || self.host.set_text(target, value))
    }

    pub fn clear_focus(&self, target: &NodeHandle) -> bool {
        self.dispatch("clear_focus", Some(target), || self.host.clear_focus(target))
    }

    pub fn scroll_forward(&self, target: &NodeHandle) -> bool {
        self.dispatch("scroll_forward", Some(target), || {
            self.host.scroll_forward(target)
        })
    }

    pub fn go_back(&self) -> bool {
        self.dispatch("global_back", None, || self.host.global_back())
    }

    fn dispatch<F>(&self, action: &str, target: Option<&NodeHandle>, perform: F) -> bool
    where
        F: FnOnce() -> Result<bool, AutomationError>,
    {
        let described = target
            .map(NodeHandle::describe)
            .unwrap_or_else(|| "<global>".to_string());
        match perform() {
            Ok(true) => {
                info!(action, target = %described, "action dispatched");
                true
            }
            Ok(false) => {
                warn!(action, target = %described, "action rejected by host");
                false
            }
            Err(e) => {
                warn!(action, target = %described, "action failed: {}", e);
                false
            }
        }
    }
}
