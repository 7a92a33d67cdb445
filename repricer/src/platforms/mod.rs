use serde::{Deserialize, Serialize};

use crate::{AutomationError, NodeHandle, UINode};

pub mod scripted;

/// What changed in the controlled application, as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A new window or screen came to the foreground
    WindowStateChanged,
    /// Content inside the current window changed
    WindowContentChanged,
}

/// A change notification pushed by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessibilityEvent {
    /// Package of the application that produced the event
    pub package: String,
    pub kind: EventKind,
}

impl AccessibilityEvent {
    pub fn window_state_changed(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            kind: EventKind::WindowStateChanged,
        }
    }

    pub fn content_changed(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            kind: EventKind::WindowContentChanged,
        }
    }
}

/// The seam to the platform's assistive-action layer.
///
/// Every action is fire-and-forget: `Ok(true)` means the host accepted the action for
/// dispatch, not that the screen has changed. Targets are resolved by path against the
/// host's live tree, which may have moved on since the handle was produced; hosts report
/// such targets as [`AutomationError::ElementDetached`] or `Ok(false)`.
pub trait AccessibilityHost: Send + Sync {
    /// Root of the active window, `None` when no window is available.
    fn active_root(&self) -> Result<Option<UINode>, AutomationError>;

    fn click(&self, target: &NodeHandle) -> Result<bool, AutomationError>;

    /// Request accessibility/input focus on the target
    fn focus(&self, target: &NodeHandle) -> Result<bool, AutomationError>;

    /// Replace the target's text through the accessibility set-text action
    fn set_text(&self, target: &NodeHandle, text: &str) -> Result<bool, AutomationError>;

    /// Drop focus from the target so the application commits and validates its text
    fn clear_focus(&self, target: &NodeHandle) -> Result<bool, AutomationError>;

    fn scroll_forward(&self, target: &NodeHandle) -> Result<bool, AutomationError>;

    /// Screen-independent "navigate back"
    fn global_back(&self) -> Result<bool, AutomationError>;
}
