//! Scenario-driven host used for replays and tests
//!
//! A [`Scenario`] is a small graph of screens. Each screen carries the tree the host
//! reports while it is shown, plus the transitions triggered by clicks, forward scrolls
//! and the global back action. Text replacement edits the live copy of the current
//! screen, so later snapshots see the new value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, trace};

use crate::platforms::{AccessibilityEvent, AccessibilityHost};
use crate::tree_search::{find_all, node_at, node_at_mut};
use crate::{AutomationError, NodeHandle, UINode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    pub root: UINode,
    /// Node id or text to the screen shown after that node is clicked
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub on_click: BTreeMap<String, String>,
    /// Screen shown after a forward scroll on any scrollable node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_scroll: Option<String>,
    /// Screen shown after the global back action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_back: Option<String>,
}

impl Screen {
    pub fn new(root: UINode) -> Self {
        Self {
            root,
            on_click: BTreeMap::new(),
            on_scroll: None,
            on_back: None,
        }
    }

    pub fn on_click(mut self, key: impl Into<String>, screen: impl Into<String>) -> Self {
        self.on_click.insert(key.into(), screen.into());
        self
    }

    pub fn on_scroll(mut self, screen: impl Into<String>) -> Self {
        self.on_scroll = Some(screen.into());
        self
    }

    pub fn on_back(mut self, screen: impl Into<String>) -> Self {
        self.on_back = Some(screen.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Package reported in every emitted event
    pub package: String,
    /// Screen shown first
    pub start: String,
    pub screens: BTreeMap<String, Screen>,
    /// Number of set-text actions rejected before one is accepted
    #[serde(default)]
    pub reject_set_text: u32,
}

impl Scenario {
    pub fn new(package: impl Into<String>, start: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            start: start.into(),
            screens: BTreeMap::new(),
            reject_set_text: 0,
        }
    }

    pub fn with_screen(mut self, name: impl Into<String>, screen: Screen) -> Self {
        self.screens.insert(name.into(), screen);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, AutomationError> {
        let scenario: Self = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Every referenced screen must exist.
    pub fn validate(&self) -> Result<(), AutomationError> {
        let known = |name: &str, context: &str| {
            if self.screens.contains_key(name) {
                Ok(())
            } else {
                Err(AutomationError::Scenario(format!(
                    "{context} refers to unknown screen '{name}'"
                )))
            }
        };
        known(&self.start, "start")?;
        for (name, screen) in &self.screens {
            for (key, target) in &screen.on_click {
                known(target, &format!("screen '{name}' on_click '{key}'"))?;
            }
            if let Some(target) = &screen.on_scroll {
                known(target, &format!("screen '{name}' on_scroll"))?;
            }
            if let Some(target) = &screen.on_back {
                known(target, &format!("screen '{name}' on_back"))?;
            }
        }
        Ok(())
    }
}

/// One accepted action, as seen by the scripted host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecordedAction {
    Click { screen: String, target: String },
    Focus { screen: String, target: String },
    SetText { screen: String, target: String, text: String },
    ClearFocus { screen: String, target: String },
    ScrollForward { screen: String, target: String },
    GlobalBack { screen: String },
}

type EventSink = Box<dyn Fn(AccessibilityEvent) + Send + Sync>;

struct HostState {
    screens: BTreeMap<String, Screen>,
    current: String,
    actions: Vec<RecordedAction>,
    set_text_rejections_left: u32,
}

impl HostState {
    fn screen(&self) -> Result<&Screen, AutomationError> {
        self.screens.get(&self.current).ok_or_else(|| {
            AutomationError::Scenario(format!("current screen '{}' is missing", self.current))
        })
    }

    fn resolve(&self, target: &NodeHandle) -> Result<&UINode, AutomationError> {
        node_at(&self.screen()?.root, &target.path).ok_or_else(|| {
            AutomationError::ElementDetached(format!(
                "{} is not on screen '{}'",
                target.describe(),
                self.current
            ))
        })
    }
}

/// A host that plays a [`Scenario`] and records what was done to it.
pub struct ScriptedHost {
    package: String,
    state: Mutex<HostState>,
    sink: Mutex<Option<EventSink>>,
}

impl ScriptedHost {
    pub fn new(scenario: Scenario) -> Result<Self, AutomationError> {
        scenario.validate()?;
        Ok(Self {
            package: scenario.package,
            state: Mutex::new(HostState {
                screens: scenario.screens,
                current: scenario.start,
                actions: Vec::new(),
                set_text_rejections_left: scenario.reject_set_text,
            }),
            sink: Mutex::new(None),
        })
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Deliver the events this host produces (screen switches, text edits, focus
    /// changes) to `sink`.
    pub fn set_event_sink<F>(&self, sink: F)
    where
        F: Fn(AccessibilityEvent) + Send + Sync + 'static,
    {
        if let Ok(mut guard) = self.sink.lock() {
            *guard = Some(Box::new(sink));
        }
    }

    pub fn actions(&self) -> Vec<RecordedAction> {
        self.lock().map(|s| s.actions.clone()).unwrap_or_default()
    }

    pub fn current_screen(&self) -> String {
        self.lock().map(|s| s.current.clone()).unwrap_or_default()
    }

    /// Live tree of a screen, including text edits made so far.
    pub fn screen_root(&self, name: &str) -> Option<UINode> {
        self.lock()
            .ok()
            .and_then(|s| s.screens.get(name).map(|screen| screen.root.clone()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, HostState>, AutomationError> {
        self.state.lock().map_err(|e| {
            AutomationError::PlatformError(format!("scripted host state poisoned: {e}"))
        })
    }

    fn emit(&self, event: AccessibilityEvent) {
        trace!(?event, "scripted host event");
        if let Ok(guard) = self.sink.lock() {
            if let Some(sink) = guard.as_ref() {
                sink(event);
            }
        }
    }

    fn switch_to(&self, state: &mut HostState, screen: String) {
        debug!(from = %state.current, to = %screen, "scripted host switching screen");
        state.current = screen;
    }
}

/// Keys under which a clicked node may appear in `on_click`: its id, its own text, then the
/// text of its descendants in pre-order (a container clicked on behalf of its label).
fn click_keys(node: &UINode) -> Vec<String> {
    let mut keys: Vec<String> = node.id.iter().cloned().collect();
    keys.extend(
        find_all(node, |n| n.attributes.trimmed_text().is_some_and(|t| !t.is_empty()))
            .into_iter()
            .filter_map(|(_, n)| n.attributes.trimmed_text().map(str::to_string)),
    );
    keys
}

impl AccessibilityHost for ScriptedHost {
    fn active_root(&self) -> Result<Option<UINode>, AutomationError> {
        let state = self.lock()?;
        Ok(Some(state.screen()?.root.clone()))
    }

    fn click(&self, target: &NodeHandle) -> Result<bool, AutomationError> {
        let event = {
            let mut state = self.lock()?;
            let node = state.resolve(target)?;
            if !node.attributes.enabled {
                return Ok(false);
            }
            let next = click_keys(node)
                .iter()
                .find_map(|key| state.screen().ok()?.on_click.get(key).cloned());
            let screen = state.current.clone();
            state.actions.push(RecordedAction::Click {
                screen,
                target: target.describe(),
            });
            next.map(|next| {
                self.switch_to(&mut state, next);
                AccessibilityEvent::window_state_changed(&self.package)
            })
        };
        if let Some(event) = event {
            self.emit(event);
        }
        Ok(true)
    }

    fn focus(&self, target: &NodeHandle) -> Result<bool, AutomationError> {
        {
            let mut state = self.lock()?;
            if !state.resolve(target)?.attributes.enabled {
                return Ok(false);
            }
            let screen = state.current.clone();
            state.actions.push(RecordedAction::Focus {
                screen,
                target: target.describe(),
            });
        }
        self.emit(AccessibilityEvent::content_changed(&self.package));
        Ok(true)
    }

    fn set_text(&self, target: &NodeHandle, text: &str) -> Result<bool, AutomationError> {
        {
            let mut state = self.lock()?;
            state.resolve(target)?;
            if state.set_text_rejections_left > 0 {
                state.set_text_rejections_left -= 1;
                debug!("scripted host rejecting set-text");
                return Ok(false);
            }
            let current = state.current.clone();
            let node = state
                .screens
                .get_mut(&current)
                .and_then(|screen| node_at_mut(&mut screen.root, &target.path))
                .ok_or_else(|| AutomationError::ElementDetached(target.describe()))?;
            node.attributes.text = Some(text.to_string());
            state.actions.push(RecordedAction::SetText {
                screen: current,
                target: target.describe(),
                text: text.to_string(),
            });
        }
        self.emit(AccessibilityEvent::content_changed(&self.package));
        Ok(true)
    }

    fn clear_focus(&self, target: &NodeHandle) -> Result<bool, AutomationError> {
        {
            let mut state = self.lock()?;
            state.resolve(target)?;
            let screen = state.current.clone();
            state.actions.push(RecordedAction::ClearFocus {
                screen,
                target: target.describe(),
            });
        }
        self.emit(AccessibilityEvent::content_changed(&self.package));
        Ok(true)
    }

    fn scroll_forward(&self, target: &NodeHandle) -> Result<bool, AutomationError> {
        {
            let mut state = self.lock()?;
            if !state.resolve(target)?.attributes.scrollable {
                return Ok(false);
            }
            let screen = state.current.clone();
            let next = state.screen()?.on_scroll.clone();
            state.actions.push(RecordedAction::ScrollForward {
                screen,
                target: target.describe(),
            });
            if let Some(next) = next {
                self.switch_to(&mut state, next);
            }
        }
        self.emit(AccessibilityEvent::content_changed(&self.package));
        Ok(true)
    }

    fn global_back(&self) -> Result<bool, AutomationError> {
        let switched = {
            let mut state = self.lock()?;
            let screen = state.current.clone();
            let next = state.screen()?.on_back.clone();
            state.actions.push(RecordedAction::GlobalBack { screen });
            match next {
                Some(next) => {
                    self.switch_to(&mut state, next);
                    true
                }
                None => false,
            }
        };
        if switched {
            self.emit(AccessibilityEvent::window_state_changed(&self.package));
        }
        Ok(true)
    }
}
