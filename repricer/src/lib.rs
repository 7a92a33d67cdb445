//! Price-lowering automation driven through accessibility APIs
//!
//! This crate drives a listing-edit workflow inside a mobile application it does not
//! control: it reads the listed price, opens the edit screen, scrolls until the price
//! field materializes, enters a lower price, saves and navigates back. Everything it knows
//! about the application comes from tree snapshots handed over by an
//! [`AccessibilityHost`], and every action it takes is fire-and-forget.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod actions;
pub mod config;
pub mod controller;
pub mod element;
pub mod errors;
pub mod locator;
pub mod platforms;
pub mod scroll;
pub mod selector;
pub mod service;
pub mod session;
#[cfg(test)]
mod tests;
pub mod tree_search;

pub use actions::ActionDispatcher;
pub use config::{AutomationConfig, ExhaustionPolicy, FocusStrategy};
pub use controller::{DeferredTask, PhaseController, Step};
pub use element::{Bounds, NodeHandle, NodePath, UIElementAttributes};
pub use errors::AutomationError;
pub use locator::Locator;
pub use platforms::{AccessibilityEvent, AccessibilityHost, EventKind};
pub use selector::Selector;
pub use service::{AutomationService, ServiceHandle};
pub use session::{AutomationSession, Phase, SessionStatus};

/// Represents a node in the UI tree, containing its attributes and children.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct UINode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: UIElementAttributes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<UINode>,
}

impl fmt::Debug for UINode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&DepthLimited { node: self, depth: 0 }, f)
    }
}

/// Deep trees are cut off in debug output
const DEBUG_MAX_DEPTH: usize = 100;

struct DepthLimited<'a> {
    node: &'a UINode,
    depth: usize,
}

impl fmt::Debug for DepthLimited<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.node;
        let mut out = f.debug_struct("UINode");
        if let Some(id) = &node.id {
            out.field("id", id);
        }
        out.field("attributes", &node.attributes);
        if node.children.is_empty() {
            return out.finish();
        }
        if self.depth >= DEBUG_MAX_DEPTH {
            let elided = format!("[{} children below depth limit]", node.children.len());
            return out.field("children", &elided).finish();
        }
        let children: Vec<DepthLimited<'_>> = node
            .children
            .iter()
            .map(|child| DepthLimited {
                node: child,
                depth: self.depth + 1,
            })
            .collect();
        out.field("children", &children).finish()
    }
}

impl UINode {
    /// Create a bare node of the given widget class.
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            id: None,
            attributes: UIElementAttributes {
                class_name: class_name.into(),
                ..Default::default()
            },
            children: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.attributes.text = Some(text.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.attributes.hint = Some(hint.into());
        self
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.attributes.bounds = Some(bounds);
        self
    }

    pub fn clickable(mut self) -> Self {
        self.attributes.clickable = true;
        self
    }

    /// Mark the node scrollable and give it a full-width region `height` pixels tall.
    pub fn scrollable(mut self, height: i32) -> Self {
        self.attributes.scrollable = true;
        self.attributes.bounds = Some(Bounds::new(0, 0, 1080, height));
        self
    }

    pub fn disabled(mut self) -> Self {
        self.attributes.enabled = false;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.attributes.visible = false;
        self
    }

    pub fn with_child(mut self, child: UINode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = UINode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(UINode::node_count).sum::<usize>()
    }
}
