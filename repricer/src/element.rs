use serde::{Deserialize, Serialize};
use std::fmt;

use crate::UINode;

/// Child indices leading from the snapshot root to a node. The empty path is the root.
pub type NodePath = Vec<usize>;

/// Screen rectangle of a node, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Vertical extent; negative rectangles count as zero, extreme ones saturate.
    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top).max(0)
    }

    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left).max(0)
    }
}

/// Helper functions for clean serialization
fn is_empty_string(opt: &Option<String>) -> bool {
    match opt {
        Some(s) => s.is_empty(),
        None => true,
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_true(value: &bool) -> bool {
    *value
}

fn default_true() -> bool {
    true
}

/// Attributes associated with a node of the controlled application's tree
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct UIElementAttributes {
    /// Widget class, e.g. `android.widget.EditText`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub class_name: String,
    #[serde(default, skip_serializing_if = "is_empty_string")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "is_empty_string")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub clickable: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub scrollable: bool,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub enabled: bool,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub visible: bool,
}

impl Default for UIElementAttributes {
    fn default() -> Self {
        Self {
            class_name: String::new(),
            text: None,
            hint: None,
            bounds: None,
            clickable: false,
            scrollable: false,
            enabled: true,
            visible: true,
        }
    }
}

impl UIElementAttributes {
    /// Display text with surrounding whitespace removed, if any text is present.
    pub fn trimmed_text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim)
    }

    /// Height of the node's bounds, zero when the host reported none.
    pub fn height(&self) -> i32 {
        self.bounds.map(|b| b.height()).unwrap_or(0)
    }

    /// Short human-readable label used in logs.
    pub fn display_name(&self) -> String {
        self.trimmed_text()
            .filter(|t| !t.is_empty())
            .or_else(|| self.hint.as_deref())
            .map(|t| format!("{} '{}'", self.class_name, t))
            .unwrap_or_else(|| self.class_name.clone())
    }
}

impl fmt::Debug for UIElementAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug_struct = f.debug_struct("UIElementAttributes");

        if !self.class_name.is_empty() {
            debug_struct.field("class_name", &self.class_name);
        }

        if let Some(ref text) = self.text {
            if !text.is_empty() {
                debug_struct.field("text", text);
            }
        }

        if let Some(ref hint) = self.hint {
            if !hint.is_empty() {
                debug_struct.field("hint", hint);
            }
        }

        if let Some(ref bounds) = self.bounds {
            debug_struct.field("bounds", bounds);
        }

        // Flags only show when they differ from the common case
        if self.clickable {
            debug_struct.field("clickable", &true);
        }
        if self.scrollable {
            debug_struct.field("scrollable", &true);
        }
        if !self.enabled {
            debug_struct.field("enabled", &false);
        }
        if !self.visible {
            debug_struct.field("visible", &false);
        }

        debug_struct.finish()
    }
}

/// A node located inside one snapshot, addressed by its path from the root.
///
/// The handle carries a copy of the attributes seen at lookup time. It says nothing about
/// the live tree afterwards: hosts resolve `path` against whatever they currently show, and
/// callers that hold a handle across a scheduling boundary must re-validate it against a
/// fresh snapshot (see [`crate::Locator::revalidate`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeHandle {
    pub path: NodePath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub attributes: UIElementAttributes,
}

impl NodeHandle {
    pub fn from_node(path: NodePath, node: &UINode) -> Self {
        Self {
            path,
            id: node.id.clone(),
            attributes: node.attributes.clone(),
        }
    }

    /// Path of the immediate parent, `None` for the root.
    pub fn parent_path(&self) -> Option<NodePath> {
        if self.path.is_empty() {
            None
        } else {
            Some(self.path[..self.path.len() - 1].to_vec())
        }
    }

    pub fn describe(&self) -> String {
        match &self.id {
            Some(id) => format!("#{id} {}", self.attributes.display_name()),
            None => format!("{:?} {}", self.path, self.attributes.display_name()),
        }
    }
}
