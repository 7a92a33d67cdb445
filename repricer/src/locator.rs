use tracing::{debug, instrument};

use crate::config::AutomationConfig;
use crate::element::NodeHandle;
use crate::errors::AutomationError;
use crate::selector::{parse_amount, Selector};
use crate::tree_search::{find_all, find_first, node_at};
use crate::UINode;

/// Finds nodes in a snapshot with a [`Selector`].
///
/// Locators never hold on to a tree: every call takes the root of the snapshot to search,
/// and callers are expected to pass a freshly fetched one. A miss is `None`, not an error;
/// it only means the screen has not reached the expected shape yet.
#[derive(Debug, Clone)]
pub struct Locator {
    selector: Selector,
    /// Act on the parent when the matched node itself is not clickable
    parent_when_unclickable: bool,
}

impl Locator {
    /// Create a new locator with the given selector
    pub fn new(selector: impl Into<Selector>) -> Self {
        Self {
            selector: selector.into(),
            parent_when_unclickable: false,
        }
    }

    /// Resolve matches to an interaction surface: a matched node that is not clickable is
    /// replaced by its immediate parent.
    pub fn clickable_target(mut self) -> Self {
        self.parent_when_unclickable = true;
        self
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    fn append_selector(&self, selector_to_append: Selector) -> Locator {
        let mut chain = match self.selector.clone() {
            Selector::And(existing) => existing,
            s => vec![s],
        };
        match selector_to_append {
            Selector::And(mut more) => chain.append(&mut more),
            s => chain.push(s),
        }
        Locator {
            selector: Selector::And(chain),
            parent_when_unclickable: self.parent_when_unclickable,
        }
    }

    /// Adds a filter to find elements based on their visibility.
    pub fn visible(&self, is_visible: bool) -> Locator {
        self.append_selector(Selector::Visible(is_visible))
    }

    /// Adds a filter to find elements based on their enabled flag.
    pub fn enabled(&self, is_enabled: bool) -> Locator {
        self.append_selector(Selector::Enabled(is_enabled))
    }

    /// First match in pre-order.
    pub fn first(&self, root: &UINode) -> Option<NodeHandle> {
        let (path, node) = find_first(root, |n| self.selector.matches(n))?;
        Some(self.action_target(root, NodeHandle::from_node(path, node)))
    }

    /// Every match in pre-order.
    pub fn all(&self, root: &UINode) -> Vec<NodeHandle> {
        find_all(root, |n| self.selector.matches(n))
            .into_iter()
            .map(|(path, node)| self.action_target(root, NodeHandle::from_node(path, node)))
            .collect()
    }

    fn action_target(&self, root: &UINode, matched: NodeHandle) -> NodeHandle {
        if !self.parent_when_unclickable || matched.attributes.clickable {
            return matched;
        }
        match matched.parent_path() {
            Some(parent_path) => match node_at(root, &parent_path) {
                Some(parent) => {
                    debug!(
                        "'{}' is not clickable, targeting its parent",
                        matched.attributes.display_name()
                    );
                    NodeHandle::from_node(parent_path, parent)
                }
                None => matched,
            },
            None => matched,
        }
    }

    /// Re-check a handle obtained from an older snapshot against `root`.
    ///
    /// Returns a refreshed handle when the node at the same path still satisfies this
    /// locator's selector, `None` otherwise.
    pub fn revalidate(&self, root: &UINode, handle: &NodeHandle) -> Option<NodeHandle> {
        let node = node_at(root, &handle.path)?;
        if node.id != handle.id || !self.selector.matches(node) {
            return None;
        }
        Some(NodeHandle::from_node(handle.path.clone(), node))
    }
}

/// The searches the workflow needs, built once from the configuration.
#[derive(Debug, Clone)]
pub struct ElementLocators {
    pub price_display: Locator,
    pub price_input: Locator,
    pub edit_button: Locator,
    pub save_button: Locator,
}

impl ElementLocators {
    pub fn from_config(config: &AutomationConfig) -> Result<Self, AutomationError> {
        // Pattern matches that do not parse as an amount are skipped
        let price_display = Locator::new(Selector::And(vec![
            Selector::TextPattern(config.price_regex()?),
            Selector::NumericText,
        ]));

        let price_input = Locator::new(Selector::And(vec![
            Selector::ClassName(config.text_entry_class.clone()),
            Selector::Or(vec![
                Selector::NumericText,
                Selector::HintContains(config.price_hint_markers.clone()),
            ]),
        ]))
        .enabled(true)
        .visible(true);

        let edit_button =
            Locator::new(Selector::TextIn(config.edit_labels.clone())).clickable_target();
        let save_button =
            Locator::new(Selector::TextIn(config.save_labels.clone())).clickable_target();

        Ok(Self {
            price_display,
            price_input,
            edit_button,
            save_button,
        })
    }

    /// The displayed price with separators stripped, first match in pre-order.
    #[instrument(level = "debug", skip_all)]
    pub fn find_price(&self, root: &UINode) -> Option<i64> {
        let handle = self.price_display.first(root)?;
        let price = handle.attributes.text.as_deref().and_then(parse_amount);
        debug!(?price, "price display matched {}", handle.describe());
        price
    }

    pub fn find_price_input(&self, root: &UINode) -> Option<NodeHandle> {
        self.price_input.first(root)
    }

    pub fn find_edit_button(&self, root: &UINode) -> Option<NodeHandle> {
        self.edit_button.first(root)
    }

    pub fn find_save_button(&self, root: &UINode) -> Option<NodeHandle> {
        self.save_button.first(root)
    }

    /// Use `cached` when it still points at a valid price field in `root`, otherwise look
    /// the field up again.
    pub fn resolve_price_input(
        &self,
        root: &UINode,
        cached: Option<&NodeHandle>,
    ) -> Option<NodeHandle> {
        cached
            .and_then(|handle| self.price_input.revalidate(root, handle))
            .or_else(|| self.find_price_input(root))
    }
}
