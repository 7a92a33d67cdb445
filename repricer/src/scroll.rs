//! Forced scrolling of the main content container
//!
//! The main container is taken to be the tallest scrollable node; small nested scrollables
//! (carousels, chip rows) are shorter and lose.

use tracing::debug;

use crate::actions::ActionDispatcher;
use crate::tree_search::find_all;
use crate::{NodeHandle, UINode};

/// The scrollable node with the greatest height; the first one in pre-order on ties.
pub fn find_scrollable(root: &UINode) -> Option<NodeHandle> {
    find_all(root, |n| n.attributes.scrollable)
        .into_iter()
        .fold(None, |best: Option<(crate::NodePath, &UINode)>, candidate| match best {
            Some(current) if current.1.attributes.height() >= candidate.1.attributes.height() => {
                Some(current)
            }
            _ => Some(candidate),
        })
        .map(|(path, node)| NodeHandle::from_node(path, node))
}

/// Issue one forward scroll on the main container of `root`.
///
/// Returns whether a container was found and the scroll accepted for dispatch, not whether
/// anything moved.
pub fn perform_scroll(dispatcher: &ActionDispatcher, root: &UINode) -> bool {
    match find_scrollable(root) {
        Some(container) => dispatcher.scroll_forward(&container),
        None => {
            debug!("no scrollable container in snapshot");
            false
        }
    }
}
