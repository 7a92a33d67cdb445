//! Pre-order depth-first searches over a snapshot tree
//!
//! Snapshots are strict hierarchies, so no visited-set is kept.

use crate::element::NodePath;
use crate::UINode;

/// Return the first node, in pre-order, for which `predicate` holds.
pub fn find_first<'a, P>(root: &'a UINode, predicate: P) -> Option<(NodePath, &'a UINode)>
where
    P: Fn(&UINode) -> bool,
{
    let mut path = Vec::new();
    find_first_inner(root, &predicate, &mut path).map(|node| (path, node))
}

fn find_first_inner<'a, P>(
    node: &'a UINode,
    predicate: &P,
    path: &mut NodePath,
) -> Option<&'a UINode>
where
    P: Fn(&UINode) -> bool,
{
    if predicate(node) {
        return Some(node);
    }
    for (index, child) in node.children.iter().enumerate() {
        path.push(index);
        if let Some(found) = find_first_inner(child, predicate, path) {
            return Some(found);
        }
        path.pop();
    }
    None
}

/// Return every node for which `predicate` holds, in pre-order.
pub fn find_all<'a, P>(root: &'a UINode, predicate: P) -> Vec<(NodePath, &'a UINode)>
where
    P: Fn(&UINode) -> bool,
{
    let mut matches = Vec::new();
    let mut path = Vec::new();
    find_all_inner(root, &predicate, &mut path, &mut matches);
    matches
}

fn find_all_inner<'a, P>(
    node: &'a UINode,
    predicate: &P,
    path: &mut NodePath,
    matches: &mut Vec<(NodePath, &'a UINode)>,
) where
    P: Fn(&UINode) -> bool,
{
    if predicate(node) {
        matches.push((path.clone(), node));
    }
    for (index, child) in node.children.iter().enumerate() {
        path.push(index);
        find_all_inner(child, predicate, path, matches);
        path.pop();
    }
}

/// Resolve a path produced by one of the searches above.
pub fn node_at<'a>(root: &'a UINode, path: &[usize]) -> Option<&'a UINode> {
    path.iter()
        .try_fold(root, |node, &index| node.children.get(index))
}

/// Mutable counterpart of [`node_at`], used by hosts that edit their live tree.
pub fn node_at_mut<'a>(root: &'a mut UINode, path: &[usize]) -> Option<&'a mut UINode> {
    let mut node = root;
    for &index in path {
        node = node.children.get_mut(index)?;
    }
    Some(node)
}
