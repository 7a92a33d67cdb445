use crate::tree_search::{find_all, find_first, node_at, node_at_mut};
use crate::UINode;

use super::label;

fn sample_tree() -> UINode {
    UINode::new("root").with_children([
        UINode::new("group")
            .with_id("a")
            .with_children([label("one"), label("two")]),
        UINode::new("group").with_id("b").with_child(label("three")),
        label("four"),
    ])
}

#[test]
fn test_find_first_is_preorder() {
    let tree = sample_tree();

    let (path, node) = find_first(&tree, |n| n.attributes.class_name == "group").unwrap();
    assert_eq!(path, vec![0]);
    assert_eq!(node.id.as_deref(), Some("a"));

    // A parent is visited before its children
    let (path, _) = find_first(&tree, |n| n.attributes.class_name == "root").unwrap();
    assert!(path.is_empty());
}

#[test]
fn test_find_first_descends_before_moving_right() {
    let tree = sample_tree();
    let (path, node) = find_first(&tree, |n| n.attributes.text.is_some()).unwrap();
    assert_eq!(path, vec![0, 0]);
    assert_eq!(node.attributes.text.as_deref(), Some("one"));
}

#[test]
fn test_find_all_order_and_paths() {
    let tree = sample_tree();
    let texts: Vec<(Vec<usize>, String)> = find_all(&tree, |n| n.attributes.text.is_some())
        .into_iter()
        .map(|(path, n)| (path, n.attributes.text.clone().unwrap()))
        .collect();
    assert_eq!(
        texts,
        vec![
            (vec![0, 0], "one".to_string()),
            (vec![0, 1], "two".to_string()),
            (vec![1, 0], "three".to_string()),
            (vec![2], "four".to_string()),
        ]
    );
}

#[test]
fn test_no_match() {
    let tree = sample_tree();
    assert!(find_first(&tree, |n| n.attributes.clickable).is_none());
    assert!(find_all(&tree, |n| n.attributes.clickable).is_empty());
}

#[test]
fn test_node_at_resolves_search_paths() {
    let tree = sample_tree();
    for (path, node) in find_all(&tree, |_| true) {
        assert_eq!(node_at(&tree, &path), Some(node));
    }
    assert!(node_at(&tree, &[5]).is_none());
    assert!(node_at(&tree, &[0, 0, 0]).is_none());
    assert_eq!(tree.node_count(), 7);
}

#[test]
fn test_node_at_mut_edits_in_place() {
    let mut tree = sample_tree();
    node_at_mut(&mut tree, &[1, 0]).unwrap().attributes.text = Some("3".to_string());
    assert_eq!(
        node_at(&tree, &[1, 0]).unwrap().attributes.text.as_deref(),
        Some("3")
    );
}
