//! Tag filtering over subtrees.
//!
//! Applying a filter rewrites the persisted `collapsed` flags: branches whose
//! subtree carries the tag are expanded, everything else is collapsed.
//! Clearing the filter leaves the flags as they are.

use std::collections::{BTreeSet, HashSet};

use crate::models::Node;
use crate::store::Tree;

/// True if the node or any of its descendants carries `tag`.
pub fn matches_tag_in_subtree(tree: &Tree, node: &Node, tag: &str) -> bool {
    let mut seen = HashSet::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if !seen.insert(current.id.as_str()) {
            continue;
        }
        if current.has_tag(tag) {
            return true;
        }
        stack.extend(tree.children_of(Some(current.id.as_str())));
    }
    false
}

/// Ids of every node whose subtree carries `tag`, computed by marking the
/// ancestors of each direct match once.
pub fn subtree_matches(tree: &Tree, tag: &str) -> HashSet<String> {
    let mut matched: HashSet<String> = HashSet::new();
    for node in tree.iter().filter(|n| n.has_tag(tag)) {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if !matched.insert(current.id.clone()) {
                break;
            }
            cursor = current.parent_id.as_deref().and_then(|p| tree.find(p));
        }
    }
    matched
}

/// Nodes carrying `tag` directly, in document order.
pub fn direct_matches(tree: &Tree, tag: &str) -> Vec<String> {
    tree.iter()
        .filter(|n| n.has_tag(tag))
        .map(|n| n.id.clone())
        .collect()
}

/// Rewrite every `collapsed` flag for `tag` and return the directly matching ids.
pub fn apply_tag_filter(tree: &mut Tree, tag: &str) -> Vec<String> {
    let expanded = subtree_matches(tree, tag);
    tree.set_collapsed_where(|node| !expanded.contains(&node.id));
    direct_matches(tree, tag)
}

/// Every distinct tag in use, alphabetically.
pub fn all_tags(tree: &Tree) -> Vec<String> {
    tree.iter()
        .flat_map(|n| n.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
