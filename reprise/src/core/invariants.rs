//! Structural invariants of a tracker tree.

use std::collections::HashSet;

use crate::core::path::node_path;
use crate::core::tracker::{NodeId, TrackerContext};
use crate::core::types::{NodeKind, NodeState};

/// Check invariants the opening policy relies on:
/// - No two siblings share a key
/// - Every child points back at its parent
/// - Sections other than the root are never `NotStarted`
/// - A `Completed` section below the root has only complete children
pub fn validate_invariants(tracker: &TrackerContext) -> Vec<String> {
    let mut errors = Vec::new();
    validate_node(tracker, NodeId::ROOT, &mut errors);
    errors
}

fn validate_node(tracker: &TrackerContext, id: NodeId, errors: &mut Vec<String>) {
    let node = tracker.node(id);
    let path = node_path(tracker, id);

    let mut seen = HashSet::new();
    for &child in node.children() {
        let child_node = tracker.node(child);
        if !seen.insert(child_node.key()) {
            errors.push(format!("{}: duplicate child key {}", path, child_node.key()));
        }
        if child_node.parent() != Some(id) {
            errors.push(format!(
                "{}: child {} has a different parent",
                path,
                child_node.key()
            ));
        }
    }

    if id != NodeId::ROOT
        && node.kind() == NodeKind::Section
        && node.state() == NodeState::NotStarted
    {
        errors.push(format!("{}: section recorded but never opened", path));
    }

    if id != NodeId::ROOT
        && node.kind() == NodeKind::Section
        && node.state() == NodeState::Completed
    {
        let incomplete = node
            .children()
            .iter()
            .filter(|child| !tracker.node(**child).state().is_complete())
            .count();
        if incomplete > 0 {
            errors.push(format!(
                "{}: completed with {} incomplete children",
                path, incomplete
            ));
        }
    }

    for &child in node.children() {
        validate_node(tracker, child, errors);
    }
}
