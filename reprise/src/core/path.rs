//! Helpers for rendering deterministic node paths.

use crate::core::tracker::{NodeId, TrackerContext};

/// Return the `/`-separated path from the root to `target`.
///
/// Section segments are their names; generator segments render as
/// `name=value` using the cursor's current element.
pub fn node_path(tracker: &TrackerContext, target: NodeId) -> String {
    let mut segments = Vec::new();
    let mut cursor = Some(target);
    while let Some(id) = cursor {
        segments.push(segment(tracker, id));
        cursor = tracker.node(id).parent();
    }
    segments.reverse();
    segments.join("/")
}

fn segment(tracker: &TrackerContext, id: NodeId) -> String {
    let node = tracker.node(id);
    match node.generator() {
        Some(generator) => format!("{}={}", node.key().name, generator.current_as_string()),
        None => node.key().name.clone(),
    }
}
