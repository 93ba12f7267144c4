//! Node count per state.

use ahash::AHashMap as HashMap;

use crate::schema::{NodeRecord, NodeState};

/// Counts nodes per state. Every state is present, unused ones at 0.
///
/// A node holding several states counts once in each of them.
pub fn node_state_counts(nodes: &[NodeRecord]) -> HashMap<NodeState, f64> {
    let mut counts: HashMap<NodeState, f64> = NodeState::all().map(|s| (s, 0.0)).collect();
    for node in nodes {
        let mut seen: Vec<NodeState> = Vec::with_capacity(node.states.len());
        for state in &node.states {
            if seen.contains(state) {
                continue;
            }
            seen.push(*state);
            *counts.entry(*state).or_insert(0.0) += 1.0;
        }
    }
    counts
}
