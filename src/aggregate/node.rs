//! Per-node CPU and memory rows.

use ahash::AHashMap as HashMap;

use crate::schema::NodeRecord;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMetrics {
    pub cpu_alloc: f64,
    pub cpu_idle: f64,
    /// `cpu_total - cpu_alloc - cpu_idle`, not clamped.
    pub cpu_other: f64,
    pub cpu_total: f64,
    pub mem_alloc: f64,
    pub mem_total: f64,
    /// Pipe-joined node states, e.g. `mix|drain`.
    pub status: String,
}

/// One row per hostname. A later node with the same hostname replaces
/// an earlier one.
pub fn node_metrics(nodes: &[NodeRecord]) -> HashMap<String, NodeMetrics> {
    nodes
        .iter()
        .map(|n| {
            let cpu_total = n.cpus_total as f64;
            let cpu_alloc = n.cpus_alloc as f64;
            let cpu_idle = n.cpus_idle as f64;
            let row = NodeMetrics {
                cpu_alloc,
                cpu_idle,
                cpu_other: cpu_total - cpu_alloc - cpu_idle,
                cpu_total,
                mem_alloc: n.memory_alloc as f64,
                mem_total: n.memory_total as f64,
                status: n.states_string("|"),
            };
            (n.hostname.clone(), row)
        })
        .collect()
}
