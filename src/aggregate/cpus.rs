//! Cluster-wide CPU allocation.

use crate::schema::{JobRecord, JobState, NodeRecord, NodeState};

/// Node states whose idle CPUs are counted as schedulable.
const SCHEDULABLE_STATES: [NodeState; 3] = [NodeState::Mix, NodeState::Alloc, NodeState::Idle];

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuMetrics {
    pub alloc: f64,
    pub idle: f64,
    /// `total - idle - alloc`; negative when upstream data is inconsistent.
    pub other: f64,
    pub total: f64,
}

/// Allocated CPUs come from running jobs, capacity from nodes.
///
/// Single-CPU nodes are left out of the capacity figures.
pub fn cpu_metrics(jobs: &[JobRecord], nodes: &[NodeRecord]) -> CpuMetrics {
    let mut cm = CpuMetrics::default();

    cm.alloc = jobs
        .iter()
        .filter(|j| j.state == JobState::Running)
        .map(|j| j.cpus as f64)
        .sum();

    for node in nodes.iter().filter(|n| n.cpus_total != 1) {
        cm.total += node.cpus_total as f64;
        if SCHEDULABLE_STATES.iter().any(|s| node.has_state(*s)) {
            cm.idle += node.cpus_idle as f64;
        }
    }

    cm.other = cm.total - cm.idle - cm.alloc;
    cm
}
