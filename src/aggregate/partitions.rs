//! Partition CPU usage and pending jobs.
//!
//! Nodes can belong to several partitions, so a partition's allocated and
//! idle CPUs reflect everything running on its member nodes, not only the
//! jobs submitted to it.

use ahash::AHashMap as HashMap;

use crate::schema::{JobRecord, JobState, NodeRecord, PartitionRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PartitionMetrics {
    pub cpus_allocated: f64,
    pub cpus_idle: f64,
    /// `cpus_total - cpus_allocated - cpus_idle`, not clamped.
    pub cpus_other: f64,
    pub cpus_total: f64,
    pub jobs_pending: f64,
}

pub fn partition_metrics(
    partitions: &[PartitionRecord],
    nodes: &[NodeRecord],
    jobs: &[JobRecord],
) -> HashMap<String, PartitionMetrics> {
    let mut pm: HashMap<String, PartitionMetrics> = partitions
        .iter()
        .map(|p| {
            let metrics = PartitionMetrics {
                cpus_total: p.cpus_total as f64,
                ..Default::default()
            };
            (p.name.clone(), metrics)
        })
        .collect();

    // partitions only named by a node start with cpus_total = 0
    for node in nodes {
        for partition in &node.partitions {
            let entry = pm.entry(partition.clone()).or_default();
            entry.cpus_allocated += node.cpus_alloc as f64;
            entry.cpus_idle += node.cpus_idle as f64;
        }
    }

    for metrics in pm.values_mut() {
        metrics.cpus_other = metrics.cpus_total - metrics.cpus_allocated - metrics.cpus_idle;
    }

    for job in jobs.iter().filter(|j| j.state == JobState::Pending) {
        for partition in job.partitions() {
            pm.entry(partition.to_string()).or_default().jobs_pending += 1.0;
        }
    }

    pm
}
