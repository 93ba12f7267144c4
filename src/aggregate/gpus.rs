//! Cluster-wide GPU allocation from node TRES counts.

use crate::schema::NodeRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GpuMetrics {
    pub alloc: f64,
    pub idle: f64,
    pub other: f64,
    pub total: f64,
    /// `alloc / total`, 0 on clusters without GPUs.
    pub utilization: f64,
}

pub fn gpu_metrics(nodes: &[NodeRecord]) -> GpuMetrics {
    let mut gm = GpuMetrics::default();
    for node in nodes {
        gm.total += node.gpus_total as f64;
        gm.alloc += node.gpus_alloc as f64;
        gm.idle += node.gpus_total as f64 - node.gpus_alloc as f64;
    }
    gm.other = gm.total - gm.alloc - gm.idle;
    gm.utilization = if gm.total > 0.0 {
        gm.alloc / gm.total
    } else {
        0.0
    };
    gm
}
