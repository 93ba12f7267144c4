//! Canonical, version-agnostic records built from slurmrestd payloads.
//!
//! Every record here is rebuilt from raw bytes on each scrape and dropped
//! once the aggregators have run.

use super::states::{JobState, NodeState};
use super::ApiVersion;

/// A job as seen by the aggregators.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub account: String,
    pub user_name: String,
    /// Comma-joined partition names the job was submitted to.
    pub partition: String,
    pub state: JobState,
    pub dependency: String,
    pub cpus: u64,
}

impl JobRecord {
    /// Partition names the job was submitted to.
    pub fn partitions(&self) -> impl Iterator<Item = &str> {
        self.partition.split(',').filter(|p| !p.is_empty())
    }

    pub fn has_dependency(&self) -> bool {
        !self.dependency.is_empty()
    }
}

/// A compute node as seen by the aggregators.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub name: String,
    pub hostname: String,
    /// Every state the node currently holds, in upstream order.
    pub states: Vec<NodeState>,
    pub partitions: Vec<String>,
    pub cpus_total: u64,
    pub cpus_alloc: u64,
    pub cpus_idle: u64,
    pub memory_total: u64,
    pub memory_alloc: u64,
    pub gpus_total: u64,
    pub gpus_alloc: u64,
}

impl NodeRecord {
    pub fn has_state(&self, state: NodeState) -> bool {
        self.states.contains(&state)
    }

    /// States joined with `sep`, e.g. `mix|drain`.
    pub fn states_string(&self, sep: &str) -> String {
        self.states
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(sep)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartitionRecord {
    pub name: String,
    pub cpus_total: u64,
    /// Configured node list expression, e.g. `n[01-16]`.
    pub configured_nodes: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShareRecord {
    pub account: String,
    pub effective_usage: f64,
}

/// Scheduler statistics from the diag endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagSnapshot {
    pub server_threads: u64,
    pub agent_queue_size: u64,
    pub dbd_queue_size: u64,
    pub schedule_cycle_last: u64,
    pub schedule_cycle_mean: u64,
    pub schedule_cycle_per_minute: u64,
    pub backfill_cycle_last: u64,
    pub backfill_cycle_mean: u64,
    pub backfill_depth_mean: u64,
    pub backfilled_jobs_since_start: u64,
    pub backfilled_jobs_since_cycle: u64,
    pub backfilled_heterogeneous_jobs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobsData {
    pub version: ApiVersion,
    pub jobs: Vec<JobRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodesData {
    pub version: ApiVersion,
    pub nodes: Vec<NodeRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartitionsData {
    pub version: ApiVersion,
    pub partitions: Vec<PartitionRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SharesData {
    pub version: ApiVersion,
    pub shares: Vec<ShareRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagData {
    pub version: ApiVersion,
    pub stats: DiagSnapshot,
}
