//! Wire types shared by every supported slurmrestd generation.
//!
//! Nodes, partitions and diag statistics are shaped the same in v0.0.40,
//! v0.0.41 and v0.0.42; the version modules only define what differs.

use serde::Deserialize;
use tracing::warn;

use super::models::{DiagSnapshot, JobRecord, NodeRecord, PartitionRecord};
use super::states::{JobState, NodeState};
use super::tres::gpu_count;
use super::WireResponse;
use crate::error::ParseError;
use crate::resource::Resource;

/// slurmrestd's optional number wrapper: `{"set": true, "infinite": false, "number": 4}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct NumberField {
    pub set: bool,
    pub infinite: bool,
    pub number: Option<f64>,
}

impl NumberField {
    pub fn as_f64(&self) -> f64 {
        if self.infinite {
            f64::MAX
        } else if self.set {
            self.number.unwrap_or(0.0)
        } else {
            0.0
        }
    }

    pub fn as_u64(&self) -> u64 {
        if self.infinite {
            u64::MAX
        } else {
            self.as_f64().max(0.0) as u64
        }
    }
}

/// Normalizes each wire record, dropping and logging the ones that fail.
pub(crate) fn collect_records<W, R>(
    resource: Resource,
    wire: Vec<W>,
    normalize: impl Fn(W) -> Result<R, ParseError>,
) -> Vec<R> {
    let mut records = Vec::with_capacity(wire.len());
    for (index, item) in wire.into_iter().enumerate() {
        match normalize(item) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping {} record #{}: {}", resource, index, e),
        }
    }
    records
}

pub(crate) fn required(
    value: Option<String>,
    record: &'static str,
    field: &'static str,
) -> Result<String, ParseError> {
    value.ok_or(ParseError::MissingField { record, field })
}

/// Fields every job generation carries; the version modules add the CPU count.
pub(crate) struct JobFields {
    pub account: Option<String>,
    pub user_name: Option<String>,
    pub partition: Option<String>,
    pub job_state: Vec<String>,
    pub dependency: Option<String>,
}

impl JobFields {
    pub fn into_record(self, cpus: u64) -> Result<JobRecord, ParseError> {
        Ok(JobRecord {
            account: required(self.account, "job", "account")?,
            user_name: required(self.user_name, "job", "user_name")?,
            state: JobState::classify_first(&self.job_state)?,
            partition: self.partition.unwrap_or_default(),
            dependency: self.dependency.unwrap_or_default(),
            cpus,
        })
    }
}

// ---------------------------------------------------------------- nodes

#[derive(Debug, Deserialize)]
pub(crate) struct NodesResponse {
    #[serde(default)]
    pub nodes: Vec<WireNode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct WireNode {
    pub name: Option<String>,
    pub hostname: Option<String>,
    pub state: Vec<String>,
    pub partitions: Vec<String>,
    pub tres: Option<String>,
    pub tres_used: Option<String>,
    pub cpus: Option<u64>,
    pub alloc_cpus: Option<u64>,
    pub alloc_idle_cpus: Option<u64>,
    pub real_memory: Option<u64>,
    pub alloc_memory: Option<u64>,
}

impl WireNode {
    fn into_record(self) -> Result<NodeRecord, ParseError> {
        let name = required(self.name, "node", "name")?;
        let hostname = required(self.hostname, "node", "hostname")?;
        let states = NodeState::classify_all(&self.state)?;
        let gpus_total = gpu_count(self.tres.as_deref().unwrap_or_default())?;
        let gpus_alloc = gpu_count(self.tres_used.as_deref().unwrap_or_default())?;

        Ok(NodeRecord {
            name,
            hostname,
            states,
            partitions: self.partitions,
            cpus_total: self.cpus.unwrap_or(0),
            cpus_alloc: self.alloc_cpus.unwrap_or(0),
            cpus_idle: self.alloc_idle_cpus.unwrap_or(0),
            memory_total: self.real_memory.unwrap_or(0),
            memory_alloc: self.alloc_memory.unwrap_or(0),
            gpus_total,
            gpus_alloc,
        })
    }
}

impl WireResponse for NodesResponse {
    type Canonical = Vec<NodeRecord>;
    const RESOURCE: Resource = Resource::Nodes;

    fn normalize(self) -> Self::Canonical {
        collect_records(Self::RESOURCE, self.nodes, WireNode::into_record)
    }
}

// ----------------------------------------------------------- partitions

#[derive(Debug, Deserialize)]
pub(crate) struct PartitionsResponse {
    #[serde(default)]
    pub partitions: Vec<WirePartition>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct WirePartition {
    pub name: Option<String>,
    pub cpus: WirePartitionCpus,
    pub nodes: WirePartitionNodes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct WirePartitionCpus {
    pub total: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct WirePartitionNodes {
    pub configured: Option<String>,
}

impl WirePartition {
    fn into_record(self) -> Result<PartitionRecord, ParseError> {
        Ok(PartitionRecord {
            name: required(self.name, "partition", "name")?,
            cpus_total: self.cpus.total.unwrap_or(0),
            configured_nodes: self.nodes.configured.unwrap_or_default(),
        })
    }
}

impl WireResponse for PartitionsResponse {
    type Canonical = Vec<PartitionRecord>;
    const RESOURCE: Resource = Resource::Partitions;

    fn normalize(self) -> Self::Canonical {
        collect_records(Self::RESOURCE, self.partitions, WirePartition::into_record)
    }
}

// ----------------------------------------------------------------- diag

#[derive(Debug, Deserialize)]
pub(crate) struct DiagResponse {
    #[serde(default)]
    pub statistics: WireStatistics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct WireStatistics {
    pub server_thread_count: Option<u64>,
    pub agent_queue_size: Option<u64>,
    pub dbd_agent_queue_size: Option<u64>,
    pub schedule_cycle_last: Option<u64>,
    pub schedule_cycle_mean: Option<u64>,
    pub schedule_cycle_per_minute: Option<u64>,
    pub bf_cycle_last: Option<u64>,
    pub bf_cycle_mean: Option<u64>,
    pub bf_depth_mean: Option<u64>,
    pub bf_backfilled_jobs: Option<u64>,
    pub bf_last_backfilled_jobs: Option<u64>,
    pub bf_backfilled_het_jobs: Option<u64>,
}

impl WireResponse for DiagResponse {
    type Canonical = DiagSnapshot;
    const RESOURCE: Resource = Resource::Diag;

    fn normalize(self) -> Self::Canonical {
        let s = self.statistics;
        DiagSnapshot {
            server_threads: s.server_thread_count.unwrap_or(0),
            agent_queue_size: s.agent_queue_size.unwrap_or(0),
            dbd_queue_size: s.dbd_agent_queue_size.unwrap_or(0),
            schedule_cycle_last: s.schedule_cycle_last.unwrap_or(0),
            schedule_cycle_mean: s.schedule_cycle_mean.unwrap_or(0),
            schedule_cycle_per_minute: s.schedule_cycle_per_minute.unwrap_or(0),
            backfill_cycle_last: s.bf_cycle_last.unwrap_or(0),
            backfill_cycle_mean: s.bf_cycle_mean.unwrap_or(0),
            backfill_depth_mean: s.bf_depth_mean.unwrap_or(0),
            backfilled_jobs_since_start: s.bf_backfilled_jobs.unwrap_or(0),
            backfilled_jobs_since_cycle: s.bf_last_backfilled_jobs.unwrap_or(0),
            backfilled_heterogeneous_jobs: s.bf_backfilled_het_jobs.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_field_values() {
        let set: NumberField =
            serde_json::from_str(r#"{"set": true, "infinite": false, "number": 4}"#).unwrap();
        assert_eq!(set.as_u64(), 4);

        let unset: NumberField =
            serde_json::from_str(r#"{"set": false, "infinite": false, "number": 9}"#).unwrap();
        assert_eq!(unset.as_u64(), 0);

        let infinite: NumberField =
            serde_json::from_str(r#"{"set": true, "infinite": true, "number": 0}"#).unwrap();
        assert_eq!(infinite.as_f64(), f64::MAX);
    }

    #[test]
    fn test_bad_records_are_skipped() {
        let body = r#"{"nodes": [
            {"name": "n1", "hostname": "n1", "state": ["IDLE"], "cpus": 8},
            {"hostname": "n2", "state": ["IDLE"]},
            {"name": "n3", "hostname": "n3", "state": ["HIBERNATING"]},
            {"name": "n4", "hostname": "n4", "state": ["IDLE"], "tres": "gres/gpu=x"}
        ]}"#;
        let resp: NodesResponse = serde_json::from_str(body).unwrap();
        let nodes = resp.normalize();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "n1");
        assert_eq!(nodes[0].cpus_total, 8);
    }

    #[test]
    fn test_node_optional_fields_default_to_zero() {
        let body = r#"{"nodes": [{"name": "n1", "hostname": "h1", "state": ["DOWN"],
            "tres": null, "alloc_memory": null}]}"#;
        let resp: NodesResponse = serde_json::from_str(body).unwrap();
        let node = &resp.normalize()[0];
        assert_eq!(node.memory_alloc, 0);
        assert_eq!(node.gpus_total, 0);
        assert!(node.partitions.is_empty());
    }

    #[test]
    fn test_partition_requires_name() {
        let body = r#"{"partitions": [
            {"name": "cpu", "cpus": {"total": 256}, "nodes": {"configured": "n[01-04]"}},
            {"cpus": {"total": 64}}
        ]}"#;
        let resp: PartitionsResponse = serde_json::from_str(body).unwrap();
        let partitions = resp.normalize();
        assert_eq!(partitions.len(), 1);
        assert_eq!(partitions[0].cpus_total, 256);
        assert_eq!(partitions[0].configured_nodes, "n[01-04]");
    }
}
