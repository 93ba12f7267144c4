//! Aggregation engine.
//!
//! Each submodule is a pure function over canonical records. They share no
//! state and can run in any order; the scrape orchestrator calls the ones
//! whose inputs parsed successfully.
//!
//! Derived "other" figures are `total - alloc - idle` and are never clamped:
//! when slurmrestd reports overlapping or inconsistent per-node counts they
//! go negative, and that is exported as-is.

pub mod accounts;
pub mod cpus;
pub mod fairshare;
pub mod gpus;
pub mod node;
pub mod nodes;
pub mod partitions;
pub mod queue;
pub mod scheduler;

pub use accounts::{account_user_metrics, AccountUserMetrics, JobTally};
pub use cpus::{cpu_metrics, CpuMetrics};
pub use fairshare::fairshare_metrics;
pub use gpus::{gpu_metrics, GpuMetrics};
pub use node::{node_metrics, NodeMetrics};
pub use nodes::node_state_counts;
pub use partitions::{partition_metrics, PartitionMetrics};
pub use queue::{queue_metrics, QueueMetrics};
pub use scheduler::{scheduler_metrics, SchedulerMetrics};
