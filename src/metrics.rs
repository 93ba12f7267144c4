//! Prometheus metric families for slurm-rest-exporter.
//!
//! All families are registered once at startup on the shared registry.
//! Each scrape clears every collector family and records fresh values, so
//! accounts, users, partitions and nodes that vanished from the cluster
//! drop out of the exposition, and a family skipped on this scrape is
//! absent rather than showing the previous scrape's values.

use ahash::AHashMap as HashMap;
use prometheus::{CounterVec, Gauge, GaugeVec, Opts, Registry};

use crate::aggregate::{
    AccountUserMetrics, CpuMetrics, GpuMetrics, JobTally, NodeMetrics, PartitionMetrics,
    QueueMetrics, SchedulerMetrics,
};
use crate::resource::Resource;
use crate::schema::{JobState, NodeState};

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<Gauge, prometheus::Error> {
    let g = Gauge::new(name, help)?;
    registry.register(Box::new(g.clone()))?;
    Ok(g)
}

fn gauge_vec(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> Result<GaugeVec, prometheus::Error> {
    let g = GaugeVec::new(Opts::new(name, help), labels)?;
    registry.register(Box::new(g.clone()))?;
    Ok(g)
}

/// An unlabeled gauge that can be removed from the exposition.
///
/// Backed by a `GaugeVec` without labels: `set` creates the single sample
/// and `clear` drops it again.
#[derive(Clone)]
pub struct Scalar(GaugeVec);

impl Scalar {
    fn new(registry: &Registry, name: &str, help: &str) -> Result<Self, prometheus::Error> {
        gauge_vec(registry, name, help, &[]).map(Self)
    }

    pub fn set(&self, value: f64) {
        self.0.with_label_values(&[] as &[&str]).set(value);
    }

    pub fn clear(&self) {
        self.0.reset();
    }
}

/// Sets a keyed sample only when it carries a positive value.
fn set_positive(vec: &GaugeVec, label: &str, value: f64) {
    if value > 0.0 {
        vec.with_label_values(&[label]).set(value);
    }
}

/// `not_responding` -> `Not responding`
fn title(state: &str) -> String {
    let spaced = state.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn queue_help(state: JobState) -> String {
    match state {
        JobState::Pending => "Pending jobs in queue".to_string(),
        JobState::Failed => "Number of failed jobs".to_string(),
        JobState::Timeout => "Jobs stopped by timeout".to_string(),
        JobState::Preempted => "Number of preempted jobs".to_string(),
        JobState::NodeFail => "Number of jobs stopped due to node fail".to_string(),
        JobState::OutOfMemory => "Jobs stopped for running out of memory".to_string(),
        other => format!("{} jobs in the cluster", title(other.as_str())),
    }
}

#[derive(Clone)]
pub struct CpuGauges {
    pub alloc: Scalar,
    pub idle: Scalar,
    pub other: Scalar,
    pub total: Scalar,
}

#[derive(Clone)]
pub struct GpuGauges {
    pub alloc: Scalar,
    pub idle: Scalar,
    pub other: Scalar,
    pub total: Scalar,
    pub utilization: Scalar,
}

/// Per-node rows, labeled by `node` and `status`.
#[derive(Clone)]
pub struct NodeGauges {
    pub cpu_alloc: GaugeVec,
    pub cpu_idle: GaugeVec,
    pub cpu_other: GaugeVec,
    pub cpu_total: GaugeVec,
    pub mem_alloc: GaugeVec,
    pub mem_total: GaugeVec,
}

#[derive(Clone)]
pub struct PartitionGauges {
    pub cpus_allocated: GaugeVec,
    pub cpus_idle: GaugeVec,
    pub cpus_other: GaugeVec,
    pub cpus_total: GaugeVec,
    pub jobs_pending: GaugeVec,
}

#[derive(Clone)]
pub struct SchedulerGauges {
    pub threads: Scalar,
    pub queue_size: Scalar,
    pub dbd_queue_size: Scalar,
    pub last_cycle: Scalar,
    pub mean_cycle: Scalar,
    pub cycle_per_minute: Scalar,
    pub backfill_last_cycle: Scalar,
    pub backfill_mean_cycle: Scalar,
    pub backfill_depth_mean: Scalar,
    pub backfilled_jobs_since_start: Scalar,
    pub backfilled_jobs_since_cycle: Scalar,
    pub backfilled_heterogeneous: Scalar,
}

/// Job tallies keyed by one label, shared by the account and user families.
#[derive(Clone)]
pub struct TallyGauges {
    pub jobs_pending: GaugeVec,
    pub cpus_pending: GaugeVec,
    pub jobs_running: GaugeVec,
    pub cpus_running: GaugeVec,
    pub jobs_suspended: GaugeVec,
}

impl TallyGauges {
    fn new(registry: &Registry, prefix: &str, label: &str) -> Result<Self, prometheus::Error> {
        let vec = |suffix: &str, help: &str| {
            gauge_vec(
                registry,
                &format!("slurm_{}_{}", prefix, suffix),
                &format!("{} for {}", help, prefix),
                &[label],
            )
        };
        Ok(Self {
            jobs_pending: vec("jobs_pending", "Pending jobs")?,
            cpus_pending: vec("cpus_pending", "Pending CPUs")?,
            jobs_running: vec("jobs_running", "Running jobs")?,
            cpus_running: vec("cpus_running", "Running CPUs")?,
            jobs_suspended: vec("jobs_suspended", "Suspended jobs")?,
        })
    }

    fn record(&self, key: &str, tally: &JobTally) {
        set_positive(&self.jobs_pending, key, tally.pending);
        set_positive(&self.cpus_pending, key, tally.pending_cpus);
        set_positive(&self.jobs_running, key, tally.running);
        set_positive(&self.cpus_running, key, tally.running_cpus);
        set_positive(&self.jobs_suspended, key, tally.suspended);
    }

    fn reset(&self) {
        self.jobs_pending.reset();
        self.cpus_pending.reset();
        self.jobs_running.reset();
        self.cpus_running.reset();
        self.jobs_suspended.reset();
    }
}

/// Metrics about the exporter itself.
#[derive(Clone)]
pub struct ExporterGauges {
    pub scrape_duration_seconds: Gauge,
    pub scrape_success: Gauge,
    pub fetch_errors_total: CounterVec,
    pub collector_success: GaugeVec,
}

/// Every metric family the exporter exposes.
#[derive(Clone)]
pub struct SlurmMetrics {
    pub cpus: CpuGauges,
    /// Registered only when GPU accounting is enabled.
    pub gpus: Option<GpuGauges>,
    pub nodes: HashMap<NodeState, Scalar>,
    pub node: NodeGauges,
    pub partition: PartitionGauges,
    pub queue: HashMap<JobState, Scalar>,
    pub queue_pending_dependency: Scalar,
    pub scheduler: SchedulerGauges,
    pub fairshare: GaugeVec,
    pub account: TallyGauges,
    pub user: TallyGauges,
    pub exporter: ExporterGauges,
}

impl SlurmMetrics {
    /// Creates and registers all metric families with the registry.
    pub fn new(registry: &Registry, enable_gpus: bool) -> Result<Self, prometheus::Error> {
        let cpus = CpuGauges {
            alloc: Scalar::new(registry, "slurm_cpus_alloc", "Allocated CPUs")?,
            idle: Scalar::new(registry, "slurm_cpus_idle", "Idle CPUs")?,
            other: Scalar::new(registry, "slurm_cpus_other", "Mix CPUs")?,
            total: Scalar::new(registry, "slurm_cpus_total", "Total CPUs")?,
        };

        let gpus = if enable_gpus {
            Some(GpuGauges {
                alloc: Scalar::new(registry, "slurm_gpus_alloc", "Allocated GPUs")?,
                idle: Scalar::new(registry, "slurm_gpus_idle", "Idle GPUs")?,
                other: Scalar::new(registry, "slurm_gpus_other", "Other GPUs")?,
                total: Scalar::new(registry, "slurm_gpus_total", "Total GPUs")?,
                utilization: Scalar::new(registry, "slurm_gpus_utilization", "Total GPU utilization")?,
            })
        } else {
            None
        };

        let mut nodes = HashMap::new();
        for state in NodeState::all() {
            let g = Scalar::new(
                registry,
                &format!("slurm_nodes_{}", state.as_str()),
                &format!("{} nodes", title(state.as_str())),
            )?;
            nodes.insert(state, g);
        }

        let node_labels = &["node", "status"];
        let node = NodeGauges {
            cpu_alloc: gauge_vec(registry, "slurm_node_cpu_alloc", "Allocated CPUs per node", node_labels)?,
            cpu_idle: gauge_vec(registry, "slurm_node_cpu_idle", "Idle CPUs per node", node_labels)?,
            cpu_other: gauge_vec(registry, "slurm_node_cpu_other", "Other CPUs per node", node_labels)?,
            cpu_total: gauge_vec(registry, "slurm_node_cpu_total", "Total CPUs per node", node_labels)?,
            mem_alloc: gauge_vec(registry, "slurm_node_mem_alloc", "Allocated memory per node", node_labels)?,
            mem_total: gauge_vec(registry, "slurm_node_mem_total", "Total memory per node", node_labels)?,
        };

        let partition_labels = &["partition"];
        let partition = PartitionGauges {
            cpus_allocated: gauge_vec(
                registry,
                "slurm_partition_cpus_allocated",
                "Allocated CPUs for partition",
                partition_labels,
            )?,
            cpus_idle: gauge_vec(registry, "slurm_partition_cpus_idle", "Idle CPUs for partition", partition_labels)?,
            cpus_other: gauge_vec(registry, "slurm_partition_cpus_other", "Other CPUs for partition", partition_labels)?,
            cpus_total: gauge_vec(registry, "slurm_partition_cpus_total", "Total CPUs for partition", partition_labels)?,
            jobs_pending: gauge_vec(
                registry,
                "slurm_partition_jobs_pending",
                "Pending jobs for partition",
                partition_labels,
            )?,
        };

        let mut queue = HashMap::new();
        for state in JobState::all() {
            let g = Scalar::new(
                registry,
                &format!("slurm_queue_{}", state.as_str()),
                &queue_help(state),
            )?;
            queue.insert(state, g);
        }
        let queue_pending_dependency = Scalar::new(
            registry,
            "slurm_queue_pending_dependency",
            "Pending jobs because of dependency in queue",
        )?;

        let sdiag = |name: &str, what: &str| {
            Scalar::new(
                registry,
                &format!("slurm_scheduler_{}", name),
                &format!("Information provided by the Slurm sdiag command, {}", what),
            )
        };
        let scheduler = SchedulerGauges {
            threads: sdiag("threads", "number of scheduler threads")?,
            queue_size: sdiag("queue_size", "length of the scheduler queue")?,
            dbd_queue_size: sdiag("dbd_queue_size", "length of the DBD agent queue")?,
            last_cycle: sdiag("last_cycle", "scheduler last cycle time in (microseconds)")?,
            mean_cycle: sdiag("mean_cycle", "scheduler mean cycle time in (microseconds)")?,
            cycle_per_minute: sdiag("cycle_per_minute", "number scheduler cycles per minute")?,
            backfill_last_cycle: sdiag(
                "backfill_last_cycle",
                "scheduler backfill last cycle time in (microseconds)",
            )?,
            backfill_mean_cycle: sdiag(
                "backfill_mean_cycle",
                "scheduler backfill mean cycle time in (microseconds)",
            )?,
            backfill_depth_mean: sdiag("backfill_depth_mean", "scheduler backfill mean depth")?,
            backfilled_jobs_since_start: sdiag(
                "backfilled_jobs_since_start_total",
                "number of jobs started thanks to backfilling since last slurm start",
            )?,
            backfilled_jobs_since_cycle: sdiag(
                "backfilled_jobs_since_cycle_total",
                "number of jobs started thanks to backfilling since last time stats where reset",
            )?,
            backfilled_heterogeneous: sdiag(
                "backfilled_heterogeneous_total",
                "number of heterogeneous job components started thanks to backfilling since last Slurm start",
            )?,
        };

        let fairshare = gauge_vec(registry, "slurm_account_fairshare", "FairShare for account", &["account"])?;
        let account = TallyGauges::new(registry, "account", "account")?;
        let user = TallyGauges::new(registry, "user", "user")?;

        let fetch_errors_total = CounterVec::new(
            Opts::new(
                "slurm_exporter_fetch_errors_total",
                "Failed fetches from slurmrestd per resource",
            ),
            &["resource"],
        )?;
        registry.register(Box::new(fetch_errors_total.clone()))?;
        let exporter = ExporterGauges {
            scrape_duration_seconds: gauge(
                registry,
                "slurm_exporter_scrape_duration_seconds",
                "Duration of the last scrape in seconds",
            )?,
            scrape_success: gauge(
                registry,
                "slurm_exporter_scrape_success",
                "Whether every resource of the last scrape was fetched (1) or not (0)",
            )?,
            fetch_errors_total,
            collector_success: gauge_vec(
                registry,
                "slurm_exporter_collector_success",
                "Whether a collector family was recorded on the last scrape",
                &["collector"],
            )?,
        };

        Ok(Self {
            cpus,
            gpus,
            nodes,
            node,
            partition,
            queue,
            queue_pending_dependency,
            scheduler,
            fairshare,
            account,
            user,
            exporter,
        })
    }

    /// Clears every collector family before a scrape records into them.
    /// Keys that vanished and families that get skipped are not exposed
    /// again. Exporter self-metrics are kept and counters never reset.
    pub fn clear_families(&self) {
        let c = &self.cpus;
        for g in [&c.alloc, &c.idle, &c.other, &c.total] {
            g.clear();
        }
        if let Some(g) = &self.gpus {
            for g in [&g.alloc, &g.idle, &g.other, &g.total, &g.utilization] {
                g.clear();
            }
        }
        for g in self.nodes.values().chain(self.queue.values()) {
            g.clear();
        }
        self.queue_pending_dependency.clear();
        let s = &self.scheduler;
        for g in [
            &s.threads,
            &s.queue_size,
            &s.dbd_queue_size,
            &s.last_cycle,
            &s.mean_cycle,
            &s.cycle_per_minute,
            &s.backfill_last_cycle,
            &s.backfill_mean_cycle,
            &s.backfill_depth_mean,
            &s.backfilled_jobs_since_start,
            &s.backfilled_jobs_since_cycle,
            &s.backfilled_heterogeneous,
        ] {
            g.clear();
        }
        let n = &self.node;
        for vec in [&n.cpu_alloc, &n.cpu_idle, &n.cpu_other, &n.cpu_total, &n.mem_alloc, &n.mem_total] {
            vec.reset();
        }
        let p = &self.partition;
        for vec in [&p.cpus_allocated, &p.cpus_idle, &p.cpus_other, &p.cpus_total, &p.jobs_pending] {
            vec.reset();
        }
        self.fairshare.reset();
        self.account.reset();
        self.user.reset();
        self.exporter.collector_success.reset();
    }

    pub fn record_cpus(&self, m: &CpuMetrics) {
        self.cpus.alloc.set(m.alloc);
        self.cpus.idle.set(m.idle);
        self.cpus.other.set(m.other);
        self.cpus.total.set(m.total);
    }

    pub fn record_gpus(&self, m: &GpuMetrics) {
        if let Some(g) = &self.gpus {
            g.alloc.set(m.alloc);
            g.idle.set(m.idle);
            g.other.set(m.other);
            g.total.set(m.total);
            g.utilization.set(m.utilization);
        }
    }

    pub fn record_node_states(&self, counts: &HashMap<NodeState, f64>) {
        for (state, g) in &self.nodes {
            g.set(counts.get(state).copied().unwrap_or(0.0));
        }
    }

    pub fn record_nodes(&self, rows: &HashMap<String, NodeMetrics>) {
        let n = &self.node;
        for (hostname, row) in rows {
            let labels = [hostname.as_str(), row.status.as_str()];
            n.cpu_alloc.with_label_values(&labels).set(row.cpu_alloc);
            n.cpu_idle.with_label_values(&labels).set(row.cpu_idle);
            n.cpu_other.with_label_values(&labels).set(row.cpu_other);
            n.cpu_total.with_label_values(&labels).set(row.cpu_total);
            n.mem_alloc.with_label_values(&labels).set(row.mem_alloc);
            n.mem_total.with_label_values(&labels).set(row.mem_total);
        }
    }

    pub fn record_partitions(&self, rows: &HashMap<String, PartitionMetrics>) {
        let p = &self.partition;
        for (name, row) in rows {
            set_positive(&p.cpus_allocated, name, row.cpus_allocated);
            set_positive(&p.cpus_idle, name, row.cpus_idle);
            set_positive(&p.cpus_other, name, row.cpus_other);
            set_positive(&p.cpus_total, name, row.cpus_total);
            set_positive(&p.jobs_pending, name, row.jobs_pending);
        }
    }

    pub fn record_queue(&self, m: &QueueMetrics) {
        for (state, g) in &self.queue {
            g.set(m.count(*state));
        }
        self.queue_pending_dependency.set(m.pending_dependency);
    }

    pub fn record_scheduler(&self, m: &SchedulerMetrics) {
        let s = &self.scheduler;
        s.threads.set(m.threads);
        s.queue_size.set(m.queue_size);
        s.dbd_queue_size.set(m.dbd_queue_size);
        s.last_cycle.set(m.last_cycle);
        s.mean_cycle.set(m.mean_cycle);
        s.cycle_per_minute.set(m.cycle_per_minute);
        s.backfill_last_cycle.set(m.backfill_last_cycle);
        s.backfill_mean_cycle.set(m.backfill_mean_cycle);
        s.backfill_depth_mean.set(m.backfill_depth_mean);
        s.backfilled_jobs_since_start.set(m.backfilled_jobs_since_start);
        s.backfilled_jobs_since_cycle.set(m.backfilled_jobs_since_cycle);
        s.backfilled_heterogeneous.set(m.backfilled_heterogeneous);
    }

    /// Fair-share is exported for every account, zero usage included.
    pub fn record_fairshare(&self, usage: &HashMap<String, f64>) {
        for (account, value) in usage {
            self.fairshare.with_label_values(&[account.as_str()]).set(*value);
        }
    }

    pub fn record_accounts_users(&self, m: &AccountUserMetrics) {
        for (account, tally) in &m.accounts {
            self.account.record(account, tally);
        }
        for (user, tally) in &m.users {
            self.user.record(user, tally);
        }
    }

    pub fn record_fetch_error(&self, resource: Resource) {
        self.exporter
            .fetch_errors_total
            .with_label_values(&[resource.as_str()])
            .inc();
    }

    pub fn record_collector(&self, collector: &str, ok: bool) {
        self.exporter
            .collector_success
            .with_label_values(&[collector])
            .set(if ok { 1.0 } else { 0.0 });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Encoder, TextEncoder};

    fn render(registry: &Registry) -> String {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_title() {
        assert_eq!(title("not_responding"), "Not responding");
        assert_eq!(title("mix"), "Mix");
        assert_eq!(title(""), "");
    }

    #[test]
    fn test_gpu_family_is_optional() {
        let registry = Registry::new();
        let metrics = SlurmMetrics::new(&registry, false).unwrap();
        assert!(metrics.gpus.is_none());
        metrics.record_gpus(&GpuMetrics::default());
        assert!(!render(&registry).contains("slurm_gpus_total"));

        let registry = Registry::new();
        let metrics = SlurmMetrics::new(&registry, true).unwrap();
        metrics.record_gpus(&GpuMetrics {
            total: 8.0,
            alloc: 2.0,
            idle: 6.0,
            other: 0.0,
            utilization: 0.25,
        });
        assert!(render(&registry).contains("slurm_gpus_utilization 0.25"));
    }

    #[test]
    fn test_zero_tallies_are_omitted() {
        let registry = Registry::new();
        let metrics = SlurmMetrics::new(&registry, false).unwrap();
        let mut m = AccountUserMetrics::default();
        m.accounts.insert(
            "physics".into(),
            JobTally {
                running: 2.0,
                running_cpus: 16.0,
                ..Default::default()
            },
        );
        m.users.insert("carol".into(), JobTally::default());
        metrics.record_accounts_users(&m);

        let out = render(&registry);
        assert!(out.contains("slurm_account_jobs_running{account=\"physics\"} 2"));
        assert!(out.contains("slurm_account_cpus_running{account=\"physics\"} 16"));
        assert!(!out.contains("slurm_account_jobs_pending{"));
        assert!(!out.contains("user=\"carol\""));
    }

    #[test]
    fn test_reset_drops_vanished_labels() {
        let registry = Registry::new();
        let metrics = SlurmMetrics::new(&registry, false).unwrap();
        let mut usage = HashMap::new();
        usage.insert("gone".to_string(), 0.5);
        metrics.record_fairshare(&usage);
        assert!(render(&registry).contains("account=\"gone\""));

        metrics.clear_families();
        let mut usage = HashMap::new();
        usage.insert("stays".to_string(), 0.0);
        metrics.record_fairshare(&usage);
        let out = render(&registry);
        assert!(!out.contains("account=\"gone\""));
        assert!(out.contains("slurm_account_fairshare{account=\"stays\"} 0"));
    }

    #[test]
    fn test_scalars_are_always_set() {
        let registry = Registry::new();
        let metrics = SlurmMetrics::new(&registry, false).unwrap();
        metrics.record_node_states(&HashMap::new());
        metrics.record_queue(&QueueMetrics::default());
        let out = render(&registry);
        assert!(out.contains("slurm_nodes_drain 0"));
        assert!(out.contains("slurm_nodes_resv 0"));
        assert!(out.contains("slurm_queue_node_fail 0"));
        assert!(out.contains("# HELP slurm_queue_running Running jobs in the cluster"));
    }

    #[test]
    fn test_cleared_scalars_leave_the_exposition() {
        let registry = Registry::new();
        let metrics = SlurmMetrics::new(&registry, true).unwrap();
        metrics.record_cpus(&CpuMetrics {
            alloc: 8.0,
            idle: 24.0,
            other: 0.0,
            total: 32.0,
        });
        metrics.record_gpus(&GpuMetrics::default());
        metrics.record_scheduler(&SchedulerMetrics::default());
        let out = render(&registry);
        assert!(out.lines().any(|l| l == "slurm_cpus_alloc 8"));
        assert!(out.lines().any(|l| l == "slurm_scheduler_threads 0"));

        metrics.clear_families();
        metrics.record_queue(&QueueMetrics::default());
        let out = render(&registry);
        for prefix in ["slurm_cpus_", "slurm_gpus_", "slurm_scheduler_", "slurm_nodes_"] {
            assert!(
                !out.lines().any(|l| l.starts_with(prefix)),
                "{} still exposed:\n{}",
                prefix,
                out
            );
        }
        assert!(out.lines().any(|l| l == "slurm_queue_running 0"));
        // self-metrics are not collector families
        assert!(out.contains("slurm_exporter_scrape_success"));
    }
}
