//! One scrape: fetch, parse, aggregate, record.
//!
//! Every scrape builds its own [`ScrapeCache`], populates it, parses each
//! payload that arrived exactly once and feeds the collector families whose
//! inputs are all available. A family with a missing or unparsable input is
//! skipped and left out of the exposition; the others are still recorded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::AHashMap as HashMap;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::aggregate;
use crate::cache::{ScrapeCache, DEFAULT_CACHE_TTL};
use crate::error::{CacheError, ParseError};
use crate::metrics::SlurmMetrics;
use crate::resource::Resource;
use crate::schema::{ApiVersion, DiagSnapshot, JobRecord, NodeRecord, PartitionRecord, ShareRecord};
use crate::transport::Fetcher;

pub const DEFAULT_SCRAPE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub api_version: ApiVersion,
    pub cache_ttl: Duration,
    /// Upper bound for populating the cache.
    pub scrape_timeout: Duration,
    pub enable_gpus: bool,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            api_version: ApiVersion::default(),
            cache_ttl: DEFAULT_CACHE_TTL,
            scrape_timeout: DEFAULT_SCRAPE_TIMEOUT,
            enable_gpus: false,
        }
    }
}

/// Outcome of one scrape, used for logging and the health endpoint.
#[derive(Debug, Clone, Default)]
pub struct ScrapeReport {
    pub duration: Duration,
    /// First populate error, if any.
    pub populate_error: Option<String>,
    pub cancelled: bool,
    pub failed_resources: Vec<Resource>,
    pub parse_failures: Vec<Resource>,
    /// Collector families in recording order with whether they were recorded.
    pub families: Vec<(&'static str, bool)>,
}

impl ScrapeReport {
    /// True when every resource was fetched and parsed.
    pub fn is_success(&self) -> bool {
        !self.cancelled
            && self.populate_error.is_none()
            && self.failed_resources.is_empty()
            && self.parse_failures.is_empty()
    }

    pub fn recorded(&self, family: &str) -> Option<bool> {
        self.families
            .iter()
            .find(|(name, _)| *name == family)
            .map(|(_, ok)| *ok)
    }
}

/// Canonical records of one scrape. `None` means fetch or parse failed.
#[derive(Debug, Default)]
struct Parsed {
    jobs: Option<Vec<JobRecord>>,
    nodes: Option<Vec<NodeRecord>>,
    partitions: Option<Vec<PartitionRecord>>,
    diag: Option<DiagSnapshot>,
    shares: Option<Vec<ShareRecord>>,
}

/// Reads the payload of every resource `populate` stored. An entry whose
/// TTL ran out while slower fetches were still in flight is fetched again
/// before the deadline. A failed refetch joins `failed_resources`.
async fn read_payloads(
    cache: &ScrapeCache,
    metrics: &SlurmMetrics,
    deadline: tokio::time::Instant,
    cancel: &CancellationToken,
    report: &mut ScrapeReport,
) -> Result<HashMap<Resource, Bytes>, CacheError> {
    let mut payloads = HashMap::new();
    for resource in Resource::ALL {
        if report.failed_resources.contains(&resource) {
            continue;
        }
        if let Some(body) = cache.get(resource) {
            payloads.insert(resource, body);
            continue;
        }

        debug!("{} payload expired before parsing", resource);
        let refetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CacheError::Cancelled),
            refetched = tokio::time::timeout_at(deadline, cache.get_or_fetch(resource)) => refetched,
        };
        match refetched {
            Ok(Ok(body)) => {
                payloads.insert(resource, body);
            }
            Ok(Err(e)) => {
                error!("Failed to refetch {} data: {}", resource, e);
                report.failed_resources.push(resource);
                metrics.record_fetch_error(resource);
            }
            Err(_) => {
                error!("Refetching {} data exceeded the scrape timeout", resource);
                report.failed_resources.push(resource);
                metrics.record_fetch_error(resource);
            }
        }
    }
    report.failed_resources.sort();
    Ok(payloads)
}

fn parse_resource<T>(
    payloads: &HashMap<Resource, Bytes>,
    resource: Resource,
    report: &mut ScrapeReport,
    parse: impl FnOnce(&[u8]) -> Result<T, ParseError>,
) -> Option<T> {
    let body = payloads.get(&resource)?;
    match parse(body) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            error!("Failed to parse {} payload: {}", resource, e);
            report.parse_failures.push(resource);
            None
        }
    }
}

fn parse_all(
    payloads: &HashMap<Resource, Bytes>,
    version: ApiVersion,
    report: &mut ScrapeReport,
) -> Parsed {
    Parsed {
        jobs: parse_resource(payloads, Resource::Jobs, report, |b| {
            version.parse_jobs(b).map(|d| d.jobs)
        }),
        nodes: parse_resource(payloads, Resource::Nodes, report, |b| {
            version.parse_nodes(b).map(|d| d.nodes)
        }),
        partitions: parse_resource(payloads, Resource::Partitions, report, |b| {
            version.parse_partitions(b).map(|d| d.partitions)
        }),
        diag: parse_resource(payloads, Resource::Diag, report, |b| {
            version.parse_diag(b).map(|d| d.stats)
        }),
        shares: parse_resource(payloads, Resource::Shares, report, |b| {
            version.parse_shares(b).map(|d| d.shares)
        }),
    }
}

/// Records one collector family when `inputs` is available.
fn collect<T>(
    metrics: &SlurmMetrics,
    report: &mut ScrapeReport,
    family: &'static str,
    inputs: Option<T>,
    record: impl FnOnce(T),
) {
    let ok = match inputs {
        Some(inputs) => {
            record(inputs);
            true
        }
        None => {
            error!("Skipping {} metrics: input data unavailable", family);
            false
        }
    };
    metrics.record_collector(family, ok);
    report.families.push((family, ok));
}

/// Runs one full scrape against `fetcher` and records into `metrics`.
#[instrument(skip_all, fields(api_version = %options.api_version))]
pub async fn run_scrape(
    fetcher: Arc<dyn Fetcher>,
    options: &ScrapeOptions,
    metrics: &SlurmMetrics,
    cancel: &CancellationToken,
) -> ScrapeReport {
    let start = Instant::now();
    let deadline = tokio::time::Instant::now() + options.scrape_timeout;
    let mut report = ScrapeReport::default();
    let cache = ScrapeCache::new(fetcher, options.cache_ttl);

    let populate_cancel = cancel.child_token();
    let populated = tokio::time::timeout_at(deadline, cache.populate(&populate_cancel)).await;
    match populated {
        Ok(Ok(())) => debug!("Fetched all resources"),
        Ok(Err(CacheError::Cancelled)) => {
            warn!("Scrape cancelled before all resources were fetched");
            report.cancelled = true;
            report.populate_error = Some(CacheError::Cancelled.to_string());
            cache.invalidate();
            report.duration = start.elapsed();
            return report;
        }
        Ok(Err(e)) => {
            error!("Failed to populate scrape cache: {}", e);
            report.populate_error = Some(e.to_string());
        }
        Err(_) => {
            populate_cancel.cancel();
            error!(
                "Fetching from slurmrestd exceeded the scrape timeout of {:?}",
                options.scrape_timeout
            );
            report.populate_error = Some(format!(
                "scrape timeout of {:?} exceeded",
                options.scrape_timeout
            ));
        }
    }

    report.failed_resources = cache.missing_resources();
    for resource in &report.failed_resources {
        metrics.record_fetch_error(*resource);
    }

    let payloads = match read_payloads(&cache, metrics, deadline, cancel, &mut report).await {
        Ok(payloads) => payloads,
        Err(e) => {
            warn!("Scrape cancelled while refetching expired payloads");
            report.cancelled = true;
            report.populate_error = Some(e.to_string());
            cache.invalidate();
            report.duration = start.elapsed();
            return report;
        }
    };
    cache.invalidate();
    let parsed = parse_all(&payloads, options.api_version, &mut report);

    metrics.clear_families();

    let jobs = parsed.jobs.as_deref();
    let nodes = parsed.nodes.as_deref();
    let partitions = parsed.partitions.as_deref();

    collect(metrics, &mut report, "cpus", jobs.zip(nodes), |(j, n)| {
        metrics.record_cpus(&aggregate::cpu_metrics(j, n))
    });
    if options.enable_gpus {
        collect(metrics, &mut report, "gpus", nodes, |n| {
            metrics.record_gpus(&aggregate::gpu_metrics(n))
        });
    }
    collect(metrics, &mut report, "nodes", nodes, |n| {
        metrics.record_node_states(&aggregate::node_state_counts(n))
    });
    collect(metrics, &mut report, "node", nodes, |n| {
        metrics.record_nodes(&aggregate::node_metrics(n))
    });
    let partition_inputs = match (partitions, nodes, jobs) {
        (Some(p), Some(n), Some(j)) => Some((p, n, j)),
        _ => None,
    };
    collect(metrics, &mut report, "partitions", partition_inputs, |(p, n, j)| {
        metrics.record_partitions(&aggregate::partition_metrics(p, n, j))
    });
    collect(metrics, &mut report, "queue", jobs, |j| {
        metrics.record_queue(&aggregate::queue_metrics(j))
    });
    collect(metrics, &mut report, "scheduler", parsed.diag.as_ref(), |d| {
        metrics.record_scheduler(&aggregate::scheduler_metrics(d))
    });
    collect(metrics, &mut report, "fairshare", parsed.shares.as_deref(), |s| {
        metrics.record_fairshare(&aggregate::fairshare_metrics(s))
    });
    collect(metrics, &mut report, "accounts", jobs, |j| {
        metrics.record_accounts_users(&aggregate::account_user_metrics(j))
    });

    report.duration = start.elapsed();
    metrics
        .exporter
        .scrape_duration_seconds
        .set(report.duration.as_secs_f64());
    metrics
        .exporter
        .scrape_success
        .set(if report.is_success() { 1.0 } else { 0.0 });

    info!(
        "Scrape finished in {:.3}s (success={}, failed_resources={:?})",
        report.duration.as_secs_f64(),
        report.is_success(),
        report.failed_resources
    );
    report
}
