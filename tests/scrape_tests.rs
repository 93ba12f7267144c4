//! End-to-end scrapes against the mock cluster, checked on the rendered
//! exposition text.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockFetcher, Reply, JOBS_V0040, NODES, SHARES_V0040};
use prometheus::{Encoder, Registry, TextEncoder};
use slurm_rest_exporter::{run_scrape, ApiVersion, Resource, ScrapeOptions, SlurmMetrics};
use tokio_util::sync::CancellationToken;

fn render(registry: &Registry) -> String {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .unwrap();
    String::from_utf8(buffer).unwrap()
}

fn setup(enable_gpus: bool) -> (Registry, SlurmMetrics, ScrapeOptions) {
    let registry = Registry::new();
    let metrics = SlurmMetrics::new(&registry, enable_gpus).unwrap();
    let options = ScrapeOptions {
        enable_gpus,
        ..Default::default()
    };
    (registry, metrics, options)
}

fn assert_lines(out: &str, lines: &[&str]) {
    for line in lines {
        assert!(
            out.lines().any(|l| l == *line),
            "missing line `{}` in:\n{}",
            line,
            out
        );
    }
}

#[tokio::test]
async fn test_full_scrape() {
    let (registry, metrics, options) = setup(true);
    let fetcher = Arc::new(MockFetcher::cluster());

    let report = run_scrape(fetcher, &options, &metrics, &CancellationToken::new()).await;
    assert!(report.is_success(), "{:?}", report);
    assert!(report.families.iter().all(|(_, ok)| *ok));

    let out = render(&registry);
    assert_lines(
        &out,
        &[
            "slurm_cpus_total 160",
            "slurm_cpus_idle 96",
            "slurm_cpus_alloc 56",
            "slurm_cpus_other 8",
            "slurm_gpus_total 4",
            "slurm_gpus_alloc 3",
            "slurm_gpus_idle 1",
            "slurm_gpus_utilization 0.75",
            "slurm_nodes_mix 1",
            "slurm_nodes_idle 1",
            "slurm_nodes_drain 1",
            "slurm_nodes_alloc 1",
            "slurm_nodes_down 1",
            "slurm_nodes_not_responding 1",
            "slurm_nodes_maint 0",
            "slurm_queue_running 2",
            "slurm_queue_pending 2",
            "slurm_queue_pending_dependency 1",
            "slurm_queue_completed 1",
            "slurm_queue_failed 0",
            "slurm_scheduler_threads 3",
            "slurm_scheduler_queue_size 2",
            "slurm_scheduler_dbd_queue_size 7",
            "slurm_scheduler_last_cycle 1500",
            "slurm_scheduler_backfill_depth_mean 12",
            "slurm_scheduler_backfilled_jobs_since_start_total 950",
            "slurm_exporter_scrape_success 1",
        ],
    );
}

#[tokio::test]
async fn test_labeled_families() {
    let (registry, metrics, options) = setup(false);
    let fetcher = Arc::new(MockFetcher::cluster());
    run_scrape(fetcher, &options, &metrics, &CancellationToken::new()).await;

    let out = render(&registry);
    assert_lines(
        &out,
        &[
            "slurm_node_cpu_total{node=\"n02\",status=\"idle|drain\"} 64",
            "slurm_node_cpu_alloc{node=\"g01\",status=\"alloc\"} 32",
            "slurm_node_mem_alloc{node=\"g01\",status=\"alloc\"} 400000",
            "slurm_node_cpu_other{node=\"login\",status=\"down|not_responding\"} 1",
            "slurm_partition_cpus_allocated{partition=\"cpu\"} 32",
            "slurm_partition_cpus_idle{partition=\"cpu\"} 96",
            "slurm_partition_cpus_total{partition=\"cpu\"} 128",
            "slurm_partition_jobs_pending{partition=\"cpu\"} 3",
            "slurm_partition_cpus_total{partition=\"gpu\"} 32",
            "slurm_partition_jobs_pending{partition=\"gpu\"} 1",
            "slurm_account_jobs_running{account=\"physics\"} 2",
            "slurm_account_cpus_running{account=\"physics\"} 56",
            "slurm_account_jobs_pending{account=\"physics\"} 1",
            "slurm_account_cpus_pending{account=\"physics\"} 8",
            "slurm_account_jobs_pending{account=\"chem\"} 2",
            "slurm_account_cpus_pending{account=\"chem\"} 6",
            "slurm_user_jobs_running{user=\"alice\"} 1",
            "slurm_user_cpus_running{user=\"bob\"} 32",
            "slurm_user_jobs_pending{user=\"carol\"} 2",
            "slurm_account_fairshare{account=\"physics\"} 0.25",
            "slurm_account_fairshare{account=\"chem\"} 0.5",
            "slurm_account_fairshare{account=\"bio\"} 0",
        ],
    );

    // zero values are omitted from keyed families
    assert!(!out.contains("slurm_partition_cpus_other{partition=\"cpu\"}"));
    assert!(!out.contains("slurm_partition_cpus_idle{partition=\"gpu\"}"));
    assert!(!out.contains("slurm_account_jobs_running{account=\"chem\"}"));
    assert!(!out.contains("user=\"dave\""));
    assert!(!out.contains("account=\"root\""));
    // the GPU family is not registered when disabled
    assert!(!out.contains("slurm_gpus_total"));
}

#[tokio::test]
async fn test_older_api_generation() {
    let (registry, metrics, mut options) = setup(false);
    options.api_version = ApiVersion::V0040;
    let fetcher = Arc::new(MockFetcher::cluster());
    fetcher.set(Resource::Jobs, Reply::Body(JOBS_V0040.into()));
    fetcher.set(Resource::Shares, Reply::Body(SHARES_V0040.into()));

    let report = run_scrape(fetcher, &options, &metrics, &CancellationToken::new()).await;
    assert!(report.is_success(), "{:?}", report);

    let out = render(&registry);
    assert_lines(
        &out,
        &[
            "slurm_cpus_alloc 56",
            "slurm_account_fairshare{account=\"chem\"} 0.5",
        ],
    );
    let infinite = out
        .lines()
        .find_map(|l| l.strip_prefix("slurm_account_fairshare{account=\"idle_acct\"} "))
        .expect("idle_acct exported");
    assert_eq!(infinite.parse::<f64>().unwrap(), f64::MAX);
}

#[tokio::test]
async fn test_failed_resource_skips_dependent_families_only() {
    let (registry, metrics, options) = setup(false);
    let fetcher = Arc::new(MockFetcher::cluster());

    // a good scrape first so the scheduler gauges hold values
    run_scrape(fetcher.clone(), &options, &metrics, &CancellationToken::new()).await;

    fetcher.set(Resource::Diag, Reply::ServerError("slurmctld down".into()));
    let report = run_scrape(fetcher, &options, &metrics, &CancellationToken::new()).await;

    assert!(!report.is_success());
    assert_eq!(report.failed_resources, vec![Resource::Diag]);
    assert!(report.populate_error.as_ref().unwrap().contains("slurmctld down"));
    assert_eq!(report.recorded("scheduler"), Some(false));
    assert_eq!(report.recorded("cpus"), Some(true));
    assert_eq!(report.recorded("accounts"), Some(true));

    let out = render(&registry);
    assert_lines(
        &out,
        &[
            "slurm_exporter_scrape_success 0",
            "slurm_exporter_collector_success{collector=\"scheduler\"} 0",
            "slurm_exporter_collector_success{collector=\"queue\"} 1",
            "slurm_exporter_fetch_errors_total{resource=\"diag\"} 1",
            "slurm_cpus_total 160",
        ],
    );
    // the previous scrape's scheduler values are not carried over
    assert!(!out.contains("slurm_scheduler_"), "{}", out);
}

#[tokio::test]
async fn test_skipped_families_leave_no_stale_values() {
    let (registry, metrics, options) = setup(false);
    let fetcher = Arc::new(MockFetcher::cluster());
    run_scrape(fetcher.clone(), &options, &metrics, &CancellationToken::new()).await;
    assert_lines(
        &render(&registry),
        &["slurm_cpus_alloc 56", "slurm_queue_running 2", "slurm_scheduler_threads 3"],
    );

    fetcher.set(Resource::Jobs, Reply::Unauthorized);
    fetcher.set(Resource::Diag, Reply::ServerError("slurmctld down".into()));
    let report = run_scrape(fetcher, &options, &metrics, &CancellationToken::new()).await;
    assert_eq!(report.failed_resources, vec![Resource::Jobs, Resource::Diag]);

    let out = render(&registry);
    for prefix in ["slurm_cpus_", "slurm_queue_", "slurm_scheduler_", "slurm_partition_"] {
        assert!(
            !out.lines().any(|l| l.starts_with(prefix)),
            "{} still exposed:\n{}",
            prefix,
            out
        );
    }
    assert_lines(
        &out,
        &[
            "slurm_nodes_idle 1",
            "slurm_node_cpu_alloc{node=\"g01\",status=\"alloc\"} 32",
            "slurm_account_fairshare{account=\"chem\"} 0.5",
            "slurm_exporter_collector_success{collector=\"queue\"} 0",
            "slurm_exporter_collector_success{collector=\"nodes\"} 1",
        ],
    );
}

#[tokio::test]
async fn test_jobs_failure_skips_every_job_family() {
    let (registry, metrics, options) = setup(false);
    let fetcher = Arc::new(MockFetcher::cluster());
    fetcher.set(Resource::Jobs, Reply::Unauthorized);

    let report = run_scrape(fetcher, &options, &metrics, &CancellationToken::new()).await;

    for family in ["cpus", "partitions", "queue", "accounts"] {
        assert_eq!(report.recorded(family), Some(false), "{}", family);
    }
    for family in ["nodes", "node", "scheduler", "fairshare"] {
        assert_eq!(report.recorded(family), Some(true), "{}", family);
    }
    assert!(!render(&registry).contains("slurm_account_jobs_running{"));
}

#[tokio::test]
async fn test_malformed_payload_counts_as_parse_failure() {
    let (_registry, metrics, options) = setup(false);
    let fetcher = Arc::new(MockFetcher::cluster());
    fetcher.set(Resource::Shares, Reply::Body("{\"shares\": [".into()));

    let report = run_scrape(fetcher, &options, &metrics, &CancellationToken::new()).await;

    assert!(report.populate_error.is_none());
    assert_eq!(report.parse_failures, vec![Resource::Shares]);
    assert_eq!(report.recorded("fairshare"), Some(false));
    assert!(!report.is_success());
}

#[tokio::test]
async fn test_vanished_labels_are_dropped() {
    let (registry, metrics, options) = setup(false);
    let fetcher = Arc::new(MockFetcher::cluster());
    run_scrape(fetcher.clone(), &options, &metrics, &CancellationToken::new()).await;
    assert!(render(&registry).contains("node=\"login\""));

    fetcher.set(
        Resource::Nodes,
        Reply::Body(
            r#"{"nodes": [{"name": "n01", "hostname": "n01", "state": ["IDLE"],
                "partitions": ["cpu"], "cpus": 64, "alloc_cpus": 0, "alloc_idle_cpus": 64}]}"#
                .into(),
        ),
    );
    fetcher.set(Resource::Jobs, Reply::Body("{\"jobs\": []}".into()));
    run_scrape(fetcher, &options, &metrics, &CancellationToken::new()).await;

    let out = render(&registry);
    assert!(!out.contains("node=\"login\""));
    assert!(!out.contains("node=\"g01\""));
    assert!(!out.contains("user=\"alice\""));
    assert_lines(
        &out,
        &[
            "slurm_node_cpu_idle{node=\"n01\",status=\"idle\"} 64",
            "slurm_nodes_down 0",
            "slurm_queue_running 0",
        ],
    );
}

#[tokio::test]
async fn test_cancelled_scrape_records_nothing() {
    let (registry, metrics, options) = setup(false);
    let fetcher = Arc::new(MockFetcher::cluster());
    fetcher.set(Resource::Nodes, Reply::Hang);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let report = run_scrape(fetcher, &options, &metrics, &cancel).await;
    assert!(report.cancelled);
    assert!(report.families.is_empty());
    assert!(!render(&registry).contains("slurm_queue_running 2"));
}

#[tokio::test]
async fn test_scrape_timeout_keeps_fetched_resources() {
    let (registry, metrics, mut options) = setup(false);
    options.scrape_timeout = Duration::from_millis(100);
    let fetcher = Arc::new(MockFetcher::cluster());
    fetcher.set(Resource::Diag, Reply::Hang);

    let report = run_scrape(fetcher, &options, &metrics, &CancellationToken::new()).await;

    assert!(!report.cancelled);
    assert!(report.populate_error.as_ref().unwrap().contains("timeout"));
    assert_eq!(report.failed_resources, vec![Resource::Diag]);
    assert_eq!(report.recorded("scheduler"), Some(false));
    assert_eq!(report.recorded("queue"), Some(true));
    assert_lines(&render(&registry), &["slurm_queue_running 2"]);
}

#[tokio::test]
async fn test_payloads_outliving_the_ttl_are_refetched() {
    let (registry, metrics, mut options) = setup(false);
    options.cache_ttl = Duration::from_millis(100);
    let fetcher = Arc::new(MockFetcher::cluster());
    fetcher.set(
        Resource::Nodes,
        Reply::Slow(NODES.into(), Duration::from_millis(200)),
    );

    let report = run_scrape(fetcher.clone(), &options, &metrics, &CancellationToken::new()).await;

    assert!(report.is_success(), "{:?}", report);
    assert!(report.failed_resources.is_empty());
    assert!(report.families.iter().all(|(_, ok)| *ok), "{:?}", report.families);
    // the fast payloads expired while nodes was in flight
    assert_eq!(fetcher.calls(Resource::Jobs), 2);
    assert_eq!(fetcher.calls(Resource::Nodes), 1);

    let out = render(&registry);
    assert!(!out.contains("slurm_exporter_fetch_errors_total{"));
    assert_lines(
        &out,
        &[
            "slurm_cpus_total 160",
            "slurm_scheduler_threads 3",
            "slurm_exporter_scrape_success 1",
        ],
    );
}

#[tokio::test]
async fn test_each_scrape_fetches_fresh_payloads() {
    let (_registry, metrics, options) = setup(false);
    let fetcher = Arc::new(MockFetcher::cluster());
    let cancel = CancellationToken::new();

    run_scrape(fetcher.clone(), &options, &metrics, &cancel).await;
    run_scrape(fetcher.clone(), &options, &metrics, &cancel).await;

    assert_eq!(fetcher.total_calls(), 10);
}
