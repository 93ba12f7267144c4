//! Integration tests for the schema adapter against recorded payloads.

mod common;

use common::{DIAG, JOBS_V0040, JOBS_V0042, NODES, PARTITIONS, SHARES_V0040, SHARES_V0042};
use slurm_rest_exporter::schema::{ApiVersion, JobState, NodeState};
use slurm_rest_exporter::{ParseError, Resource};

#[test]
fn test_job_generations_normalize_identically() {
    let old = ApiVersion::V0040.parse_jobs(JOBS_V0040.as_bytes()).unwrap();
    let new = ApiVersion::V0042.parse_jobs(JOBS_V0042.as_bytes()).unwrap();

    assert_eq!(old.version, ApiVersion::V0040);
    assert_eq!(new.version, ApiVersion::V0042);
    assert_eq!(old.jobs, new.jobs);
}

#[test]
fn test_job_without_user_is_skipped() {
    let data = ApiVersion::V0042.parse_jobs(JOBS_V0042.as_bytes()).unwrap();

    assert_eq!(data.jobs.len(), 6);
    assert!(data.jobs.iter().all(|j| !j.user_name.is_empty()));
    assert!(!data.jobs.iter().any(|j| j.cpus == 64));
}

#[test]
fn test_job_fields() {
    let data = ApiVersion::V0042.parse_jobs(JOBS_V0042.as_bytes()).unwrap();

    let blocked = data
        .jobs
        .iter()
        .find(|j| j.has_dependency())
        .expect("one job has a dependency");
    assert_eq!(blocked.user_name, "carol");
    assert_eq!(blocked.state, JobState::Pending);
    assert_eq!(blocked.cpus, 4);

    let multi = data
        .jobs
        .iter()
        .find(|j| j.partition.contains(','))
        .expect("one job spans partitions");
    assert_eq!(multi.partitions().collect::<Vec<_>>(), vec!["cpu", "gpu"]);
}

#[test]
fn test_nodes_payload() {
    let data = ApiVersion::V0041.parse_nodes(NODES.as_bytes()).unwrap();
    assert_eq!(data.nodes.len(), 4);

    let n02 = data.nodes.iter().find(|n| n.name == "n02").unwrap();
    assert_eq!(n02.states, vec![NodeState::Idle, NodeState::Drain]);
    assert_eq!(n02.cpus_idle, 64);

    let g01 = data.nodes.iter().find(|n| n.name == "g01").unwrap();
    assert_eq!(g01.gpus_total, 4);
    assert_eq!(g01.gpus_alloc, 3);
    assert_eq!(g01.memory_alloc, 400000);

    let login = data.nodes.iter().find(|n| n.name == "login").unwrap();
    assert!(login.has_state(NodeState::Down));
    assert!(login.has_state(NodeState::NotResponding));
    assert_eq!(login.gpus_total, 0);
}

#[test]
fn test_partitions_payload() {
    let data = ApiVersion::V0042.parse_partitions(PARTITIONS.as_bytes()).unwrap();
    let names: Vec<_> = data.partitions.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["cpu", "gpu"]);
    assert_eq!(data.partitions[0].cpus_total, 128);
    assert_eq!(data.partitions[0].configured_nodes, "n[01-02]");
}

#[test]
fn test_diag_payload() {
    let stats = ApiVersion::V0042.parse_diag(DIAG.as_bytes()).unwrap().stats;
    assert_eq!(stats.server_threads, 3);
    assert_eq!(stats.agent_queue_size, 2);
    assert_eq!(stats.dbd_queue_size, 7);
    assert_eq!(stats.schedule_cycle_last, 1500);
    assert_eq!(stats.backfill_cycle_mean, 38000);
    assert_eq!(stats.backfilled_heterogeneous_jobs, 1);
}

#[test]
fn test_shares_infinity_is_repaired() {
    let data = ApiVersion::V0040.parse_shares(SHARES_V0040.as_bytes()).unwrap();
    let idle = data
        .shares
        .iter()
        .find(|s| s.account == "idle_acct")
        .expect("idle_acct survives sanitizing");
    assert_eq!(idle.effective_usage, f64::MAX);

    let chem = data.shares.iter().find(|s| s.account == "chem").unwrap();
    assert_eq!(chem.effective_usage, 0.5);
}

#[test]
fn test_shares_number_fields() {
    let data = ApiVersion::V0042.parse_shares(SHARES_V0042.as_bytes()).unwrap();
    let usage: Vec<_> = data
        .shares
        .iter()
        .map(|s| (s.account.as_str(), s.effective_usage))
        .collect();
    assert_eq!(
        usage,
        vec![("root", 1.0), ("physics", 0.25), ("chem", 0.5), ("bio", 0.0)]
    );
}

#[test]
fn test_payload_level_failures() {
    assert!(matches!(
        ApiVersion::V0042.parse_diag(b""),
        Err(ParseError::EmptyBody(Resource::Diag))
    ));
    assert!(matches!(
        ApiVersion::V0040.parse_shares(b"{\"shares\": "),
        Err(ParseError::Json {
            resource: Resource::Shares,
            ..
        })
    ));
}
