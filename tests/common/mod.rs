//! Shared helpers for integration tests: a scripted [`Fetcher`] and the
//! payload fixtures of a small four-node cluster.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use slurm_rest_exporter::{FetchError, Fetcher, Resource};

pub const JOBS_V0042: &str = include_str!("../fixtures/jobs_v0042.json");
pub const JOBS_V0040: &str = include_str!("../fixtures/jobs_v0040.json");
pub const NODES: &str = include_str!("../fixtures/nodes.json");
pub const PARTITIONS: &str = include_str!("../fixtures/partitions.json");
pub const DIAG: &str = include_str!("../fixtures/diag.json");
pub const SHARES_V0042: &str = include_str!("../fixtures/shares_v0042.json");
pub const SHARES_V0040: &str = include_str!("../fixtures/shares_v0040.json");

/// What the mock answers for one resource.
#[derive(Clone)]
pub enum Reply {
    Body(String),
    /// Body returned after a delay.
    Slow(String, Duration),
    Unauthorized,
    /// 401 returned after a delay.
    SlowUnauthorized(Duration),
    ServerError(String),
    /// Never completes.
    Hang,
}

pub struct MockFetcher {
    replies: Mutex<HashMap<Resource, Reply>>,
    calls: [AtomicUsize; 5],
}

impl MockFetcher {
    /// Serves the v0.0.42 cluster fixtures.
    pub fn cluster() -> Self {
        Self::with(&[
            (Resource::Jobs, Reply::Body(JOBS_V0042.into())),
            (Resource::Nodes, Reply::Body(NODES.into())),
            (Resource::Partitions, Reply::Body(PARTITIONS.into())),
            (Resource::Diag, Reply::Body(DIAG.into())),
            (Resource::Shares, Reply::Body(SHARES_V0042.into())),
        ])
    }

    pub fn with(replies: &[(Resource, Reply)]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().cloned().collect()),
            calls: Default::default(),
        }
    }

    pub fn set(&self, resource: Resource, reply: Reply) {
        self.replies.lock().unwrap().insert(resource, reply);
    }

    pub fn calls(&self, resource: Resource) -> usize {
        self.calls[resource.index()].load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        Resource::ALL.iter().map(|r| self.calls(*r)).sum()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, resource: Resource) -> Result<Bytes, FetchError> {
        self.calls[resource.index()].fetch_add(1, Ordering::SeqCst);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(&resource)
            .cloned()
            .unwrap_or_else(|| Reply::Body("{}".into()));

        match reply {
            Reply::Body(body) => Ok(Bytes::from(body)),
            Reply::Slow(body, delay) => {
                tokio::time::sleep(delay).await;
                Ok(Bytes::from(body))
            }
            Reply::Unauthorized => Err(FetchError::Unauthorized { resource }),
            Reply::SlowUnauthorized(delay) => {
                tokio::time::sleep(delay).await;
                Err(FetchError::Unauthorized { resource })
            }
            Reply::ServerError(message) => Err(FetchError::Server { resource, message }),
            Reply::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}
