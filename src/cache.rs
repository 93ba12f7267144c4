//! Per-scrape cache of raw slurmrestd payloads.
//!
//! A [`ScrapeCache`] is built for one scrape, populated with all five
//! resources concurrently, read by the parsers and aggregators, and then
//! invalidated. Entries older than the configured TTL are re-fetched on the
//! next access through [`ScrapeCache::get_or_fetch`].

use ahash::AHashMap as HashMap;
use bytes::Bytes;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

use crate::error::{CacheError, FetchError};
use crate::resource::Resource;
use crate::transport::Fetcher;

/// Default lifetime of a cached payload.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);

/// One fetched payload. Replaced wholesale on refresh.
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub resource: Resource,
    pub body: Bytes,
    pub fetched_at: Instant,
}

impl RawPayload {
    pub fn new(resource: Resource, body: Bytes) -> Self {
        Self {
            resource,
            body,
            fetched_at: Instant::now(),
        }
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// TTL store keyed by resource, filled by concurrent fetches.
pub struct ScrapeCache {
    fetcher: Arc<dyn Fetcher>,
    ttl: Duration,
    entries: RwLock<HashMap<Resource, RawPayload>>,
}

impl ScrapeCache {
    pub fn new(fetcher: Arc<dyn Fetcher>, ttl: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<Resource, RawPayload>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<Resource, RawPayload>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn store(&self, resource: Resource, body: Bytes) {
        self.write_entries()
            .insert(resource, RawPayload::new(resource, body));
    }

    /// Returns the cached payload if it is still within the TTL.
    pub fn get(&self, resource: Resource) -> Option<Bytes> {
        self.read_entries()
            .get(&resource)
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| entry.body.clone())
    }

    /// Resources without a fresh entry, in index order.
    pub fn stale_resources(&self) -> Vec<Resource> {
        let entries = self.read_entries();
        Resource::ALL
            .into_iter()
            .filter(|r| !entries.get(r).is_some_and(|e| e.is_fresh(self.ttl)))
            .collect()
    }

    /// Resources that were never stored, expired or not, in index order.
    pub fn missing_resources(&self) -> Vec<Resource> {
        let entries = self.read_entries();
        Resource::ALL
            .into_iter()
            .filter(|r| !entries.contains_key(r))
            .collect()
    }

    /// Fetches every stale resource concurrently and stores the successes.
    ///
    /// Waits for all fetches to finish. When any of them fails, the error of
    /// the lowest-index resource is returned while the successful payloads
    /// stay cached. Cancelling `cancel` aborts the in-flight fetches and
    /// returns [`CacheError::Cancelled`].
    #[instrument(skip(self, cancel))]
    pub async fn populate(&self, cancel: &CancellationToken) -> Result<(), CacheError> {
        let stale = self.stale_resources();
        if stale.is_empty() {
            debug!("All cached payloads are fresh, nothing to fetch");
            return Ok(());
        }
        debug!("Fetching {} resources: {:?}", stale.len(), stale);

        let mut tasks = JoinSet::new();
        let mut task_resources = HashMap::new();
        for resource in stale {
            let fetcher = Arc::clone(&self.fetcher);
            let handle = tasks.spawn(async move { (resource, fetcher.fetch(resource).await) });
            task_resources.insert(handle.id(), resource);
        }

        let mut failures: Vec<(Resource, CacheError)> = Vec::new();
        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("Cache population cancelled with {} fetches in flight", tasks.len());
                    tasks.abort_all();
                    return Err(CacheError::Cancelled);
                }
                joined = tasks.join_next() => joined,
            };

            match joined {
                None => break,
                Some(Ok((resource, Ok(body)))) => {
                    debug!("Cached {} payload ({} bytes)", resource, body.len());
                    self.store(resource, body);
                }
                Some(Ok((resource, Err(e)))) => {
                    warn!("Failed to fetch {} data: {}", resource, e);
                    failures.push((resource, CacheError::Fetch(e)));
                }
                Some(Err(join_err)) => match task_resources.get(&join_err.id()) {
                    Some(&resource) => {
                        error!("Fetch task for {} failed: {}", resource, join_err);
                        failures.push((
                            resource,
                            CacheError::Task {
                                resource,
                                message: join_err.to_string(),
                            },
                        ));
                    }
                    None => error!("Untracked fetch task failed: {}", join_err),
                },
            }
        }

        failures.sort_by_key(|(resource, _)| *resource);
        match failures.into_iter().next() {
            Some((_, first)) => Err(first),
            None => Ok(()),
        }
    }

    /// Returns the cached payload, fetching it first if it expired.
    pub async fn get_or_fetch(&self, resource: Resource) -> Result<Bytes, FetchError> {
        if let Some(body) = self.get(resource) {
            return Ok(body);
        }
        debug!("{} payload missing or expired, refetching", resource);
        let body = self.fetcher.fetch(resource).await?;
        self.store(resource, body.clone());
        Ok(body)
    }

    /// Drops every cached payload.
    pub fn invalidate(&self) {
        self.write_entries().clear();
    }
}
