//! Application state management for the exporter.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers.

use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use slurm_rest_exporter::health_stats::HealthStats;
use slurm_rest_exporter::metrics::SlurmMetrics;
use slurm_rest_exporter::scrape::ScrapeOptions;
use slurm_rest_exporter::transport::Fetcher;

use crate::config::Config;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests.
pub struct AppState {
    pub registry: Registry,
    pub metrics: SlurmMetrics,
    pub config: Arc<Config>,
    pub scrape_options: ScrapeOptions,
    pub fetcher: Arc<dyn Fetcher>,
    /// Serializes scrapes; a scrape resets and rewrites the labeled vectors.
    pub scrape_lock: Mutex<()>,
    pub health_stats: Arc<HealthStats>,
    /// Cancelled on shutdown to abort in-flight fetches.
    pub shutdown: CancellationToken,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}
