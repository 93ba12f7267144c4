//! Slurm REST Exporter Library
//!
//! Core of a Prometheus exporter for Slurm clusters. The library is
//! framework-agnostic: it fetches resources from slurmrestd, adapts the
//! versioned JSON payloads to canonical records and aggregates them into
//! metric families registered on a `prometheus::Registry`. The binary wires
//! this into an axum server.
//!
//! # Layers
//!
//! - [`transport`]: HTTP(S) or unix-socket client implementing [`Fetcher`]
//! - [`cache`]: per-scrape TTL cache with concurrent population
//! - [`schema`]: API version selection, wire types, state classification
//! - [`aggregate`]: pure aggregation functions over canonical records
//! - [`metrics`]: Prometheus metric families
//! - [`scrape`]: the orchestration of one scrape
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use prometheus::Registry;
//! use slurm_rest_exporter::{run_scrape, ClientSettings, ScrapeOptions, SlurmClient, SlurmMetrics};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = ClientSettings {
//!     api_url: "unix:///run/slurmrestd/slurmrestd.socket".into(),
//!     ..Default::default()
//! };
//! let client = Arc::new(SlurmClient::new(&settings)?);
//! let registry = Registry::new();
//! let metrics = SlurmMetrics::new(&registry, false)?;
//!
//! let report = run_scrape(client, &ScrapeOptions::default(), &metrics, &CancellationToken::new()).await;
//! println!("scrape ok: {}", report.is_success());
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod cache;
pub mod error;
pub mod health_stats;
pub mod metrics;
pub mod resource;
pub mod schema;
pub mod scrape;
pub mod transport;

// Re-export main types for convenience
pub use cache::{RawPayload, ScrapeCache};
pub use error::{CacheError, FetchError, ParseError};
pub use metrics::SlurmMetrics;
pub use resource::Resource;
pub use schema::ApiVersion;
pub use scrape::{run_scrape, ScrapeOptions, ScrapeReport};
pub use transport::{ClientSettings, Fetcher, SlurmClient};
