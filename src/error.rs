//! Error types for fetching, caching and parsing slurmrestd payloads.
//!
//! Fetch and cache errors surface once per scrape. Parse errors are split in
//! two: payload-level failures (`EmptyBody`, `Json`) abort every metric family
//! that depends on the resource, while record-level failures are logged by
//! the schema adapter and the offending record is dropped.

use thiserror::Error;

use crate::resource::Resource;

/// Failure to obtain a payload from slurmrestd.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid slurmrestd url '{0}': expected http://, https:// or unix://")]
    InvalidUrl(String),

    #[error("transport error getting {resource} data: {message}")]
    Transport { resource: Resource, message: String },

    #[error("unauthorized: invalid credentials (getting {resource} data)")]
    Unauthorized { resource: Resource },

    #[error("internal server error (500) from slurm controller getting {resource} data: {message}")]
    Server { resource: Resource, message: String },

    #[error("received incorrect status code {status} for {resource} data")]
    UnexpectedStatus { resource: Resource, status: u16 },
}

impl FetchError {
    /// Resource the failed request was for, if the error is tied to one.
    pub fn resource(&self) -> Option<Resource> {
        match self {
            FetchError::InvalidUrl(_) => None,
            FetchError::Transport { resource, .. }
            | FetchError::Unauthorized { resource }
            | FetchError::Server { resource, .. }
            | FetchError::UnexpectedStatus { resource, .. } => Some(*resource),
        }
    }
}

/// Failure of a scrape cache operation.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("cache population cancelled")]
    Cancelled,

    #[error("fetch task for {resource} data failed: {message}")]
    Task { resource: Resource, message: String },
}

/// Failure to turn a payload into canonical records.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("empty {0} payload")]
    EmptyBody(Resource),

    #[error("malformed {resource} payload: {source}")]
    Json {
        resource: Resource,
        #[source]
        source: serde_json::Error,
    },

    #[error("{record} record is missing mandatory field '{field}'")]
    MissingField {
        record: &'static str,
        field: &'static str,
    },

    #[error("unknown {kind} state '{value}'")]
    UnknownState { kind: &'static str, value: String },

    #[error("invalid gres/gpu count in tres string '{0}'")]
    InvalidTres(String),
}
