//! Schema adapter for the slurmrestd REST API.
//!
//! Three API generations are supported. Exactly one is active per
//! configuration, selected by [`ApiVersion`]; every call site goes through
//! the `ApiVersion::parse_*` methods and only ever sees the canonical models.
//!
//! Parsing happens in two steps. The payload is deserialized into the
//! version's wire types; a malformed or empty payload fails the whole
//! resource. The wire types are then normalized into canonical records; a
//! record that is missing a mandatory field, holds an unknown state or a bad
//! GPU count is logged and skipped.

pub mod models;
pub mod sanitize;
pub mod states;
pub mod tres;

mod v0040;
mod v0041;
mod v0042;
mod wire;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;
use crate::resource::Resource;

pub use models::{
    DiagData, DiagSnapshot, JobRecord, JobsData, NodeRecord, NodesData, PartitionRecord,
    PartitionsData, ShareRecord, SharesData,
};
pub use states::{JobState, NodeState};

/// Deserializable wire response for one resource in one API generation.
pub(crate) trait WireResponse: DeserializeOwned {
    type Canonical;
    const RESOURCE: Resource;

    fn normalize(self) -> Self::Canonical;
}

fn parse_payload<W: WireResponse>(body: &[u8]) -> Result<W::Canonical, ParseError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ParseError::EmptyBody(W::RESOURCE));
    }
    let wire: W = serde_json::from_slice(body).map_err(|source| ParseError::Json {
        resource: W::RESOURCE,
        source,
    })?;
    Ok(wire.normalize())
}

/// slurmrestd API generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ApiVersion {
    /// Slurm 23.11
    #[serde(rename = "v0.0.40", alias = "23.11")]
    V0040,
    /// Slurm 24.05
    #[serde(rename = "v0.0.41", alias = "24.05")]
    V0041,
    /// Slurm 24.11
    #[default]
    #[serde(rename = "v0.0.42", alias = "24.11")]
    V0042,
}

impl ApiVersion {
    pub const ALL: [ApiVersion; 3] = [ApiVersion::V0040, ApiVersion::V0041, ApiVersion::V0042];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::V0040 => "v0.0.40",
            ApiVersion::V0041 => "v0.0.41",
            ApiVersion::V0042 => "v0.0.42",
        }
    }

    /// Slurm release that ships this API generation.
    pub fn slurm_release(&self) -> &'static str {
        match self {
            ApiVersion::V0040 => "23.11",
            ApiVersion::V0041 => "24.05",
            ApiVersion::V0042 => "24.11",
        }
    }

    /// Endpoint path relative to the slurmrestd base url, e.g. `slurm/v0.0.42/jobs`.
    pub fn endpoint(&self, resource: Resource) -> String {
        format!("slurm/{}/{}", self.as_str(), resource)
    }

    pub fn parse_jobs(&self, body: &[u8]) -> Result<JobsData, ParseError> {
        let jobs = match self {
            ApiVersion::V0040 => parse_payload::<v0040::JobsResponse>(body)?,
            ApiVersion::V0041 => parse_payload::<v0041::JobsResponse>(body)?,
            ApiVersion::V0042 => parse_payload::<v0042::JobsResponse>(body)?,
        };
        Ok(JobsData {
            version: *self,
            jobs,
        })
    }

    pub fn parse_nodes(&self, body: &[u8]) -> Result<NodesData, ParseError> {
        Ok(NodesData {
            version: *self,
            nodes: parse_payload::<wire::NodesResponse>(body)?,
        })
    }

    pub fn parse_partitions(&self, body: &[u8]) -> Result<PartitionsData, ParseError> {
        Ok(PartitionsData {
            version: *self,
            partitions: parse_payload::<wire::PartitionsResponse>(body)?,
        })
    }

    pub fn parse_diag(&self, body: &[u8]) -> Result<DiagData, ParseError> {
        Ok(DiagData {
            version: *self,
            stats: parse_payload::<wire::DiagResponse>(body)?,
        })
    }

    /// Parses the shares payload after repairing bare infinity tokens.
    pub fn parse_shares(&self, body: &[u8]) -> Result<SharesData, ParseError> {
        let body = sanitize::cleanse_infinity(body);
        let shares = match self {
            ApiVersion::V0040 => parse_payload::<v0040::SharesResponse>(&body)?,
            ApiVersion::V0041 => parse_payload::<v0041::SharesResponse>(&body)?,
            ApiVersion::V0042 => parse_payload::<v0042::SharesResponse>(&body)?,
        };
        Ok(SharesData {
            version: *self,
            shares,
        })
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = String;

    /// Accepts `v0.0.41`, `0.0.41` or the Slurm release `24.05`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('v');
        ApiVersion::ALL
            .into_iter()
            .find(|v| v.as_str().trim_start_matches('v') == wanted || v.slurm_release() == wanted)
            .ok_or_else(|| {
                format!(
                    "unsupported slurmrestd api version '{}', expected one of v0.0.40, v0.0.41, v0.0.42",
                    s
                )
            })
    }
}
