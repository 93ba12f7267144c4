//! slurmrestd v0.0.40 (Slurm 23.11).
//!
//! Job CPU counts live in a `cpus` number wrapper and fair-share usage is a
//! bare float (which may be a non-JSON infinity token).

use serde::Deserialize;

use super::models::{JobRecord, ShareRecord};
use super::wire::{collect_records, required, JobFields, NumberField};
use super::WireResponse;
use crate::error::ParseError;
use crate::resource::Resource;

#[derive(Debug, Deserialize)]
pub(crate) struct JobsResponse {
    #[serde(default)]
    jobs: Vec<WireJob>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireJob {
    account: Option<String>,
    user_name: Option<String>,
    partition: Option<String>,
    job_state: Vec<String>,
    dependency: Option<String>,
    cpus: NumberField,
}

impl WireJob {
    fn into_record(self) -> Result<JobRecord, ParseError> {
        let cpus = self.cpus.as_u64();
        JobFields {
            account: self.account,
            user_name: self.user_name,
            partition: self.partition,
            job_state: self.job_state,
            dependency: self.dependency,
        }
        .into_record(cpus)
    }
}

impl WireResponse for JobsResponse {
    type Canonical = Vec<JobRecord>;
    const RESOURCE: Resource = Resource::Jobs;

    fn normalize(self) -> Self::Canonical {
        collect_records(Self::RESOURCE, self.jobs, WireJob::into_record)
    }
}

/// Shares response with bare-float effective usage, also used by v0.0.41.
#[derive(Debug, Deserialize)]
pub(crate) struct SharesResponse {
    #[serde(default)]
    shares: WireSharesWrapper,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireSharesWrapper {
    shares: Vec<WireShare>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireShare {
    name: Option<String>,
    effective_usage: Option<f64>,
}

impl WireResponse for SharesResponse {
    type Canonical = Vec<ShareRecord>;
    const RESOURCE: Resource = Resource::Shares;

    fn normalize(self) -> Self::Canonical {
        collect_records(Self::RESOURCE, self.shares.shares, |s| {
            Ok(ShareRecord {
                account: required(s.name, "share", "name")?,
                effective_usage: s.effective_usage.unwrap_or(0.0),
            })
        })
    }
}
