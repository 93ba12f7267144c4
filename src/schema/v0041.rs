//! slurmrestd v0.0.41 (Slurm 24.05).
//!
//! Job CPU counts moved under `job_resources.cpus`. Shares are still bare
//! floats, so the v0.0.40 shares type is reused.

use serde::Deserialize;

use super::models::JobRecord;
use super::wire::{collect_records, JobFields};
use super::WireResponse;
use crate::error::ParseError;
use crate::resource::Resource;

pub(crate) use super::v0040::SharesResponse;

/// Jobs response with `job_resources`, also used by v0.0.42.
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
    job_resources: WireJobResources,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireJobResources {
    cpus: Option<u64>,
}

impl WireJob {
    fn into_record(self) -> Result<JobRecord, ParseError> {
        let cpus = self.job_resources.cpus.unwrap_or(0);
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
