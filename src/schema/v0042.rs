//! slurmrestd v0.0.42 (Slurm 24.11).
//!
//! Jobs match v0.0.41. Fair-share usage is now a number wrapper, so infinite
//! usage arrives as `"infinite": true` instead of a bare token.

use serde::Deserialize;

use super::models::ShareRecord;
use super::wire::{collect_records, required, NumberField};
use super::WireResponse;
use crate::resource::Resource;

pub(crate) use super::v0041::JobsResponse;

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
    effective_usage: NumberField,
}

impl WireResponse for SharesResponse {
    type Canonical = Vec<ShareRecord>;
    const RESOURCE: Resource = Resource::Shares;

    fn normalize(self) -> Self::Canonical {
        collect_records(Self::RESOURCE, self.shares.shares, |s| {
            Ok(ShareRecord {
                account: required(s.name, "share", "name")?,
                effective_usage: s.effective_usage.as_f64(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_usage_from_number_wrapper() {
        let body = r#"{"shares": {"shares": [
            {"name": "chem", "effective_usage": {"set": true, "infinite": false, "number": 0.5}},
            {"name": "idle", "effective_usage": {"set": true, "infinite": true, "number": 0}},
            {"effective_usage": {"set": true, "infinite": false, "number": 0.1}}
        ]}}"#;
        let resp: SharesResponse = serde_json::from_str(body).unwrap();
        let shares = resp.normalize();
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].effective_usage, 0.5);
        assert_eq!(shares[1].effective_usage, f64::MAX);
    }
}
