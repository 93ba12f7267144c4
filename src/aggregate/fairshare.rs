//! Fair-share effective usage per account.

use ahash::AHashMap as HashMap;

use crate::schema::ShareRecord;

/// Root association, never exported.
pub const ROOT_ACCOUNT: &str = "root";

pub fn fairshare_metrics(shares: &[ShareRecord]) -> HashMap<String, f64> {
    shares
        .iter()
        .filter(|s| s.account != ROOT_ACCOUNT)
        .map(|s| (s.account.clone(), s.effective_usage))
        .collect()
}
