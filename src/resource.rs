//! Logical slurmrestd resources polled on every scrape.

use std::fmt;

/// One of the five collections fetched from slurmrestd.
///
/// Variant order is the resource index used to pick the first error when
/// several fetches fail in the same scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    Jobs,
    Nodes,
    Partitions,
    Diag,
    Shares,
}

impl Resource {
    /// All resources in index order.
    pub const ALL: [Resource; 5] = [
        Resource::Jobs,
        Resource::Nodes,
        Resource::Partitions,
        Resource::Diag,
        Resource::Shares,
    ];

    /// Position in [`Resource::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Name used in endpoint paths, cache keys and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Jobs => "jobs",
            Resource::Nodes => "nodes",
            Resource::Partitions => "partitions",
            Resource::Diag => "diag",
            Resource::Shares => "shares",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
