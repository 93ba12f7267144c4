//! Per-account and per-user job tallies.

use ahash::AHashMap as HashMap;

use crate::schema::{JobRecord, JobState};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JobTally {
    pub pending: f64,
    pub pending_cpus: f64,
    pub running: f64,
    pub running_cpus: f64,
    pub suspended: f64,
}

impl JobTally {
    fn add(&mut self, job: &JobRecord) {
        match job.state {
            JobState::Pending => {
                self.pending += 1.0;
                self.pending_cpus += job.cpus as f64;
            }
            JobState::Running => {
                self.running += 1.0;
                self.running_cpus += job.cpus as f64;
            }
            JobState::Suspended => self.suspended += 1.0,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountUserMetrics {
    pub accounts: HashMap<String, JobTally>,
    pub users: HashMap<String, JobTally>,
}

/// Tallies accounts and users in one pass over the jobs.
///
/// Every job creates its account and user entries, even in states that
/// are not tallied.
pub fn account_user_metrics(jobs: &[JobRecord]) -> AccountUserMetrics {
    let mut m = AccountUserMetrics::default();
    for job in jobs {
        m.accounts.entry(job.account.clone()).or_default().add(job);
        m.users.entry(job.user_name.clone()).or_default().add(job);
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::test_support::job;

    #[test]
    fn test_account_and_user_tallies() {
        let jobs = vec![
            job("physics", "alice", "p", JobState::Pending, 4),
            job("physics", "alice", "p", JobState::Running, 8),
            job("physics", "bob", "p", JobState::Running, 16),
            job("chem", "bob", "p", JobState::Suspended, 2),
            job("chem", "carol", "p", JobState::Completed, 2),
        ];
        let m = account_user_metrics(&jobs);

        let physics = m.accounts["physics"];
        assert_eq!(physics.pending, 1.0);
        assert_eq!(physics.pending_cpus, 4.0);
        assert_eq!(physics.running, 2.0);
        assert_eq!(physics.running_cpus, 24.0);

        assert_eq!(m.accounts["chem"].suspended, 1.0);
        assert_eq!(m.users["bob"].running_cpus, 16.0);
        assert_eq!(m.users["bob"].suspended, 1.0);
        assert_eq!(m.users["carol"], JobTally::default());
    }
}
