//! Job count per state.

use ahash::AHashMap as HashMap;

use crate::schema::{JobRecord, JobState};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueMetrics {
    /// Jobs per state. Pending jobs waiting on a dependency are counted in
    /// `pending_dependency` instead of under [`JobState::Pending`].
    pub by_state: HashMap<JobState, f64>,
    pub pending_dependency: f64,
}

impl QueueMetrics {
    pub fn count(&self, state: JobState) -> f64 {
        self.by_state.get(&state).copied().unwrap_or(0.0)
    }
}

pub fn queue_metrics(jobs: &[JobRecord]) -> QueueMetrics {
    let mut qm = QueueMetrics {
        by_state: JobState::all().map(|s| (s, 0.0)).collect(),
        pending_dependency: 0.0,
    };
    for job in jobs {
        if job.state == JobState::Pending && job.has_dependency() {
            qm.pending_dependency += 1.0;
            continue;
        }
        *qm.by_state.entry(job.state).or_insert(0.0) += 1.0;
    }
    qm
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::test_support::job;

    #[test]
    fn test_pending_split_by_dependency() {
        let mut waiting = job("a", "u", "p", JobState::Pending, 1);
        waiting.dependency = "afterok:41".into();
        let jobs = vec![
            waiting,
            job("a", "u", "p", JobState::Pending, 1),
            job("a", "u", "p", JobState::Running, 1),
            job("a", "u", "p", JobState::Running, 1),
            job("a", "u", "p", JobState::NodeFail, 1),
        ];
        let qm = queue_metrics(&jobs);
        assert_eq!(qm.count(JobState::Pending), 1.0);
        assert_eq!(qm.pending_dependency, 1.0);
        assert_eq!(qm.count(JobState::Running), 2.0);
        assert_eq!(qm.count(JobState::NodeFail), 1.0);
        assert_eq!(qm.count(JobState::Timeout), 0.0);
    }
}
