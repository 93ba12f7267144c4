//! Scheduler statistics from slurmctld diagnostics.

use crate::schema::DiagSnapshot;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SchedulerMetrics {
    pub threads: f64,
    pub queue_size: f64,
    pub dbd_queue_size: f64,
    pub last_cycle: f64,
    pub mean_cycle: f64,
    pub cycle_per_minute: f64,
    pub backfill_last_cycle: f64,
    pub backfill_mean_cycle: f64,
    pub backfill_depth_mean: f64,
    pub backfilled_jobs_since_start: f64,
    pub backfilled_jobs_since_cycle: f64,
    pub backfilled_heterogeneous: f64,
}

pub fn scheduler_metrics(diag: &DiagSnapshot) -> SchedulerMetrics {
    SchedulerMetrics {
        threads: diag.server_threads as f64,
        queue_size: diag.agent_queue_size as f64,
        dbd_queue_size: diag.dbd_queue_size as f64,
        last_cycle: diag.schedule_cycle_last as f64,
        mean_cycle: diag.schedule_cycle_mean as f64,
        cycle_per_minute: diag.schedule_cycle_per_minute as f64,
        backfill_last_cycle: diag.backfill_cycle_last as f64,
        backfill_mean_cycle: diag.backfill_cycle_mean as f64,
        backfill_depth_mean: diag.backfill_depth_mean as f64,
        backfilled_jobs_since_start: diag.backfilled_jobs_since_start as f64,
        backfilled_jobs_since_cycle: diag.backfilled_jobs_since_cycle as f64,
        backfilled_heterogeneous: diag.backfilled_heterogeneous_jobs as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_map_to_their_gauges() {
        let diag = DiagSnapshot {
            server_threads: 3,
            agent_queue_size: 2,
            dbd_queue_size: 7,
            schedule_cycle_last: 1500,
            backfill_depth_mean: 12,
            backfilled_jobs_since_cycle: 11,
            ..Default::default()
        };
        let sm = scheduler_metrics(&diag);
        assert_eq!(sm.threads, 3.0);
        assert_eq!(sm.queue_size, 2.0);
        assert_eq!(sm.dbd_queue_size, 7.0);
        assert_eq!(sm.last_cycle, 1500.0);
        assert_eq!(sm.backfill_depth_mean, 12.0);
        assert_eq!(sm.backfilled_jobs_since_cycle, 11.0);
        assert_eq!(sm.mean_cycle, 0.0);
    }
}
