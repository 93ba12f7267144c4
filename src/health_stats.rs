//! Health statistics for the exporter.
//!
//! Tracks scrape performance, slurmrestd fetch failures and HTTP endpoint
//! usage. Rendered as a plain-text table by the `/health` endpoint.

use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock as StdRwLock};
use std::time::{Instant, SystemTime};

use crate::resource::Resource;
use crate::scrape::ScrapeReport;

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            *self = RunningStat {
                count: 1,
                sum: value,
                min: value,
                max: value,
                last: value,
            };
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// `(last, avg, max, min, count)`
    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

/// Outcome of the most recent scrape.
#[derive(Debug, Clone)]
struct LastScrape {
    at: SystemTime,
    ok: bool,
    error: Option<String>,
}

pub struct HealthStats {
    pub scrape_duration_seconds: Stat,
    pub recorded_families: Stat,
    pub total_scrapes: AtomicU64,
    pub scrape_success_count: AtomicU64,
    pub scrape_failure_count: AtomicU64,
    /// Indexed like [`Resource::ALL`].
    fetch_errors: [AtomicU64; 5],
    pub parse_errors: AtomicU64,
    pub metrics_endpoint_calls: AtomicU64,
    pub start_time: Instant,
    last_scrape: StdRwLock<Option<LastScrape>>,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self {
            scrape_duration_seconds: Stat::default(),
            recorded_families: Stat::default(),
            total_scrapes: AtomicU64::new(0),
            scrape_success_count: AtomicU64::new(0),
            scrape_failure_count: AtomicU64::new(0),
            fetch_errors: Default::default(),
            parse_errors: AtomicU64::new(0),
            metrics_endpoint_calls: AtomicU64::new(0),
            start_time: Instant::now(),
            last_scrape: StdRwLock::new(None),
        }
    }
}

impl HealthStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_scrape(&self, report: &ScrapeReport) {
        self.total_scrapes.fetch_add(1, Ordering::Relaxed);
        self.scrape_duration_seconds
            .add_sample(report.duration.as_secs_f64());
        let recorded = report.families.iter().filter(|(_, ok)| *ok).count();
        self.recorded_families.add_sample(recorded as f64);

        for resource in &report.failed_resources {
            self.fetch_errors[resource.index()].fetch_add(1, Ordering::Relaxed);
        }
        self.parse_errors
            .fetch_add(report.parse_failures.len() as u64, Ordering::Relaxed);

        let ok = report.populate_error.is_none();
        if report.is_success() {
            self.scrape_success_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.scrape_failure_count.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut guard) = self.last_scrape.write() {
            *guard = Some(LastScrape {
                at: SystemTime::now(),
                ok,
                error: report.populate_error.clone(),
            });
        }
    }

    pub fn record_metrics_endpoint_call(&self) {
        self.metrics_endpoint_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_errors(&self, resource: Resource) -> u64 {
        self.fetch_errors[resource.index()].load(Ordering::Relaxed)
    }

    /// Healthy until a scrape fails to populate its cache, and again once
    /// one succeeds.
    pub fn is_healthy(&self) -> bool {
        match self.last_scrape.read() {
            Ok(guard) => guard.as_ref().map(|s| s.ok).unwrap_or(true),
            Err(_) => false,
        }
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_scrape
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().and_then(|s| s.error.clone()))
    }

    pub fn get_scrape_success_rate(&self) -> f64 {
        let success = self.scrape_success_count.load(Ordering::Relaxed);
        let failure = self.scrape_failure_count.load(Ordering::Relaxed);
        let total = success + failure;
        if total == 0 {
            100.0
        } else {
            (success as f64 / total as f64) * 100.0
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn get_last_scrape_time_str(&self) -> String {
        const SECS_PER_DAY: u64 = 86400;
        const SECS_PER_HOUR: u64 = 3600;
        const SECS_PER_MINUTE: u64 = 60;

        let at = match self.last_scrape.read() {
            Ok(guard) => guard.as_ref().map(|s| s.at),
            Err(_) => None,
        };
        match at.and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok()) {
            Some(since_epoch) => {
                let secs = since_epoch.as_secs();
                format!(
                    "{:02}:{:02}:{:02} UTC",
                    (secs % SECS_PER_DAY) / SECS_PER_HOUR,
                    (secs % SECS_PER_HOUR) / SECS_PER_MINUTE,
                    secs % SECS_PER_MINUTE
                )
            }
            None => "N/A".to_string(),
        }
    }

    pub fn render_table(&self) -> String {
        let left_col = 28usize;
        let col_w = 12usize;
        let mut out = String::new();

        let row = |out: &mut String, name: &str, cells: [String; 4]| {
            writeln!(
                out,
                "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
                name,
                cells[0],
                cells[1],
                cells[2],
                cells[3],
                left = left_col,
                col = col_w
            )
            .ok();
        };
        let counter = |value: u64| {
            [
                value.to_string(),
                "N/A".to_string(),
                "N/A".to_string(),
                "N/A".to_string(),
            ]
        };

        writeln!(out, "HEALTH ENDPOINT - EXPORTER INTERNAL STATS").ok();
        writeln!(out, "==========================================").ok();
        writeln!(out).ok();
        row(
            &mut out,
            "",
            ["current", "average", "max", "min"].map(String::from),
        );

        writeln!(out).ok();
        writeln!(out, "SCRAPE PERFORMANCE").ok();
        writeln!(out, "------------------").ok();

        let (d_cur, d_avg, d_max, d_min, _) = self.scrape_duration_seconds.snapshot();
        row(
            &mut out,
            "scrape_duration (s)",
            [d_cur, d_avg, d_max, d_min].map(|v| format!("{:.3}", v)),
        );
        let (f_cur, f_avg, f_max, f_min, _) = self.recorded_families.snapshot();
        row(
            &mut out,
            "recorded_families",
            [
                format!("{:.0}", f_cur),
                format!("{:.1}", f_avg),
                format!("{:.0}", f_max),
                format!("{:.0}", f_min),
            ],
        );
        let rate = format!("{:.1}", self.get_scrape_success_rate());
        row(
            &mut out,
            "scrape_success_rate (%)",
            [rate.clone(), rate.clone(), rate.clone(), rate],
        );

        writeln!(out).ok();
        writeln!(out, "SLURMRESTD ERRORS").ok();
        writeln!(out, "-----------------").ok();
        for resource in Resource::ALL {
            row(
                &mut out,
                &format!("fetch_errors_{}", resource),
                counter(self.fetch_errors(resource)),
            );
        }
        row(
            &mut out,
            "parse_errors",
            counter(self.parse_errors.load(Ordering::Relaxed)),
        );

        writeln!(out).ok();
        writeln!(out, "HTTP SERVER").ok();
        writeln!(out, "-----------").ok();
        row(
            &mut out,
            "metrics_endpoint_calls",
            counter(self.metrics_endpoint_calls.load(Ordering::Relaxed)),
        );

        writeln!(out).ok();
        if let Some(error) = self.last_error() {
            writeln!(out, "last error: {}", error).ok();
        }
        writeln!(
            out,
            "number of done scrapes: {} | last scrape: {} | uptime: {:.1}h",
            self.total_scrapes.load(Ordering::Relaxed),
            self.get_last_scrape_time_str(),
            self.get_uptime_seconds() as f64 / 3600.0
        )
        .ok();

        out
    }
}
