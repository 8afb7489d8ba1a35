//! Job kinds and per-job bookkeeping
//!
//! State machine per kind:
//!
//! ```text
//! Idle -> Scheduled -> Running -> Scheduled -> ...
//!   any state -> Stopped (scheduler stopped)
//! ```

use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// The four background jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    DailyGeneration,
    CacheCleanup,
    ResolverRefresh,
    HealthCheck,
}

impl JobKind {
    /// Get all job kinds
    pub fn all() -> [Self; 4] {
        [
            Self::DailyGeneration,
            Self::CacheCleanup,
            Self::ResolverRefresh,
            Self::HealthCheck,
        ]
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DailyGeneration => "daily-generation",
            Self::CacheCleanup => "cache-cleanup",
            Self::ResolverRefresh => "resolver-refresh",
            Self::HealthCheck => "health-check",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When a job fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSpec {
    /// Once a day at a local wall-clock time
    WallClock(NaiveTime),
    /// Fixed period
    Interval(Duration),
}

impl fmt::Display for JobSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WallClock(time) => write!(f, "daily at {}", time.format("%H:%M")),
            Self::Interval(period) => {
                let secs = period.as_secs();
                if secs % 3600 == 0 {
                    write!(f, "every {}h", secs / 3600)
                } else {
                    write!(f, "every {}m", secs / 60)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Scheduled,
    Running,
    Stopped,
}

/// Point-in-time view of one job
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub kind: JobKind,
    pub state: JobState,
    pub enabled: bool,
    pub schedule: String,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub run_count: u64,
}

#[derive(Debug, Clone)]
struct JobRecord {
    state: JobState,
    /// State to return to once a run finishes
    resume: JobState,
    spec: JobSpec,
    enabled: bool,
    last_run_at: Option<DateTime<Utc>>,
    next_run_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
    run_count: u64,
}

impl JobRecord {
    fn new(spec: JobSpec, enabled: bool) -> Self {
        Self {
            state: JobState::Idle,
            resume: JobState::Idle,
            spec,
            enabled,
            last_run_at: None,
            next_run_at: None,
            last_error: None,
            run_count: 0,
        }
    }
}

/// Bookkeeping for every job kind
#[derive(Debug, Default)]
pub struct JobBoard {
    records: Mutex<BTreeMap<JobKind, JobRecord>>,
}

impl JobBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<JobKind, JobRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set (or replace) the spec of a job, keeping its history
    pub fn configure(&self, kind: JobKind, spec: JobSpec, enabled: bool) {
        let mut records = self.lock();
        let record = records
            .entry(kind)
            .or_insert_with(|| JobRecord::new(spec, enabled));
        record.spec = spec;
        record.enabled = enabled;
    }

    pub fn mark_scheduled(&self, kind: JobKind, next_run_at: Option<DateTime<Utc>>) {
        if let Some(record) = self.lock().get_mut(&kind) {
            record.next_run_at = next_run_at;
            if record.state == JobState::Running {
                record.resume = JobState::Scheduled;
            } else {
                record.state = JobState::Scheduled;
            }
        }
    }

    pub fn mark_running(&self, kind: JobKind) {
        if let Some(record) = self.lock().get_mut(&kind) {
            if record.state != JobState::Running {
                record.resume = record.state;
            }
            record.state = JobState::Running;
        }
    }

    pub fn mark_finished(&self, kind: JobKind, at: DateTime<Utc>, error: Option<String>) {
        if let Some(record) = self.lock().get_mut(&kind) {
            record.state = record.resume;
            record.last_run_at = Some(at);
            record.last_error = error;
            record.run_count += 1;
        }
    }

    /// Move every job to Stopped and forget pending targets
    pub fn mark_all_stopped(&self) {
        for record in self.lock().values_mut() {
            record.state = JobState::Stopped;
            record.resume = JobState::Stopped;
            record.next_run_at = None;
        }
    }

    pub fn state(&self, kind: JobKind) -> Option<JobState> {
        self.lock().get(&kind).map(|r| r.state)
    }

    pub fn last_run_at(&self, kind: JobKind) -> Option<DateTime<Utc>> {
        self.lock().get(&kind).and_then(|r| r.last_run_at)
    }

    pub fn snapshot(&self) -> Vec<JobStatus> {
        self.lock()
            .iter()
            .map(|(kind, record)| JobStatus {
                kind: *kind,
                state: record.state,
                enabled: record.enabled,
                schedule: record.spec.to_string(),
                last_run_at: record.last_run_at,
                next_run_at: record.next_run_at,
                last_error: record.last_error.clone(),
                run_count: record.run_count,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> JobBoard {
        let board = JobBoard::new();
        board.configure(
            JobKind::CacheCleanup,
            JobSpec::Interval(Duration::from_secs(6 * 3600)),
            true,
        );
        board
    }

    #[test]
    fn test_job_lifecycle() {
        let board = board();
        let kind = JobKind::CacheCleanup;
        assert_eq!(board.state(kind), Some(JobState::Idle));

        board.mark_scheduled(kind, Some(Utc::now()));
        assert_eq!(board.state(kind), Some(JobState::Scheduled));

        board.mark_running(kind);
        assert_eq!(board.state(kind), Some(JobState::Running));

        let at = Utc::now();
        board.mark_finished(kind, at, None);
        assert_eq!(board.state(kind), Some(JobState::Scheduled));
        assert_eq!(board.last_run_at(kind), Some(at));

        board.mark_all_stopped();
        assert_eq!(board.state(kind), Some(JobState::Stopped));
    }

    #[test]
    fn test_manual_run_returns_to_previous_state() {
        let board = board();
        let kind = JobKind::CacheCleanup;
        board.mark_all_stopped();

        board.mark_running(kind);
        board.mark_finished(kind, Utc::now(), Some("boom".to_string()));

        let status = &board.snapshot()[0];
        assert_eq!(status.state, JobState::Stopped);
        assert_eq!(status.last_error.as_deref(), Some("boom"));
        assert_eq!(status.run_count, 1);
    }

    #[test]
    fn test_spec_display() {
        let daily = JobSpec::WallClock(NaiveTime::from_hms_opt(0, 0, 0).unwrap());
        assert_eq!(daily.to_string(), "daily at 00:00");
        assert_eq!(JobSpec::Interval(Duration::from_secs(7200)).to_string(), "every 2h");
        assert_eq!(JobSpec::Interval(Duration::from_secs(300)).to_string(), "every 5m");
    }

    #[test]
    fn test_kind_names() {
        let names: Vec<&str> = JobKind::all().iter().map(JobKind::as_str).collect();
        assert_eq!(
            names,
            vec!["daily-generation", "cache-cleanup", "resolver-refresh", "health-check"]
        );
    }
}
