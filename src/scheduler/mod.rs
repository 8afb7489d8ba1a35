//! Background job runner
//!
//! Drives four jobs inside one process without an external cron:
//!
//! ```text
//!                    ┌─────────────┐
//!   daily_time ─────▶│   Daily     │── invalidate ─▶ resolve ─▶ produce ─▶ store
//!                    │ Generation  │
//!                    └─────────────┘
//!   every N hours ──▶ Cache Cleanup     (sweep every registered cache, expire store)
//!   every N hours ──▶ Resolver Refresh  (warm the answer cache, also at start)
//!   every N min   ──▶ Health Check      (log only when unhealthy)
//! ```
//!
//! # Modules
//!
//! - [`trigger`] - Configuration and wall-clock trigger math
//! - [`job`] - Job kinds, states and bookkeeping
//! - [`error`] - Scheduler error types
//!
//! Each job runs in its own tokio task selecting on a shared `watch`
//! shutdown channel. `stop` signals and then joins every task, so once it
//! returns no job body can start; a body already running is allowed to
//! finish.
//!
//! Generations are serialized by a mutex. A request that arrives while one
//! is in flight logs a warning and waits its turn; the in-flight flag is what
//! `health_check` reports.

pub mod error;
pub mod job;
pub mod trigger;

use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::cache::{CacheStats, ExpiringCache};
use crate::content::{ContentProducer, DateContext};
use crate::metrics;
use crate::models::AnswerRecord;
use crate::resolver::{sequence_number, AnswerResolver, ResolverStatus};
use crate::storage::ContentStore;
use crate::utils::{normalize_word, Clock};

pub use error::{SchedulerError, SchedulerResult};
pub use job::{JobBoard, JobKind, JobSpec, JobState, JobStatus};
pub use trigger::{next_daily_run, SchedulerConfig, SchedulerConfigBuilder};

/// Source tag for operator-supplied answers
pub const MANUAL_SOURCE: &str = "manual";

// ============================================================================
// Reports
// ============================================================================

/// Aggregate health
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub issues: Vec<String>,
}

/// Outcome of one generation
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub answer: AnswerRecord,
    pub items_stored: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Outcome of one cleanup
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    /// Entries removed per cache name
    pub swept: Vec<(String, usize)>,
    /// Whether the content store was cleared as stale
    pub store_expired: bool,
}

impl CleanupReport {
    pub fn total_swept(&self) -> usize {
        self.swept.iter().map(|(_, n)| n).sum()
    }
}

/// Per-cache counts for status output
#[derive(Debug, Clone, Serialize)]
pub struct CacheSummary {
    pub name: String,
    pub stats: CacheStats,
}

/// Scheduler status
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub is_generating: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub config: SchedulerConfig,
    pub jobs: Vec<JobStatus>,
    pub caches: Vec<CacheSummary>,
    pub resolver: ResolverStatus,
}

// ============================================================================
// Scheduler
// ============================================================================

/// Validated configuration with the parsed daily time
#[derive(Debug, Clone)]
struct ActiveConfig {
    config: SchedulerConfig,
    daily_time: NaiveTime,
}

impl ActiveConfig {
    fn new(config: SchedulerConfig) -> SchedulerResult<Self> {
        config.validate()?;
        let daily_time = config.parse_daily_time()?;
        Ok(Self { config, daily_time })
    }

    fn spec(&self, kind: JobKind) -> (JobSpec, bool) {
        let c = &self.config;
        match kind {
            JobKind::DailyGeneration => (
                JobSpec::WallClock(self.daily_time),
                c.enable_daily_generation,
            ),
            JobKind::CacheCleanup => (
                JobSpec::Interval(c.cleanup_interval()),
                c.enable_cache_cleanup,
            ),
            JobKind::ResolverRefresh => (
                JobSpec::Interval(c.refresh_interval()),
                c.enable_resolver_refresh,
            ),
            JobKind::HealthCheck => (JobSpec::Interval(c.health_interval()), c.enable_health_check),
        }
    }
}

/// Shared state reachable from job tasks
struct SchedulerInner {
    config: RwLock<ActiveConfig>,
    resolver: Arc<AnswerResolver>,
    store: Arc<ContentStore>,
    producer: Arc<dyn ContentProducer>,
    clock: Arc<dyn Clock>,
    caches: Mutex<Vec<Arc<dyn ExpiringCache>>>,
    jobs: JobBoard,
    generation_lock: tokio::sync::Mutex<()>,
    is_generating: AtomicBool,
    running: AtomicBool,
    started_at: Mutex<Option<DateTime<Utc>>>,
}

/// Live tasks of a started scheduler
struct RunningJobs {
    shutdown: watch::Sender<bool>,
    handles: Vec<(JobKind, JoinHandle<()>)>,
}

/// Owns and drives the background jobs
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
    running: tokio::sync::Mutex<Option<RunningJobs>>,
}

/// Clears the in-flight flag even if a generation is cancelled
struct GeneratingFlag<'a> {
    flag: &'a AtomicBool,
    running: &'a AtomicBool,
}

impl Drop for GeneratingFlag<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
        metrics::update_scheduler_state(self.running.load(Ordering::SeqCst), false);
    }
}

impl Scheduler {
    /// Create a stopped scheduler
    ///
    /// The resolver's answer cache is registered for sweeping.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError` if the configuration is invalid
    pub fn new(
        config: SchedulerConfig,
        resolver: Arc<AnswerResolver>,
        store: Arc<ContentStore>,
        producer: Arc<dyn ContentProducer>,
        clock: Arc<dyn Clock>,
    ) -> SchedulerResult<Self> {
        let active = ActiveConfig::new(config)?;

        let jobs = JobBoard::new();
        for kind in JobKind::all() {
            let (spec, enabled) = active.spec(kind);
            jobs.configure(kind, spec, enabled);
        }

        let answer_cache: Arc<dyn ExpiringCache> = resolver.cache();

        Ok(Self {
            inner: Arc::new(SchedulerInner {
                config: RwLock::new(active),
                resolver,
                store,
                producer,
                clock,
                caches: Mutex::new(vec![answer_cache]),
                jobs,
                generation_lock: tokio::sync::Mutex::new(()),
                is_generating: AtomicBool::new(false),
                running: AtomicBool::new(false),
                started_at: Mutex::new(None),
            }),
            running: tokio::sync::Mutex::new(None),
        })
    }

    /// Add a cache to the cleanup sweep
    pub fn register_cache(&self, cache: Arc<dyn ExpiringCache>) {
        tracing::debug!(cache = cache.name(), "Registered cache for cleanup");
        self.inner
            .caches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(cache);
    }

    /// Spawn one task per enabled job; no-op when already running
    pub async fn start(&self) {
        let mut running = self.running.lock().await;
        if running.is_some() {
            tracing::debug!("Scheduler already running");
            return;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let active = self.inner.active_config();

        let mut handles = Vec::new();
        for kind in JobKind::all() {
            let (spec, enabled) = active.spec(kind);
            self.inner.jobs.configure(kind, spec, enabled);
            if !enabled {
                tracing::info!(job = %kind, "Job disabled");
                continue;
            }

            let inner = self.inner.clone();
            let rx = shutdown_rx.clone();
            let handle = match spec {
                JobSpec::WallClock(time) => tokio::spawn(inner.run_daily_loop(time, rx)),
                JobSpec::Interval(period) => {
                    tokio::spawn(inner.run_interval_loop(kind, period, rx))
                }
            };
            handles.push((kind, handle));
        }

        self.inner.running.store(true, Ordering::SeqCst);
        *self
            .inner
            .started_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(self.inner.clock.now());
        metrics::update_scheduler_state(true, self.inner.is_generating.load(Ordering::SeqCst));

        tracing::info!(
            jobs = handles.len(),
            daily_time = %active.config.daily_time,
            "Scheduler started"
        );
        *running = Some(RunningJobs { shutdown, handles });
    }

    /// Signal every job task and wait for it to exit; no-op when stopped
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        let Some(jobs) = running.take() else {
            tracing::debug!("Scheduler already stopped");
            return;
        };

        let _ = jobs.shutdown.send(true);
        let (kinds, handles): (Vec<JobKind>, Vec<JoinHandle<()>>) =
            jobs.handles.into_iter().unzip();
        let results = futures::future::join_all(handles).await;
        for (kind, result) in kinds.into_iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(job = %kind, error = %e, "Job task ended abnormally");
            }
        }

        self.inner.jobs.mark_all_stopped();
        self.inner.running.store(false, Ordering::SeqCst);
        metrics::update_scheduler_state(false, self.inner.is_generating.load(Ordering::SeqCst));
        tracing::info!("Scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn is_generating(&self) -> bool {
        self.inner.is_generating.load(Ordering::SeqCst)
    }

    /// Run the daily generation now, optionally for an operator-supplied word
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidWord` if `word` is not five letters
    pub async fn trigger_manual_generation(
        &self,
        word: Option<&str>,
    ) -> SchedulerResult<GenerationReport> {
        let pinned = match word {
            Some(raw) => Some(
                normalize_word(raw).ok_or_else(|| SchedulerError::invalid_word(raw))?,
            ),
            None => None,
        };

        tracing::info!(word = ?pinned, "Manual generation requested");
        self.inner.generate(pinned).await
    }

    /// Evict the cached answer and resolve again
    pub async fn force_refresh(&self) -> AnswerRecord {
        self.inner.refresh(true).await
    }

    /// Sweep every registered cache and expire the store if stale
    pub async fn run_cleanup(&self) -> CleanupReport {
        self.inner.cleanup().await
    }

    pub async fn health_check(&self) -> HealthReport {
        self.inner.health().await
    }

    pub fn get_status(&self) -> SchedulerStatus {
        let caches = self
            .inner
            .caches()
            .iter()
            .map(|cache| CacheSummary {
                name: cache.name().to_string(),
                stats: cache.stats(),
            })
            .collect();

        SchedulerStatus {
            running: self.is_running(),
            is_generating: self.is_generating(),
            started_at: *self
                .inner
                .started_at
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
            config: self.inner.active_config().config,
            jobs: self.inner.jobs.snapshot(),
            caches,
            resolver: self.inner.resolver.status(),
        }
    }

    pub fn config(&self) -> SchedulerConfig {
        self.inner.active_config().config
    }

    /// Replace the configuration, restarting the jobs if they were running
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError` if the new configuration is invalid; the
    /// current configuration and running state are untouched in that case
    pub async fn update_config(&self, config: SchedulerConfig) -> SchedulerResult<()> {
        let active = ActiveConfig::new(config)?;
        let was_running = self.is_running();

        self.stop().await;
        {
            let mut current = self
                .inner
                .config
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *current = active;
        }
        for kind in JobKind::all() {
            let (spec, enabled) = self.inner.active_config().spec(kind);
            self.inner.jobs.configure(kind, spec, enabled);
        }
        tracing::info!(restart = was_running, "Scheduler configuration updated");

        if was_running {
            self.start().await;
        }
        Ok(())
    }
}

impl SchedulerInner {
    fn active_config(&self) -> ActiveConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn caches(&self) -> Vec<Arc<dyn ExpiringCache>> {
        self.caches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Self-rescheduling one-shot: the target is recomputed after every run
    async fn run_daily_loop(
        self: Arc<Self>,
        time: NaiveTime,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let kind = JobKind::DailyGeneration;

        'schedule: loop {
            let next = next_daily_run(self.clock.now(), time, self.resolver.offset());
            self.jobs.mark_scheduled(kind, Some(next));
            tracing::debug!(job = %kind, next_run = %next, "Daily generation scheduled");

            // The timer is monotonic; the wall clock must reach the target too
            loop {
                let now = self.clock.now();
                if now >= next {
                    break;
                }
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break 'schedule,
                    _ = tokio::time::sleep(trigger::duration_until(now, next)) => {}
                }
                if *shutdown_rx.borrow() {
                    break 'schedule;
                }
            }

            if let Err(e) = self.generate(None).await {
                tracing::warn!(job = %kind, error = %e, "Daily generation failed");
            }
        }

        tracing::info!(job = %kind, "Job task shutting down");
    }

    async fn run_interval_loop(
        self: Arc<Self>,
        kind: JobKind,
        period: std::time::Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        // Resolver refresh also runs once right away
        let first = if kind == JobKind::ResolverRefresh {
            Instant::now()
        } else {
            Instant::now() + period
        };
        let mut ticker = interval_at(first, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let period_chrono = chrono::Duration::from_std(period).unwrap_or(chrono::Duration::zero());
        let initial_wait =
            chrono::Duration::from_std(first.saturating_duration_since(Instant::now()))
                .unwrap_or(chrono::Duration::zero());
        self.jobs
            .mark_scheduled(kind, Some(self.clock.now() + initial_wait));

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break,
                _ = ticker.tick() => {}
            }
            if *shutdown_rx.borrow() {
                break;
            }

            match kind {
                JobKind::CacheCleanup => {
                    self.cleanup().await;
                }
                JobKind::ResolverRefresh => {
                    self.refresh(false).await;
                }
                JobKind::HealthCheck => {
                    self.health_job().await;
                }
                JobKind::DailyGeneration => {
                    tracing::warn!("Daily generation is not an interval job");
                    break;
                }
            }

            self.jobs
                .mark_scheduled(kind, Some(self.clock.now() + period_chrono));
        }

        tracing::info!(job = %kind, "Job task shutting down");
    }

    /// Daily generation body: resolve (or take the pinned word), produce, store
    async fn generate(&self, word: Option<String>) -> SchedulerResult<GenerationReport> {
        let kind = JobKind::DailyGeneration;

        if self.is_generating.load(Ordering::SeqCst) {
            tracing::warn!("Generation already in progress, waiting for it to finish");
        }
        let _serial = self.generation_lock.lock().await;

        self.is_generating.store(true, Ordering::SeqCst);
        let _flag = GeneratingFlag {
            flag: &self.is_generating,
            running: &self.running,
        };
        metrics::update_scheduler_state(self.running.load(Ordering::SeqCst), true);

        let _timer = metrics::start_job_timer(kind.as_str());
        self.jobs.mark_running(kind);
        let started_at = self.clock.now();

        let answer = match word {
            Some(word) => {
                let date = self.resolver.today();
                AnswerRecord {
                    word,
                    sequence_number: sequence_number(date),
                    date,
                    source: MANUAL_SOURCE.to_string(),
                    is_authoritative: true,
                }
            }
            None => {
                self.resolver.invalidate_today();
                self.resolver.resolve_today().await
            }
        };

        let ctx = DateContext::for_answer(&answer, started_at);
        let items = self.producer.produce(&answer, &ctx);
        if items.is_empty() {
            let err = SchedulerError::generation_failed(format!(
                "producer returned no items for {}",
                answer.word
            ));
            self.jobs
                .mark_finished(kind, self.clock.now(), Some(err.to_string()));
            metrics::record_job_run(kind.as_str(), false);
            return Err(err);
        }

        let items_stored = self.store.upsert_many(&answer.key(), items).await;
        let finished_at = self.clock.now();
        self.jobs.mark_finished(kind, finished_at, None);
        metrics::record_job_run(kind.as_str(), true);

        tracing::info!(
            word = %answer.word,
            date = %answer.date,
            authoritative = answer.is_authoritative,
            source = %answer.source,
            items_stored,
            "Daily generation completed"
        );

        Ok(GenerationReport {
            answer,
            items_stored,
            started_at,
            finished_at,
        })
    }

    async fn cleanup(&self) -> CleanupReport {
        let kind = JobKind::CacheCleanup;
        let _timer = metrics::start_job_timer(kind.as_str());
        self.jobs.mark_running(kind);

        let mut report = CleanupReport::default();
        for cache in self.caches() {
            let removed = cache.sweep_expired();
            metrics::record_cache_evictions(cache.name(), removed);
            report.swept.push((cache.name().to_string(), removed));
        }
        report.store_expired = self.store.expire_if_stale().await;

        self.jobs.mark_finished(kind, self.clock.now(), None);
        metrics::record_job_run(kind.as_str(), true);
        tracing::info!(
            swept = report.total_swept(),
            store_expired = report.store_expired,
            "Cache cleanup completed"
        );
        report
    }

    async fn refresh(&self, force: bool) -> AnswerRecord {
        let kind = JobKind::ResolverRefresh;
        let _timer = metrics::start_job_timer(kind.as_str());
        self.jobs.mark_running(kind);

        let answer = if force {
            self.resolver.force_refresh().await
        } else {
            self.resolver.resolve_today().await
        };

        self.jobs.mark_finished(kind, self.clock.now(), None);
        metrics::record_job_run(kind.as_str(), true);
        tracing::debug!(
            word = %answer.word,
            authoritative = answer.is_authoritative,
            force,
            "Resolver refreshed"
        );
        answer
    }

    async fn health(&self) -> HealthReport {
        let mut issues = Vec::new();

        if !self.store.is_initialized().await {
            issues.push("content store is not initialized".to_string());
        }
        if self.is_generating.load(Ordering::SeqCst) {
            issues.push("a generation is currently in progress".to_string());
        }
        if !self.running.load(Ordering::SeqCst) {
            issues.push("scheduler is not running".to_string());
        }

        HealthReport {
            healthy: issues.is_empty(),
            issues,
        }
    }

    async fn health_job(&self) {
        let kind = JobKind::HealthCheck;
        self.jobs.mark_running(kind);

        let report = self.health().await;
        if !report.healthy {
            tracing::warn!(issues = ?report.issues, "Health check found issues");
        }

        let error = (!report.healthy).then(|| report.issues.join("; "));
        self.jobs.mark_finished(kind, self.clock.now(), error);
        metrics::record_job_run(kind.as_str(), report.healthy);
    }
}
