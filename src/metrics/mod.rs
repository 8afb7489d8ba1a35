//! Prometheus metrics for the resolver, scheduler and content store
//!
//! This module provides metrics tracking for:
//! - Resolver: resolutions by outcome, endpoint attempts, live resolve latency
//! - Scheduler: job runs, job duration, in-flight generation, cache sweeps
//! - Store and API: article counts, HTTP requests
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for resolver metrics
struct ResolverMetrics {
    resolutions: CounterVec,
    endpoint_attempts: CounterVec,
    resolve_duration: HistogramVec,
}

/// Container for scheduler, store and API metrics
struct RuntimeMetrics {
    job_runs: CounterVec,
    job_duration: HistogramVec,
    is_generating: Gauge,
    scheduler_running: Gauge,
    cache_evictions: CounterVec,
    store_articles: Gauge,
    store_keys: Gauge,
    api_requests: CounterVec,
    api_duration: HistogramVec,
}

/// Global storage for resolver metrics
static RESOLVER_METRICS: OnceLock<ResolverMetrics> = OnceLock::new();

/// Global storage for runtime metrics
static RUNTIME_METRICS: OnceLock<RuntimeMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// Safe to call more than once. If registration fails the error is returned
/// and every `record_*` helper stays a no-op.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = wordday::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let resolver = ResolverMetrics {
        resolutions: register_counter_vec!(
            "wordday_resolver_resolutions_total",
            "Answer resolutions by outcome (cache, pinned, remote, fallback)",
            &["outcome"]
        )?,
        endpoint_attempts: register_counter_vec!(
            "wordday_resolver_endpoint_attempts_total",
            "Remote endpoint attempts by host and result",
            &["endpoint", "result"]
        )?,
        resolve_duration: register_histogram_vec!(
            "wordday_resolver_live_resolve_duration_seconds",
            "Time spent in a live resolution including fallback",
            &["mode"],
            vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 3.0, 5.0, 10.0]
        )?,
    };

    let runtime = RuntimeMetrics {
        job_runs: register_counter_vec!(
            "wordday_scheduler_job_runs_total",
            "Scheduler job executions by job and status",
            &["job", "status"]
        )?,
        job_duration: register_histogram_vec!(
            "wordday_scheduler_job_duration_seconds",
            "Scheduler job duration in seconds",
            &["job"],
            vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
        )?,
        is_generating: register_gauge!(
            "wordday_scheduler_is_generating",
            "Whether a generation is in flight (1 = yes, 0 = no)"
        )?,
        scheduler_running: register_gauge!(
            "wordday_scheduler_running",
            "Whether the scheduler is running (1 = yes, 0 = no)"
        )?,
        cache_evictions: register_counter_vec!(
            "wordday_cache_evictions_total",
            "Expired entries removed by cache sweeps",
            &["cache"]
        )?,
        store_articles: register_gauge!(
            "wordday_store_articles",
            "Articles currently held by the content store"
        )?,
        store_keys: register_gauge!(
            "wordday_store_keys",
            "Distinct answer keys in the content store"
        )?,
        api_requests: register_counter_vec!(
            "wordday_api_requests_total",
            "Total API requests by endpoint and status",
            &["endpoint", "status"]
        )?,
        api_duration: register_histogram_vec!(
            "wordday_api_request_duration_seconds",
            "API request duration in seconds",
            &["endpoint"],
            vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
        )?,
    };

    RESOLVER_METRICS
        .set(resolver)
        .map_err(|_| "Resolver metrics already initialized")?;
    RUNTIME_METRICS
        .set(runtime)
        .map_err(|_| "Runtime metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    RESOLVER_METRICS.get().is_some() && RUNTIME_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Histogram timer guard that records duration on drop
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl MetricsTimer {
    fn new(timer: prometheus::HistogramTimer) -> Self {
        Self { timer: Some(timer) }
    }

    /// Create a no-op timer when metrics are not initialized
    fn noop() -> Self {
        Self { timer: None }
    }
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop_and_record();
        }
    }
}

/// Record how a resolution was answered
pub fn record_resolution(outcome: &str) {
    if let Some(m) = RESOLVER_METRICS.get() {
        m.resolutions.with_label_values(&[outcome]).inc();
    }
}

/// Record one remote endpoint attempt
pub fn record_endpoint_attempt(endpoint: &str, success: bool) {
    if let Some(m) = RESOLVER_METRICS.get() {
        let result = if success { "success" } else { "failure" };
        m.endpoint_attempts
            .with_label_values(&[endpoint, result])
            .inc();
    }
}

/// Start a live resolution timer ("live" or "forced")
pub fn start_resolve_timer(mode: &str) -> MetricsTimer {
    match RESOLVER_METRICS.get() {
        Some(m) => MetricsTimer::new(m.resolve_duration.with_label_values(&[mode]).start_timer()),
        None => MetricsTimer::noop(),
    }
}

/// Start a job timer
pub fn start_job_timer(job: &str) -> MetricsTimer {
    match RUNTIME_METRICS.get() {
        Some(m) => MetricsTimer::new(m.job_duration.with_label_values(&[job]).start_timer()),
        None => MetricsTimer::noop(),
    }
}

/// Record a finished job run
pub fn record_job_run(job: &str, success: bool) {
    if let Some(m) = RUNTIME_METRICS.get() {
        let status = if success { "success" } else { "failure" };
        m.job_runs.with_label_values(&[job, status]).inc();
    }
}

/// Update scheduler state gauges
pub fn update_scheduler_state(running: bool, generating: bool) {
    let Some(m) = RUNTIME_METRICS.get() else {
        return;
    };

    m.scheduler_running.set(if running { 1.0 } else { 0.0 });
    m.is_generating.set(if generating { 1.0 } else { 0.0 });
}

/// Record entries removed from a cache by a sweep
pub fn record_cache_evictions(cache: &str, removed: usize) {
    if removed == 0 {
        return;
    }
    if let Some(m) = RUNTIME_METRICS.get() {
        m.cache_evictions
            .with_label_values(&[cache])
            .inc_by(removed as f64);
    }
}

/// Update content store size gauges
pub fn update_store_size(articles: usize, keys: usize) {
    if let Some(m) = RUNTIME_METRICS.get() {
        m.store_articles.set(articles as f64);
        m.store_keys.set(keys as f64);
    }
}

/// Record API request
pub fn record_api_request(endpoint: &str, status: u16, duration_secs: f64) {
    let Some(m) = RUNTIME_METRICS.get() else {
        return;
    };

    let status_str = status.to_string();
    m.api_requests
        .with_label_values(&[endpoint, &status_str])
        .inc();
    m.api_duration
        .with_label_values(&[endpoint])
        .observe(duration_secs);
}

// ============================================================================
// Tests
// ============================================================================
