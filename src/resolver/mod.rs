//! Today's answer, from remote endpoints or the offline fallback
//!
//! `resolve_today` never fails. Lookup order:
//!
//! 1. cache entry for today's local date
//! 2. cache entry for the pinned day (the day of the last resolution) while
//!    today's entry has not been populated yet
//! 3. live attempt: endpoints tried in rotation, each bounded by the request
//!    timeout, the whole sequence bounded by the overall timeout
//! 4. deterministic fallback from [`fallback`]
//!
//! Live results are cached with `cache_ttl_secs`, fallback results with the
//! shorter `fallback_ttl_secs` so a network blip does not hold the offline
//! word for a full cache period.

pub mod fallback;
pub mod response;

use anyhow::Result;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::cache::{CacheStats, TtlCache};
use crate::metrics;
use crate::models::AnswerRecord;
use crate::utils::error::ResolveError;
use crate::utils::{extract_domain, Clock};

pub use fallback::{fallback_record, fallback_word, sequence_number, FALLBACK_SOURCE};
pub use response::{parse_answer, ParsedAnswer};

/// Placeholder replaced by the ISO date in endpoint templates
pub const DATE_PLACEHOLDER: &str = "{date}";

/// Resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Ordered endpoint URL templates; `{date}` becomes `YYYY-MM-DD`
    pub endpoints: Vec<String>,

    /// Timeout for a single endpoint call in milliseconds
    pub request_timeout_ms: u64,

    /// Budget for the whole rotation before falling back, in milliseconds
    pub overall_timeout_ms: u64,

    /// Maximum endpoint attempts per live resolution
    pub max_attempts: u32,

    /// TTL for live answers in seconds
    pub cache_ttl_secs: u64,

    /// TTL for fallback answers in seconds
    pub fallback_ttl_secs: u64,

    /// Offset from UTC that defines the local calendar day
    pub utc_offset_minutes: i32,

    /// User agent string
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![
                "https://www.nytimes.com/svc/wordle/v2/{date}.json".to_string(),
                "https://wordle-api.vercel.app/api/wordle/{date}".to_string(),
            ],
            request_timeout_ms: 2_000,
            overall_timeout_ms: 5_000,
            max_attempts: 3,
            cache_ttl_secs: 3_600,
            fallback_ttl_secs: 300,
            utc_offset_minutes: 0,
            user_agent: format!("wordday/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ResolverConfig {
    /// Load resolver settings from `WORDDAY_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoints: std::env::var("WORDDAY_ENDPOINTS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(str::trim)
                        .filter(|e| !e.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or(defaults.endpoints),
            request_timeout_ms: env_parse("WORDDAY_REQUEST_TIMEOUT_MS")
                .unwrap_or(defaults.request_timeout_ms),
            overall_timeout_ms: env_parse("WORDDAY_OVERALL_TIMEOUT_MS")
                .unwrap_or(defaults.overall_timeout_ms),
            max_attempts: env_parse("WORDDAY_MAX_ATTEMPTS").unwrap_or(defaults.max_attempts),
            cache_ttl_secs: env_parse("WORDDAY_CACHE_TTL_SECS").unwrap_or(defaults.cache_ttl_secs),
            fallback_ttl_secs: env_parse("WORDDAY_FALLBACK_TTL_SECS")
                .unwrap_or(defaults.fallback_ttl_secs),
            utc_offset_minutes: env_parse("WORDDAY_UTC_OFFSET_MINUTES")
                .unwrap_or(defaults.utc_offset_minutes),
            user_agent: std::env::var("WORDDAY_USER_AGENT").unwrap_or(defaults.user_agent),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_ms == 0 {
            anyhow::bail!("request_timeout_ms must be greater than 0");
        }
        if self.overall_timeout_ms == 0 {
            anyhow::bail!("overall_timeout_ms must be greater than 0");
        }
        if self.request_timeout_ms >= self.overall_timeout_ms {
            anyhow::bail!(
                "request_timeout_ms ({}) must be less than overall_timeout_ms ({})",
                self.request_timeout_ms,
                self.overall_timeout_ms
            );
        }
        if self.max_attempts == 0 {
            anyhow::bail!("max_attempts must be greater than 0");
        }
        if self.cache_ttl_secs == 0 {
            anyhow::bail!("cache_ttl_secs must be greater than 0");
        }
        if self.fallback_ttl_secs > self.cache_ttl_secs {
            anyhow::bail!("fallback_ttl_secs must not exceed cache_ttl_secs");
        }
        if self.utc_offset().is_none() {
            anyhow::bail!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            );
        }
        for endpoint in &self.endpoints {
            let sample = endpoint.replace(DATE_PLACEHOLDER, "2024-01-01");
            url::Url::parse(&sample)
                .map_err(|e| anyhow::anyhow!("invalid endpoint {endpoint}: {e}"))?;
        }
        Ok(())
    }

    /// Offset as a chrono timezone (None when out of range)
    pub fn utc_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.checked_mul(60)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn overall_timeout(&self) -> Duration {
        Duration::from_millis(self.overall_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fallback_ttl(&self) -> Duration {
        Duration::from_secs(self.fallback_ttl_secs)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

/// Cache key for a calendar date
pub fn cache_key(date: NaiveDate) -> String {
    format!("answer:{}", date.format("%Y-%m-%d"))
}

/// Local calendar date of an instant under a fixed offset
pub fn local_date(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

/// Resolver counters and state for status output
#[derive(Debug, Clone, Serialize)]
pub struct ResolverStatus {
    pub endpoints: usize,
    pub rotation_index: usize,
    pub today: NaiveDate,
    pub pinned_day: Option<NaiveDate>,
    pub cache: CacheStats,
    pub live_resolutions: u64,
    pub remote_successes: u64,
    pub fallbacks: u64,
}

/// Resolves the day's answer with rotation, timeouts and fallback
pub struct AnswerResolver {
    config: ResolverConfig,
    client: Client,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    cache: Arc<TtlCache<AnswerRecord>>,
    rotation: AtomicUsize,
    pinned_day: Mutex<Option<NaiveDate>>,
    live_resolutions: AtomicU64,
    remote_successes: AtomicU64,
    fallbacks: AtomicU64,
}

impl AnswerResolver {
    /// Create a resolver with its own answer cache
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::Http` if the HTTP client cannot be created and
    /// `ResolveError::InvalidOffset` if the UTC offset is out of range
    pub fn new(config: ResolverConfig, clock: Arc<dyn Clock>) -> Result<Self, ResolveError> {
        let offset = config
            .utc_offset()
            .ok_or(ResolveError::InvalidOffset(config.utc_offset_minutes))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(config.request_timeout())
            .gzip(true)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        let cache = Arc::new(TtlCache::new("answers", config.cache_ttl(), clock.clone()));

        Ok(Self {
            config,
            client,
            clock,
            offset,
            cache,
            rotation: AtomicUsize::new(0),
            pinned_day: Mutex::new(None),
            live_resolutions: AtomicU64::new(0),
            remote_successes: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
        })
    }

    /// Today's local calendar date
    pub fn today(&self) -> NaiveDate {
        local_date(self.clock.now(), self.offset)
    }

    /// Today's answer; never fails
    pub async fn resolve_today(&self) -> AnswerRecord {
        let today = self.today();

        if let Some(record) = self.cache.get(&cache_key(today)) {
            metrics::record_resolution("cache");
            return record;
        }

        if let Some(pinned) = self.pinned_day().filter(|day| *day != today) {
            if let Some(record) = self.cache.get(&cache_key(pinned)) {
                tracing::debug!(
                    %today,
                    %pinned,
                    word = %record.word,
                    "Serving pinned day until today's answer is populated"
                );
                metrics::record_resolution("pinned");
                return record;
            }
        }

        let _timer = metrics::start_resolve_timer("live");
        self.resolve_live(today).await
    }

    /// Drop cached answers for today and the pinned day, then resolve once
    pub async fn force_refresh(&self) -> AnswerRecord {
        let today = self.today();
        self.invalidate_today();

        tracing::info!(%today, "Forcing answer refresh");
        let _timer = metrics::start_resolve_timer("forced");
        self.resolve_live(today).await
    }

    /// Evict today's cached answer and release the pinned day
    pub fn invalidate_today(&self) {
        let today = self.today();
        self.cache.delete(&cache_key(today));

        let mut pinned = self.pinned_day.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(day) = pinned.take() {
            self.cache.delete(&cache_key(day));
        }
    }

    /// Deterministic answer for a date, no I/O
    pub fn fallback_for(&self, date: NaiveDate) -> AnswerRecord {
        fallback_record(date)
    }

    /// Shared handle to the answer cache
    pub fn cache(&self) -> Arc<TtlCache<AnswerRecord>> {
        self.cache.clone()
    }

    /// Offset defining the local calendar day
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Endpoint index the next live attempt starts from
    pub fn rotation_index(&self) -> usize {
        self.rotation.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Day of the last resolution, if any
    pub fn pinned_day(&self) -> Option<NaiveDate> {
        *self.pinned_day.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counters and cache state
    pub fn status(&self) -> ResolverStatus {
        ResolverStatus {
            endpoints: self.config.endpoints.len(),
            rotation_index: self.rotation_index(),
            today: self.today(),
            pinned_day: self.pinned_day(),
            cache: self.cache.stats(),
            live_resolutions: self.live_resolutions.load(Ordering::Relaxed),
            remote_successes: self.remote_successes.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
        }
    }

    async fn resolve_live(&self, date: NaiveDate) -> AnswerRecord {
        self.live_resolutions.fetch_add(1, Ordering::Relaxed);
        let key = cache_key(date);

        let outcome =
            tokio::time::timeout(self.config.overall_timeout(), self.fetch_rotating(date)).await;

        let record = match outcome {
            Ok(Ok(record)) => {
                self.remote_successes.fetch_add(1, Ordering::Relaxed);
                metrics::record_resolution("remote");
                tracing::info!(
                    %date,
                    word = %record.word,
                    source = %record.source,
                    "Resolved answer from remote endpoint"
                );
                self.cache.set(key, record.clone());
                record
            }
            Ok(Err(e)) => {
                tracing::warn!(%date, error = %e, "Remote resolution failed, using fallback");
                self.cache_fallback(key, date)
            }
            Err(_) => {
                // The endpoint in flight is the one under the pointer
                let skipped = self.advance_rotation();
                tracing::warn!(
                    %date,
                    timeout_ms = self.config.overall_timeout_ms,
                    endpoint = skipped.unwrap_or_default(),
                    "Remote resolution timed out, using fallback"
                );
                self.cache_fallback(key, date)
            }
        };

        *self.pinned_day.lock().unwrap_or_else(PoisonError::into_inner) = Some(date);
        record
    }

    fn cache_fallback(&self, key: String, date: NaiveDate) -> AnswerRecord {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
        metrics::record_resolution("fallback");

        let record = fallback_record(date);
        self.cache
            .set_with_ttl(key, record.clone(), self.config.fallback_ttl());
        record
    }

    /// Try endpoints starting at the rotation pointer, advancing it on failure
    async fn fetch_rotating(&self, date: NaiveDate) -> Result<AnswerRecord, ResolveError> {
        let count = self.config.endpoints.len();
        if count == 0 {
            return Err(ResolveError::NoEndpoints);
        }

        let mut last_error = None;
        for attempt in 1..=self.config.max_attempts {
            let index = self.rotation.load(Ordering::SeqCst) % count;
            let endpoint = &self.config.endpoints[index];

            match self.fetch_one(endpoint, date).await {
                Ok(record) => return Ok(record),
                Err(e) => {
                    if e.is_recoverable() {
                        tracing::debug!(
                            attempt,
                            endpoint = %endpoint,
                            error = %e,
                            "Endpoint attempt failed"
                        );
                    } else {
                        tracing::warn!(
                            attempt,
                            endpoint = %endpoint,
                            error = %e,
                            "Endpoint is misconfigured"
                        );
                    }
                    self.rotation.store((index + 1) % count, Ordering::SeqCst);
                    last_error = Some(e);
                }
            }
        }

        Err(ResolveError::Exhausted {
            attempts: self.config.max_attempts,
            last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    /// Move the pointer past the current endpoint, returning that endpoint
    fn advance_rotation(&self) -> Option<&str> {
        let count = self.config.endpoints.len();
        if count == 0 {
            return None;
        }
        let index = self.rotation.load(Ordering::SeqCst) % count;
        self.rotation.store((index + 1) % count, Ordering::SeqCst);
        Some(&self.config.endpoints[index])
    }

    async fn fetch_one(
        &self,
        template: &str,
        date: NaiveDate,
    ) -> Result<AnswerRecord, ResolveError> {
        let url = template.replace(DATE_PLACEHOLDER, &date.format("%Y-%m-%d").to_string());
        let host = extract_domain(&url).map_err(|_| ResolveError::InvalidUrl(url.clone()))?;

        let result = self.request(&url).await.and_then(|body| parse_answer(&body));
        metrics::record_endpoint_attempt(&host, result.is_ok());
        let parsed = result?;

        let sequence = sequence_number(date);
        if let Some(number) = parsed.puzzle_number.filter(|n| *n != sequence) {
            tracing::debug!(
                %date,
                reported = number,
                computed = sequence,
                "Endpoint puzzle number differs from computed sequence"
            );
        }

        Ok(AnswerRecord {
            word: parsed.word,
            sequence_number: sequence,
            date,
            source: host,
            is_authoritative: true,
        })
    }

    async fn request(&self, url: &str) -> Result<serde_json::Value, ResolveError> {
        let response = self
            .client
            .get(url)
            .timeout(self.config.request_timeout())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::ServerError(status.as_u16()));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ResolveError::Timeout
                } else {
                    ResolveError::Decode(e.to_string())
                }
            })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ResolveError {
    if e.is_timeout() {
        ResolveError::Timeout
    } else {
        ResolveError::Http(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ManualClock;
    use chrono::TimeZone;

    fn offline_config() -> ResolverConfig {
        ResolverConfig {
            endpoints: Vec::new(),
            ..ResolverConfig::default()
        }
    }

    fn clock_at(h: u32, m: u32) -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap(),
        ))
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(ResolverConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ResolverConfig::default();
        config.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = ResolverConfig::default();
        config.fallback_ttl_secs = config.cache_ttl_secs + 1;
        assert!(config.validate().is_err());

        let mut config = ResolverConfig::default();
        config.endpoints = vec!["not a url/{date}".to_string()];
        assert!(config.validate().is_err());

        let mut config = ResolverConfig::default();
        config.utc_offset_minutes = 24 * 60;
        assert!(config.validate().is_err());

        let mut config = ResolverConfig::default();
        config.request_timeout_ms = config.overall_timeout_ms;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("request_timeout_ms"));
    }

    #[test]
    fn test_out_of_range_offset_rejected_by_new() {
        let config = ResolverConfig {
            utc_offset_minutes: 24 * 60,
            ..ResolverConfig::default()
        };
        let err = AnswerResolver::new(config, clock_at(12, 0)).err().unwrap();
        assert!(matches!(err, ResolveError::InvalidOffset(1440)));
    }

    #[test]
    fn test_cache_key_format() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(cache_key(date), "answer:2024-01-05");
    }

    #[test]
    fn test_local_date_with_offset() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 23, 30, 0).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        let seoul = FixedOffset::east_opt(9 * 3600).unwrap();

        assert_eq!(local_date(now, utc), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(local_date(now, seoul), NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
    }

    #[tokio::test]
    async fn test_offline_resolution_falls_back() {
        let resolver = AnswerResolver::new(offline_config(), clock_at(12, 0)).unwrap();
        let record = resolver.resolve_today().await;

        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert!(!record.is_authoritative);
        assert_eq!(record, fallback_record(today));
        assert_eq!(resolver.pinned_day(), Some(today));
        assert_eq!(resolver.status().fallbacks, 1);
    }

    #[tokio::test]
    async fn test_fallback_cached_with_short_ttl() {
        let clock = clock_at(12, 0);
        let mut config = offline_config();
        config.fallback_ttl_secs = 60;
        let resolver = AnswerResolver::new(config, clock.clone()).unwrap();

        resolver.resolve_today().await;
        resolver.resolve_today().await;
        assert_eq!(resolver.status().live_resolutions, 1);

        clock.advance(chrono::Duration::seconds(61));
        resolver.resolve_today().await;
        assert_eq!(resolver.status().live_resolutions, 2);
    }

    #[tokio::test]
    async fn test_rollover_serves_pinned_day() {
        let clock = clock_at(23, 59);
        let resolver = AnswerResolver::new(offline_config(), clock.clone()).unwrap();
        let day_one = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

        let mut crane = fallback_record(day_one);
        crane.word = "CRANE".to_string();
        crane.is_authoritative = true;
        resolver.cache().set(cache_key(day_one), crane.clone());
        *resolver.pinned_day.lock().unwrap() = Some(day_one);

        clock.advance(chrono::Duration::minutes(2));
        assert_eq!(resolver.resolve_today().await.word, "CRANE");
        assert_eq!(resolver.status().live_resolutions, 0);

        // Once today's entry exists it takes over
        let day_two = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
        let mut slate = fallback_record(day_two);
        slate.word = "SLATE".to_string();
        resolver.cache().set(cache_key(day_two), slate);
        assert_eq!(resolver.resolve_today().await.word, "SLATE");
    }

    #[tokio::test]
    async fn test_force_refresh_drops_pinned_day() {
        let clock = clock_at(23, 59);
        let resolver = AnswerResolver::new(offline_config(), clock.clone()).unwrap();
        resolver.resolve_today().await;

        clock.advance(chrono::Duration::minutes(2));
        let record = resolver.force_refresh().await;

        let day_two = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
        assert_eq!(record.date, day_two);
        assert_eq!(resolver.pinned_day(), Some(day_two));
        assert!(resolver.cache().get(&cache_key(day_two - chrono::Duration::days(1))).is_none());
    }

    #[tokio::test]
    async fn test_no_endpoints_error() {
        let resolver = AnswerResolver::new(offline_config(), clock_at(12, 0)).unwrap();
        let date = resolver.today();
        assert!(matches!(
            resolver.fetch_rotating(date).await,
            Err(ResolveError::NoEndpoints)
        ));
    }
}
