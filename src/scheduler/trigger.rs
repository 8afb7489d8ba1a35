//! Scheduler configuration and wall-clock trigger math
//!
//! The daily job fires at `daily_time` in the resolver's local offset. The
//! next target is recomputed after every firing, so drift never accumulates.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{SchedulerError, SchedulerResult};

/// Upper bound for any interval (one week)
const MAX_INTERVAL_HOURS: u64 = 24 * 7;

// ============================================================================
// Scheduler Configuration
// ============================================================================

/// Configuration for the four background jobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Time of the daily generation (24h format, e.g., "00:00")
    pub daily_time: String,

    /// Hours between cache cleanups
    pub cleanup_interval_hours: u64,

    /// Hours between resolver refreshes
    pub refresh_interval_hours: u64,

    /// Minutes between health checks
    pub health_interval_minutes: u64,

    pub enable_daily_generation: bool,
    pub enable_cache_cleanup: bool,
    pub enable_resolver_refresh: bool,
    pub enable_health_check: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            daily_time: "00:00".to_string(),
            cleanup_interval_hours: 6,
            refresh_interval_hours: 1,
            health_interval_minutes: 5,
            enable_daily_generation: true,
            enable_cache_cleanup: true,
            enable_resolver_refresh: true,
            enable_health_check: true,
        }
    }
}

impl SchedulerConfig {
    /// Create a new config builder
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::default()
    }

    /// Load scheduler settings from `WORDDAY_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let flag = |name: &str, default: bool| {
            std::env::var(name)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        };
        let number = |name: &str, default: u64| {
            std::env::var(name)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        };

        Self {
            daily_time: std::env::var("WORDDAY_DAILY_TIME").unwrap_or(defaults.daily_time),
            cleanup_interval_hours: number(
                "WORDDAY_CLEANUP_INTERVAL_HOURS",
                defaults.cleanup_interval_hours,
            ),
            refresh_interval_hours: number(
                "WORDDAY_REFRESH_INTERVAL_HOURS",
                defaults.refresh_interval_hours,
            ),
            health_interval_minutes: number(
                "WORDDAY_HEALTH_INTERVAL_MINUTES",
                defaults.health_interval_minutes,
            ),
            enable_daily_generation: flag("WORDDAY_ENABLE_DAILY", defaults.enable_daily_generation),
            enable_cache_cleanup: flag("WORDDAY_ENABLE_CLEANUP", defaults.enable_cache_cleanup),
            enable_resolver_refresh: flag(
                "WORDDAY_ENABLE_REFRESH",
                defaults.enable_resolver_refresh,
            ),
            enable_health_check: flag("WORDDAY_ENABLE_HEALTH", defaults.enable_health_check),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> SchedulerResult<()> {
        self.parse_daily_time()?;

        check_interval("cleanup_interval_hours", self.cleanup_interval_hours, MAX_INTERVAL_HOURS)?;
        check_interval("refresh_interval_hours", self.refresh_interval_hours, MAX_INTERVAL_HOURS)?;
        check_interval(
            "health_interval_minutes",
            self.health_interval_minutes,
            MAX_INTERVAL_HOURS * 60,
        )?;

        Ok(())
    }

    /// Parse the daily time
    pub fn parse_daily_time(&self) -> SchedulerResult<NaiveTime> {
        NaiveTime::parse_from_str(self.daily_time.trim(), "%H:%M")
            .map_err(|_| SchedulerError::invalid_daily_time(&self.daily_time))
    }

    pub fn cleanup_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cleanup_interval_hours * 3600)
    }

    pub fn refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.refresh_interval_hours * 3600)
    }

    pub fn health_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.health_interval_minutes * 60)
    }
}

fn check_interval(field: &str, value: u64, max: u64) -> SchedulerResult<()> {
    if value == 0 {
        return Err(SchedulerError::invalid_interval(field, "must be greater than 0"));
    }
    if value > max {
        return Err(SchedulerError::invalid_interval(
            field,
            format!("must be at most {max}"),
        ));
    }
    Ok(())
}

/// Builder for SchedulerConfig
#[derive(Debug, Default)]
pub struct SchedulerConfigBuilder {
    daily_time: Option<String>,
    cleanup_interval_hours: Option<u64>,
    refresh_interval_hours: Option<u64>,
    health_interval_minutes: Option<u64>,
    enable_daily_generation: Option<bool>,
    enable_cache_cleanup: Option<bool>,
    enable_resolver_refresh: Option<bool>,
    enable_health_check: Option<bool>,
}

impl SchedulerConfigBuilder {
    /// Set daily generation time
    pub fn daily_time(mut self, time: impl Into<String>) -> Self {
        self.daily_time = Some(time.into());
        self
    }

    /// Set cleanup interval
    pub fn cleanup_interval_hours(mut self, hours: u64) -> Self {
        self.cleanup_interval_hours = Some(hours);
        self
    }

    /// Set refresh interval
    pub fn refresh_interval_hours(mut self, hours: u64) -> Self {
        self.refresh_interval_hours = Some(hours);
        self
    }

    /// Set health check interval
    pub fn health_interval_minutes(mut self, minutes: u64) -> Self {
        self.health_interval_minutes = Some(minutes);
        self
    }

    pub fn enable_daily_generation(mut self, value: bool) -> Self {
        self.enable_daily_generation = Some(value);
        self
    }

    pub fn enable_cache_cleanup(mut self, value: bool) -> Self {
        self.enable_cache_cleanup = Some(value);
        self
    }

    pub fn enable_resolver_refresh(mut self, value: bool) -> Self {
        self.enable_resolver_refresh = Some(value);
        self
    }

    pub fn enable_health_check(mut self, value: bool) -> Self {
        self.enable_health_check = Some(value);
        self
    }

    /// Build the config
    pub fn build(self) -> SchedulerResult<SchedulerConfig> {
        let defaults = SchedulerConfig::default();
        let config = SchedulerConfig {
            daily_time: self.daily_time.unwrap_or(defaults.daily_time),
            cleanup_interval_hours: self
                .cleanup_interval_hours
                .unwrap_or(defaults.cleanup_interval_hours),
            refresh_interval_hours: self
                .refresh_interval_hours
                .unwrap_or(defaults.refresh_interval_hours),
            health_interval_minutes: self
                .health_interval_minutes
                .unwrap_or(defaults.health_interval_minutes),
            enable_daily_generation: self
                .enable_daily_generation
                .unwrap_or(defaults.enable_daily_generation),
            enable_cache_cleanup: self
                .enable_cache_cleanup
                .unwrap_or(defaults.enable_cache_cleanup),
            enable_resolver_refresh: self
                .enable_resolver_refresh
                .unwrap_or(defaults.enable_resolver_refresh),
            enable_health_check: self
                .enable_health_check
                .unwrap_or(defaults.enable_health_check),
        };
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Trigger Math
// ============================================================================

/// Next occurrence of `time` in `offset` strictly after `now`
///
/// If today's occurrence is still ahead it is returned; at or past it, the
/// same time tomorrow.
pub fn next_daily_run(now: DateTime<Utc>, time: NaiveTime, offset: FixedOffset) -> DateTime<Utc> {
    let local_today = now.with_timezone(&offset).date_naive();
    let to_utc = |local: chrono::NaiveDateTime| {
        (local - Duration::seconds(i64::from(offset.local_minus_utc()))).and_utc()
    };

    let today_target = to_utc(local_today.and_time(time));
    if today_target > now {
        today_target
    } else {
        to_utc((local_today + Duration::days(1)).and_time(time))
    }
}

/// Sleep duration until `target` (zero when already past)
pub fn duration_until(now: DateTime<Utc>, target: DateTime<Utc>) -> std::time::Duration {
    (target - now).to_std().unwrap_or(std::time::Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn midnight() -> NaiveTime {
        NaiveTime::from_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(SchedulerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = SchedulerConfig::builder()
            .daily_time("06:30")
            .cleanup_interval_hours(12)
            .enable_health_check(false)
            .build()
            .unwrap();

        assert_eq!(config.daily_time, "06:30");
        assert_eq!(config.cleanup_interval_hours, 12);
        assert!(!config.enable_health_check);
        assert!(config.enable_daily_generation);
    }

    #[test]
    fn test_invalid_daily_time() {
        for bad in ["25:00", "noon", "", "12:60"] {
            let result = SchedulerConfig::builder().daily_time(bad).build();
            assert!(
                matches!(result, Err(SchedulerError::InvalidDailyTime { .. })),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_invalid_intervals() {
        assert!(matches!(
            SchedulerConfig::builder().cleanup_interval_hours(0).build(),
            Err(SchedulerError::InvalidInterval { .. })
        ));
        assert!(SchedulerConfig::builder()
            .refresh_interval_hours(MAX_INTERVAL_HOURS + 1)
            .build()
            .is_err());
        assert!(SchedulerConfig::builder().health_interval_minutes(0).build().is_err());
    }

    #[test]
    fn test_next_daily_run_later_today() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let time = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
        assert_eq!(
            next_daily_run(now, time, utc()),
            Utc.with_ymd_and_hms(2024, 1, 15, 18, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_daily_run_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        assert_eq!(
            next_daily_run(now, midnight(), utc()),
            Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_daily_run_at_exact_time_is_tomorrow() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        assert_eq!(
            next_daily_run(now, midnight(), utc()),
            Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_daily_run_with_offset() {
        // 14:30 UTC is 23:30 in UTC+9; local midnight is 15:00 UTC
        let seoul = FixedOffset::east_opt(9 * 3600).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap();
        assert_eq!(
            next_daily_run(now, midnight(), seoul),
            Utc.with_ymd_and_hms(2024, 1, 15, 15, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_duration_until_never_negative() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let past = now - Duration::minutes(5);
        assert_eq!(duration_until(now, past), std::time::Duration::ZERO);
        assert_eq!(
            duration_until(now, now + Duration::seconds(90)),
            std::time::Duration::from_secs(90)
        );
    }
}
