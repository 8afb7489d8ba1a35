//! Redis mirror for the content store snapshot
//!
//! The content store writes its snapshot to disk first; this layer then copies
//! it into Redis so other processes (render workers, a warm standby) can read
//! the current article set without touching the file. Every failure here is
//! non-fatal for the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use wordday::cache::{CacheConfig, RedisMirror};
//!
//! let config = CacheConfig::from_env();
//! if let Some(mirror) = RedisMirror::try_new(&config).await {
//!     let latest = mirror.get_snapshot().await?;
//! }
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use deadpool_redis::{Config as PoolConfig, Pool, Runtime};
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::storage::snapshot::{SnapshotMirror, StoreSnapshot};

/// Redis mirror configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether to attempt a Redis connection at all
    pub enabled: bool,

    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,

    /// Connection pool size
    pub pool_size: usize,

    /// Snapshot TTL in seconds (default: 7 days)
    pub snapshot_ttl: u64,

    /// Key prefix for namespacing
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "redis://localhost:6379".to_string(),
            pool_size: 4,
            snapshot_ttl: 604_800, // 7 days
            key_prefix: "wordday".to_string(),
        }
    }
}

impl CacheConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: std::env::var("WORDDAY_REDIS_ENABLED")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(std::env::var("REDIS_URL").is_ok()),
            url: std::env::var("REDIS_URL").unwrap_or(defaults.url),
            pool_size: std::env::var("REDIS_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.pool_size),
            snapshot_ttl: std::env::var("WORDDAY_MIRROR_TTL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.snapshot_ttl),
            key_prefix: std::env::var("WORDDAY_CACHE_KEY_PREFIX").unwrap_or(defaults.key_prefix),
        }
    }
}

/// Redis-backed snapshot mirror
pub struct RedisMirror {
    /// Connection pool
    pool: Pool,
    /// Configuration
    config: CacheConfig,
}

impl RedisMirror {
    /// Connect and verify the server answers PING
    pub async fn new(config: &CacheConfig) -> Result<Self> {
        let pool_config = PoolConfig::from_url(&config.url);
        let pool = pool_config
            .builder()
            .map_err(|e| anyhow::anyhow!("Failed to create pool builder: {e}"))?
            .max_size(config.pool_size)
            .runtime(Runtime::Tokio1)
            .build()
            .context("Failed to create Redis connection pool")?;

        // Test connection
        let mut conn = pool.get().await.context("Failed to get Redis connection")?;

        let _: String = redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .context("Failed to ping Redis")?;

        tracing::info!(url = %config.url, "Connected to Redis mirror");

        Ok(Self {
            pool,
            config: config.clone(),
        })
    }

    /// Create a mirror, returning None if Redis is unavailable
    pub async fn try_new(config: &CacheConfig) -> Option<Self> {
        match Self::new(config).await {
            Ok(mirror) => Some(mirror),
            Err(e) => {
                tracing::warn!(error = %e, "Redis mirror unavailable, continuing without it");
                None
            }
        }
    }

    /// Key the snapshot is stored under
    pub fn snapshot_key(&self) -> String {
        snapshot_key(&self.config.key_prefix)
    }

    /// Read back the mirrored snapshot
    pub async fn get_snapshot(&self) -> Result<Option<StoreSnapshot>> {
        self.get(&self.snapshot_key()).await
    }

    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.pool.get().await.context("Failed to get connection")?;

        let value: Option<Vec<u8>> = conn.get(key).await.context("Failed to get from cache")?;

        match value {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let mut conn = self.pool.get().await.context("Failed to get connection")?;

        let bytes = encode(value)?;

        conn.set_ex::<_, _, ()>(key, bytes, ttl.as_secs())
            .await
            .context("Failed to set cache")?;

        Ok(())
    }

    /// Get config reference
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

#[async_trait]
impl SnapshotMirror for RedisMirror {
    async fn mirror(&self, snapshot: &StoreSnapshot) -> Result<()> {
        self.set(
            &self.snapshot_key(),
            snapshot,
            Duration::from_secs(self.config.snapshot_ttl),
        )
        .await
    }

    fn name(&self) -> &str {
        "redis"
    }
}

fn snapshot_key(prefix: &str) -> String {
    format!("{prefix}:store:snapshot")
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).context("Failed to serialize value")
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).context("Failed to deserialize value")
}

// ============================================================================
// Optional mirror wrapper for graceful degradation
// ============================================================================

/// Mirror handle that is simply absent when Redis is disabled or unreachable
pub struct OptionalMirror {
    inner: Option<RedisMirror>,
}

impl OptionalMirror {
    /// Wrap an optional mirror
    pub fn new(mirror: Option<RedisMirror>) -> Self {
        Self { inner: mirror }
    }

    /// Connect when enabled, otherwise stay empty
    pub async fn from_config(config: &CacheConfig) -> Self {
        if !config.enabled {
            tracing::debug!("Redis mirror disabled");
            return Self { inner: None };
        }
        Self {
            inner: RedisMirror::try_new(config).await,
        }
    }

    /// Check if the mirror is available
    pub fn is_available(&self) -> bool {
        self.inner.is_some()
    }

    /// Hand the mirror to the content store
    pub fn into_shared(self) -> Option<Arc<dyn SnapshotMirror>> {
        self.inner
            .map(|mirror| Arc::new(mirror) as Arc<dyn SnapshotMirror>)
    }
}
