//! Common test utilities

use chrono::{TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;
use wordday::resolver::ResolverConfig;
use wordday::storage::{ContentStore, StoreConfig};
use wordday::utils::ManualClock;

/// Clock pinned to 2024-01-15 (puzzle 940) at the given UTC time
pub fn clock_at(hour: u32, minute: u32) -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 15, hour, minute, 0).unwrap(),
    ))
}

/// Resolver config with no endpoints, so every live resolution falls back
#[allow(dead_code)]
pub fn offline_resolver_config() -> ResolverConfig {
    ResolverConfig {
        endpoints: Vec::new(),
        ..ResolverConfig::default()
    }
}

/// Resolver config pointing at the given endpoint templates with short timeouts
#[allow(dead_code)]
pub fn resolver_config(endpoints: Vec<String>) -> ResolverConfig {
    ResolverConfig {
        endpoints,
        request_timeout_ms: 500,
        overall_timeout_ms: 2_000,
        ..ResolverConfig::default()
    }
}

/// Store config writing its snapshot inside `dir`
#[allow(dead_code)]
pub fn store_config(dir: &TempDir, max_items_per_key: usize) -> StoreConfig {
    StoreConfig {
        snapshot_path: dir.path().join("content-store.json"),
        max_items_per_key,
        ..StoreConfig::default()
    }
}

/// Initialized store backed by a temp dir
#[allow(dead_code)]
pub async fn create_store(
    clock: Arc<ManualClock>,
    max_items_per_key: usize,
) -> (Arc<ContentStore>, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ContentStore::new(store_config(&dir, max_items_per_key), clock));
    store.initialize().await;
    (store, dir)
}
