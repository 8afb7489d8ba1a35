//! Content store for generated articles
//!
//! Items are indexed two ways:
//! - globally by id (every item ever stored, until `clear_all`)
//! - per answer key, capped at `max_items_per_key` and ordered oldest first
//!
//! When a key overflows, the oldest item by `published_at` leaves the per-key
//! index but stays reachable through the global queries. Every mutation is
//! written through to the JSON snapshot before returning; durable failures
//! are logged and never returned to the caller. Mirror pushes are made in
//! the same order as the writes that produced them.

pub mod snapshot;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::metrics;
use crate::models::ContentItem;
use crate::utils::error::StoreError;
use crate::utils::{normalize_key, Clock};

pub use snapshot::{SnapshotMirror, StoreSnapshot, SNAPSHOT_VERSION};

/// Content store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the JSON snapshot
    pub snapshot_path: PathBuf,

    /// Retained items per answer key
    pub max_items_per_key: usize,

    /// Snapshots older than this are discarded on load
    pub snapshot_expiry_hours: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("data/content-store.json"),
            max_items_per_key: 10,
            snapshot_expiry_hours: 168,
        }
    }
}

impl StoreConfig {
    /// Load store settings from `WORDDAY_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            snapshot_path: std::env::var("WORDDAY_SNAPSHOT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.snapshot_path),
            max_items_per_key: std::env::var("WORDDAY_MAX_ITEMS_PER_KEY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_items_per_key),
            snapshot_expiry_hours: std::env::var("WORDDAY_SNAPSHOT_EXPIRY_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.snapshot_expiry_hours),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_items_per_key == 0 {
            anyhow::bail!("max_items_per_key must be greater than 0");
        }
        if self.snapshot_expiry_hours == 0 {
            anyhow::bail!("snapshot_expiry_hours must be greater than 0");
        }
        if self.snapshot_path.as_os_str().is_empty() {
            anyhow::bail!("snapshot_path must not be empty");
        }
        Ok(())
    }

    pub fn snapshot_expiry(&self) -> chrono::Duration {
        i64::try_from(self.snapshot_expiry_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
            .unwrap_or(chrono::Duration::MAX)
    }
}

/// Aggregate counts computed on demand
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_articles: usize,
    pub distinct_keys: usize,
    pub retained_articles: usize,
    pub per_category: BTreeMap<String, usize>,
    pub total_views: u64,
    pub total_likes: u64,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct StoreState {
    items: HashMap<String, ContentItem>,
    /// Retained ids per key, oldest first
    retained: HashMap<String, Vec<String>>,
    last_updated: Option<DateTime<Utc>>,
    initialized: bool,
}

impl StoreState {
    fn snapshot(&self, now: DateTime<Utc>) -> StoreSnapshot {
        let mut items: Vec<ContentItem> = self.items.values().cloned().collect();
        items.sort_by(|a, b| a.published_at.cmp(&b.published_at).then_with(|| a.id.cmp(&b.id)));

        StoreSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: now,
            items,
            retained: self
                .retained
                .iter()
                .map(|(k, ids)| (k.clone(), ids.clone()))
                .collect(),
        }
    }

    fn from_snapshot(snapshot: StoreSnapshot, max_per_key: usize) -> Self {
        let items: HashMap<String, ContentItem> = snapshot
            .items
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();

        let mut retained: HashMap<String, Vec<String>> = snapshot
            .retained
            .into_iter()
            .map(|(key, ids)| {
                let ids = ids.into_iter().filter(|id| items.contains_key(id)).collect();
                (key, ids)
            })
            .collect();

        // Snapshots without a retained index get one rebuilt from item keys
        if retained.is_empty() {
            for item in items.values() {
                retained
                    .entry(item.key.clone())
                    .or_default()
                    .push(item.id.clone());
            }
        }

        let mut state = Self {
            items,
            retained,
            last_updated: Some(snapshot.saved_at),
            initialized: true,
        };
        let keys: Vec<String> = state.retained.keys().cloned().collect();
        for key in keys {
            state.apply_retention(&key, max_per_key);
        }
        state
    }

    /// Order a key's ids oldest first and drop the overflow
    fn apply_retention(&mut self, key: &str, max_per_key: usize) -> Vec<String> {
        let Some(ids) = self.retained.get_mut(key) else {
            return Vec::new();
        };

        let items = &self.items;
        ids.sort_by(|a, b| {
            let pa = items.get(a).map(|i| i.published_at);
            let pb = items.get(b).map(|i| i.published_at);
            pa.cmp(&pb).then_with(|| a.cmp(b))
        });

        let overflow = ids.len().saturating_sub(max_per_key);
        ids.drain(..overflow).collect()
    }

    fn sorted_items<F>(&self, mut filter: F) -> Vec<ContentItem>
    where
        F: FnMut(&ContentItem) -> bool,
    {
        let mut items: Vec<ContentItem> =
            self.items.values().filter(|i| filter(i)).cloned().collect();
        items.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        items
    }

    fn retained_count(&self) -> usize {
        self.retained.values().map(Vec::len).sum()
    }
}

/// Retention-capped, write-through article store
pub struct ContentStore {
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    state: RwLock<StoreState>,
    mirror: Option<Arc<dyn SnapshotMirror>>,
    /// Taken under the state write lock, held across the mirror push
    mirror_order: Mutex<()>,
}

impl ContentStore {
    /// Create an empty, uninitialized store
    pub fn new(config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            state: RwLock::new(StoreState::default()),
            mirror: None,
            mirror_order: Mutex::new(()),
        }
    }

    /// Attach a secondary mirror
    pub fn with_mirror(mut self, mirror: Option<Arc<dyn SnapshotMirror>>) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Load the snapshot; missing, corrupt or stale snapshots start empty
    pub async fn initialize(&self) {
        let path = &self.config.snapshot_path;
        let now = self.clock.now();

        let loaded = match snapshot::load_snapshot(path) {
            Ok(Some(snapshot)) if snapshot.age(now) > self.config.snapshot_expiry() => {
                tracing::warn!(
                    path = %path.display(),
                    saved_at = %snapshot.saved_at,
                    expiry_hours = self.config.snapshot_expiry_hours,
                    "Snapshot is stale, starting empty"
                );
                None
            }
            Ok(Some(snapshot)) => Some(snapshot),
            Ok(None) => {
                tracing::info!(path = %path.display(), "No snapshot found, starting empty");
                None
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load snapshot, starting empty"
                );
                None
            }
        };

        let mut state = self.state.write().await;
        *state = match loaded {
            Some(snapshot) => StoreState::from_snapshot(snapshot, self.config.max_items_per_key),
            None => StoreState::default(),
        };
        state.initialized = true;

        tracing::info!(
            articles = state.items.len(),
            keys = state.retained.len(),
            "Content store initialized"
        );
        metrics::update_store_size(state.items.len(), state.retained.len());
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.read().await.initialized
    }

    /// Insert or replace items for a key, apply retention, persist
    ///
    /// Replacing an existing id keeps its view and like counts and its
    /// original `published_at`.
    pub async fn upsert_many(&self, key: &str, items: Vec<ContentItem>) -> usize {
        let key = normalize_key(key);
        let now = self.clock.now();
        let count = items.len();

        let (snapshot, order) = {
            let mut state = self.state.write().await;

            for mut item in items {
                if let Some(existing) = state.items.get(&item.id) {
                    item.view_count = existing.view_count;
                    item.like_count = existing.like_count;
                    item.published_at = existing.published_at;
                }
                item.updated_at = now;

                let ids = state.retained.entry(key.clone()).or_default();
                if !ids.contains(&item.id) {
                    ids.push(item.id.clone());
                }
                state.items.insert(item.id.clone(), item);
            }

            let evicted = state.apply_retention(&key, self.config.max_items_per_key);
            if !evicted.is_empty() {
                tracing::debug!(key = %key, evicted = evicted.len(), "Retention cap applied");
            }

            state.last_updated = Some(now);
            metrics::update_store_size(state.items.len(), state.retained.len());
            let snapshot = self.persist(&state, now);
            (snapshot, self.mirror_order.lock().await)
        };

        self.mirror_snapshot(snapshot, order).await;
        tracing::info!(key = %key, count, "Stored content items");
        count
    }

    /// Retained items for a key, oldest first
    pub async fn get_by_key(&self, key: &str) -> Vec<ContentItem> {
        let key = normalize_key(key);
        let state = self.state.read().await;
        state
            .retained
            .get(&key)
            .map(|ids| ids.iter().filter_map(|id| state.items.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    pub async fn get_by_id(&self, id: &str) -> Option<ContentItem> {
        self.state.read().await.items.get(id).cloned()
    }

    /// Items in a category, newest first
    pub async fn get_by_category(&self, category: &str) -> Vec<ContentItem> {
        let state = self.state.read().await;
        state.sorted_items(|item| item.category.eq_ignore_ascii_case(category))
    }

    /// Items carrying a tag, newest first
    pub async fn get_by_tag(&self, tag: &str) -> Vec<ContentItem> {
        let tag = tag.trim().to_lowercase();
        let state = self.state.read().await;
        state.sorted_items(|item| item.tags.contains(&tag))
    }

    /// Case-insensitive substring search over title, excerpt and tags
    pub async fn search(&self, query: &str) -> Vec<ContentItem> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let state = self.state.read().await;
        state.sorted_items(|item| item.matches(&needle))
    }

    /// Items published within `[start, end]`, newest first
    pub async fn get_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<ContentItem> {
        let state = self.state.read().await;
        state.sorted_items(|item| item.published_at >= start && item.published_at <= end)
    }

    pub async fn get_recent(&self, limit: usize) -> Vec<ContentItem> {
        let state = self.state.read().await;
        let mut items = state.sorted_items(|_| true);
        items.truncate(limit);
        items
    }

    /// Most viewed first
    pub async fn get_popular(&self, limit: usize) -> Vec<ContentItem> {
        let state = self.state.read().await;
        let mut items = state.sorted_items(|_| true);
        items.sort_by(|a, b| b.view_count.cmp(&a.view_count));
        items.truncate(limit);
        items
    }

    /// Highest quality score first
    pub async fn get_top_rated(&self, limit: usize) -> Vec<ContentItem> {
        let state = self.state.read().await;
        let mut items = state.sorted_items(|_| true);
        items.sort_by(|a, b| b.quality_score.cmp(&a.quality_score));
        items.truncate(limit);
        items
    }

    /// Keys with retained items, sorted
    pub async fn keys(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut keys: Vec<String> = state
            .retained
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub async fn increment_view(&self, id: &str) -> bool {
        self.bump(id, |item| item.view_count += 1).await
    }

    pub async fn increment_like(&self, id: &str) -> bool {
        self.bump(id, |item| item.like_count += 1).await
    }

    async fn bump<F>(&self, id: &str, update: F) -> bool
    where
        F: FnOnce(&mut ContentItem),
    {
        let now = self.clock.now();
        let (snapshot, order) = {
            let mut state = self.state.write().await;
            let Some(item) = state.items.get_mut(id) else {
                return false;
            };
            update(item);
            item.updated_at = now;
            state.last_updated = Some(now);
            let snapshot = self.persist(&state, now);
            (snapshot, self.mirror_order.lock().await)
        };

        self.mirror_snapshot(snapshot, order).await;
        true
    }

    pub async fn get_stats(&self) -> StoreStats {
        let state = self.state.read().await;

        let mut per_category = BTreeMap::new();
        let mut total_views = 0;
        let mut total_likes = 0;
        for item in state.items.values() {
            *per_category.entry(item.category.clone()).or_insert(0) += 1;
            total_views += item.view_count;
            total_likes += item.like_count;
        }

        StoreStats {
            total_articles: state.items.len(),
            distinct_keys: state.retained.values().filter(|ids| !ids.is_empty()).count(),
            retained_articles: state.retained_count(),
            per_category,
            total_views,
            total_likes,
            last_updated: state.last_updated,
        }
    }

    /// Current contents in snapshot form
    pub async fn snapshot(&self) -> StoreSnapshot {
        self.state.read().await.snapshot(self.clock.now())
    }

    /// Empty memory and delete the durable snapshot
    pub async fn clear_all(&self) {
        let now = self.clock.now();
        let order = {
            let mut state = self.state.write().await;
            state.items.clear();
            state.retained.clear();
            state.last_updated = None;
            metrics::update_store_size(0, 0);

            if let Err(e) = snapshot::remove_snapshot(&self.config.snapshot_path) {
                tracing::warn!(error = %e, "Failed to remove snapshot");
            }
            self.mirror_order.lock().await
        };

        self.mirror_snapshot(StoreSnapshot::empty(now), order).await;
        tracing::info!("Content store cleared");
    }

    /// Clear the store when its last update is older than the snapshot expiry
    pub async fn expire_if_stale(&self) -> bool {
        let now = self.clock.now();
        let stale = {
            let state = self.state.read().await;
            state
                .last_updated
                .is_some_and(|updated| now - updated > self.config.snapshot_expiry())
        };

        if stale {
            tracing::info!(
                expiry_hours = self.config.snapshot_expiry_hours,
                "Content store is stale, clearing"
            );
            self.clear_all().await;
        }
        stale
    }

    /// Write the snapshot, returning it for mirroring
    fn persist(&self, state: &StoreState, now: DateTime<Utc>) -> StoreSnapshot {
        let snapshot = state.snapshot(now);
        if let Err(e) = snapshot::save_snapshot(&self.config.snapshot_path, &snapshot) {
            tracing::warn!(error = %e, "Snapshot write failed, continuing in memory");
        }
        snapshot
    }

    async fn mirror_snapshot(&self, snapshot: StoreSnapshot, _order: MutexGuard<'_, ()>) {
        let Some(mirror) = &self.mirror else {
            return;
        };

        if let Err(e) = mirror.mirror(&snapshot).await {
            let err = StoreError::Mirror(format!("{e:#}"));
            tracing::warn!(mirror = mirror.name(), error = %err, "Snapshot mirror failed");
        }
    }
}
