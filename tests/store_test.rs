//! Integration tests for ContentStore
//!
//! Covers mirroring, durable snapshot failure tolerance and the retention
//! invariant under arbitrary insert sequences.

mod common;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wordday::content::{ContentProducer, DateContext, TemplateProducer};
use wordday::models::ContentItem;
use wordday::resolver::fallback_record;
use wordday::storage::{ContentStore, SnapshotMirror, StoreConfig, StoreSnapshot};
use wordday::utils::Clock;

use common::{clock_at, create_store, store_config};

fn item(word: &str, category: &str, published: DateTime<Utc>) -> ContentItem {
    ContentItem::new(
        word,
        category,
        format!("{word} {category}"),
        "excerpt",
        "body",
        published,
    )
}

/// Mirror that remembers how many items each snapshot carried
#[derive(Default)]
struct RecordingMirror {
    seen: Mutex<Vec<usize>>,
}

#[async_trait]
impl SnapshotMirror for RecordingMirror {
    async fn mirror(&self, snapshot: &StoreSnapshot) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(snapshot.items.len());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Mirror that always fails
struct BrokenMirror;

#[async_trait]
impl SnapshotMirror for BrokenMirror {
    async fn mirror(&self, _snapshot: &StoreSnapshot) -> anyhow::Result<()> {
        anyhow::bail!("connection refused")
    }

    fn name(&self) -> &str {
        "broken"
    }
}

#[tokio::test]
async fn test_mirror_receives_every_write() {
    let clock = clock_at(0, 0);
    let dir = TempDir::new().unwrap();
    let mirror = Arc::new(RecordingMirror::default());
    let store = ContentStore::new(store_config(&dir, 10), clock.clone())
        .with_mirror(Some(mirror.clone() as Arc<dyn SnapshotMirror>));
    store.initialize().await;

    let now = clock.now();
    store.upsert_many("crane", vec![item("crane", "hints", now)]).await;
    store.upsert_many("slate", vec![item("slate", "hints", now)]).await;
    let id = store.get_by_key("crane").await[0].id.clone();
    store.increment_view(&id).await;
    store.clear_all().await;

    assert_eq!(*mirror.seen.lock().unwrap(), vec![1, 2, 2, 0]);
}

#[tokio::test]
async fn test_mirror_failure_is_not_fatal() {
    let clock = clock_at(0, 0);
    let dir = TempDir::new().unwrap();
    let store = ContentStore::new(store_config(&dir, 10), clock.clone())
        .with_mirror(Some(Arc::new(BrokenMirror) as Arc<dyn SnapshotMirror>));
    store.initialize().await;

    let stored = store
        .upsert_many("crane", vec![item("crane", "hints", clock.now())])
        .await;

    assert_eq!(stored, 1);
    assert_eq!(store.get_by_key("crane").await.len(), 1);
    assert!(dir.path().join("content-store.json").exists());
}

#[tokio::test]
async fn test_snapshot_write_failure_keeps_memory() {
    let clock = clock_at(0, 0);
    let dir = TempDir::new().unwrap();

    // Parent of the snapshot path is a regular file, so writes fail
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let config = StoreConfig {
        snapshot_path: blocker.join("store.json"),
        ..StoreConfig::default()
    };

    let store = ContentStore::new(config, clock.clone());
    store.initialize().await;
    store
        .upsert_many("crane", vec![item("crane", "hints", clock.now())])
        .await;

    assert_eq!(store.get_by_key("crane").await.len(), 1);
    assert_eq!(store.get_stats().await.total_articles, 1);
}

#[tokio::test]
async fn test_generated_articles_are_queryable() {
    let clock = clock_at(0, 0);
    let (store, _dir) = create_store(clock.clone(), 10).await;

    let answer = fallback_record(clock.now().date_naive());
    let producer = TemplateProducer::new().unwrap();
    let items = producer.produce(&answer, &DateContext::for_answer(&answer, clock.now()));
    store.upsert_many(&answer.key(), items).await;

    assert_eq!(store.get_by_key(&answer.word).await.len(), 3);
    assert_eq!(store.get_by_tag("puzzle-940").await.len(), 3);
    assert_eq!(store.get_by_category("hints").await.len(), 1);
    assert_eq!(store.search("puzzle #940").await.len(), 3);
    assert_eq!(store.keys().await, vec![answer.key()]);

    let top = store.get_top_rated(1).await;
    assert_eq!(top[0].quality_score, 50);
}

#[tokio::test]
async fn test_regeneration_replaces_in_place() {
    let clock = clock_at(0, 0);
    let (store, _dir) = create_store(clock.clone(), 10).await;
    let producer = TemplateProducer::new().unwrap();
    let answer = fallback_record(clock.now().date_naive());

    let first = producer.produce(&answer, &DateContext::for_answer(&answer, clock.now()));
    store.upsert_many(&answer.key(), first).await;
    let id = store.get_by_category("answer").await[0].id.clone();
    store.increment_like(&id).await;

    clock.advance(Duration::hours(1));
    let second = producer.produce(&answer, &DateContext::for_answer(&answer, clock.now()));
    store.upsert_many(&answer.key(), second).await;

    let stats = store.get_stats().await;
    assert_eq!(stats.total_articles, 3);
    assert_eq!(stats.total_likes, 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Retained count per key never exceeds the cap and keeps the newest items
    #[test]
    fn prop_retention_cap(cap in 1usize..6, inserts in prop::collection::vec(0usize..12, 1..20)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let clock = clock_at(0, 0);
            let (store, _dir) = create_store(clock.clone(), cap).await;

            let mut published = Vec::new();
            for (n, category) in inserts.iter().enumerate() {
                let at = clock.now() + Duration::minutes(n as i64);
                let category = format!("cat{category}");
                store.upsert_many("crane", vec![item("crane", &category, at)]).await;
                published.push(category);
            }

            let retained = store.get_by_key("crane").await;
            let distinct: std::collections::BTreeSet<&String> = published.iter().collect();
            prop_assert_eq!(retained.len(), distinct.len().min(cap));

            // Retained items are sorted oldest first
            for pair in retained.windows(2) {
                prop_assert!(pair[0].published_at <= pair[1].published_at);
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}
