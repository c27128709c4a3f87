//! End-to-end routing against a SQLite record store

use async_trait::async_trait;
use fbr_common::db::init_database;
use fbr_common::records::SKIPPED_NO_TRANSCRIPT;
use fbr_common::{RecordStore, SqliteRecordStore};
use fbr_router::{ChangeDispatcher, DispatchTiming, RoutingTable, Topic, TopicClassifier};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Picks a topic from keywords in the transcript
struct KeywordClassifier;

#[async_trait]
impl TopicClassifier for KeywordClassifier {
    async fn classify(&self, transcript: &str) -> Topic {
        let text = transcript.to_lowercase();
        if text.contains("pricing") || text.contains("invoice") {
            Topic::PricingBilling
        } else if text.contains("slow") {
            Topic::PerformanceIssue
        } else if text.contains("button") {
            Topic::UiUxExperience
        } else {
            Topic::Uncategorized
        }
    }
}

async fn setup() -> (TempDir, SqliteRecordStore) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("feedback.db")).await.unwrap();
    (dir, SqliteRecordStore::new(pool, Duration::from_millis(20)))
}

async fn insert(store: &SqliteRecordStore, id: &str, transcript: &str) {
    store
        .insert(
            id,
            &json!({
                "contact_name": "Sam Okafor",
                "last_feedback_summary": transcript,
                "assigned_interviewer_agent": "N/A",
            }),
        )
        .await
        .unwrap();
}

async fn assignment(store: &SqliteRecordStore, id: &str) -> String {
    store
        .get(id)
        .await
        .unwrap()
        .unwrap()
        .assignment()
        .unwrap()
        .to_string()
}

/// Poll until no record is left unassigned
async fn wait_until_assigned(store: &SqliteRecordStore, ids: &[&str]) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let mut pending = 0;
        for id in ids {
            if store.get(id).await.unwrap().unwrap().is_unassigned() {
                pending += 1;
            }
        }
        if pending == 0 {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "{} records still unassigned",
            pending
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_existing_and_new_records_are_routed() {
    let (_dir, store) = setup().await;
    insert(&store, "r1", "The pricing page is confusing").await;
    insert(&store, "r2", "").await;

    let cancel = CancellationToken::new();
    let batches = store.subscribe_unassigned(cancel.clone()).await.unwrap();
    let dispatcher = ChangeDispatcher::new(
        Arc::new(KeywordClassifier),
        Arc::new(store.clone()),
        Arc::new(RoutingTable::default()),
        DispatchTiming {
            inter_record_delay: Duration::ZERO,
            uncategorized_pause: Duration::ZERO,
        },
    );
    let task = tokio::spawn(dispatcher.run(batches, cancel.clone()));

    // Arrives after the subscription's initial snapshot
    insert(&store, "r3", "Search is slow on large projects").await;
    insert(&store, "r4", "Just saying hello").await;

    wait_until_assigned(&store, &["r1", "r2", "r3", "r4"]).await;

    assert_eq!(assignment(&store, "r1").await, "Sales & Billing Team");
    assert_eq!(assignment(&store, "r2").await, SKIPPED_NO_TRANSCRIPT);
    assert_eq!(assignment(&store, "r3").await, "Product & Features Team");
    assert_eq!(assignment(&store, "r4").await, "General Queue");

    cancel.cancel();
    let stats = task.await.unwrap();
    assert_eq!(stats.routed, 3);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.update_failures, 0);
}

#[tokio::test]
async fn test_assigned_records_are_left_alone() {
    let (_dir, store) = setup().await;
    store
        .insert(
            "done",
            &json!({
                "last_feedback_summary": "The button is hidden",
                "assigned_interviewer_agent": "UX Research Team",
            }),
        )
        .await
        .unwrap();
    insert(&store, "fresh", "The button is hidden").await;

    let cancel = CancellationToken::new();
    let batches = store.subscribe_unassigned(cancel.clone()).await.unwrap();
    let dispatcher = ChangeDispatcher::new(
        Arc::new(KeywordClassifier),
        Arc::new(store.clone()),
        Arc::new(RoutingTable::default()),
        DispatchTiming {
            inter_record_delay: Duration::ZERO,
            uncategorized_pause: Duration::ZERO,
        },
    );
    let task = tokio::spawn(dispatcher.run(batches, cancel.clone()));

    wait_until_assigned(&store, &["fresh"]).await;
    // Give the poller a few cycles to observe the write
    tokio::time::sleep(Duration::from_millis(100)).await;

    cancel.cancel();
    let stats = task.await.unwrap();
    assert_eq!(stats.routed, 1);
    assert_eq!(assignment(&store, "done").await, "UX Research Team");
    assert_eq!(assignment(&store, "fresh").await, "UX Research Team");
}
