//! SQLite-backed record store
//!
//! Documents are stored as JSON text. The eligibility filter and partial
//! updates run through SQLite's JSON1 functions, so each update is a single
//! atomic statement.
//!
//! The subscription is a background task that re-evaluates the filter every
//! `poll_interval` and diffs the result against what it delivered before.

use super::RecordStore;
use crate::records::{ChangeBatch, ChangeType, RecordChange, RecordSnapshot, UNASSIGNED};
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Record store over the `feedback_records` table
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
    poll_interval: Duration,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool, poll_interval: Duration) -> Self {
        Self {
            pool,
            poll_interval,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Load a single record by id
    pub async fn get(&self, record_id: &str) -> Result<Option<RecordSnapshot>> {
        let document: Option<String> =
            sqlx::query_scalar("SELECT document FROM feedback_records WHERE record_id = ?")
                .bind(record_id)
                .fetch_optional(&self.pool)
                .await?;

        match document {
            Some(text) => Ok(Some(RecordSnapshot::new(
                record_id,
                serde_json::from_str(&text)?,
            ))),
            None => Ok(None),
        }
    }

    /// Total number of stored records
    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM feedback_records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Current eligible records as (record_id, raw document), in insertion order
async fn fetch_unassigned(pool: &SqlitePool) -> Result<Vec<(String, String)>> {
    let rows = sqlx::query_as::<_, (String, String)>(
        r#"
        SELECT record_id, document
        FROM feedback_records
        WHERE json_extract(document, '$.assigned_interviewer_agent') = ?
        ORDER BY seq
        "#,
    )
    .bind(UNASSIGNED)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Last delivered view of the eligibility filter
#[derive(Debug, Default)]
struct FilterWatch {
    known: Vec<(String, String)>,
}

impl FilterWatch {
    /// Changes between the previous view and `current`
    ///
    /// Removals come first, then additions and modifications in
    /// insertion order.
    fn diff(&mut self, current: Vec<(String, String)>) -> ChangeBatch {
        let mut batch = ChangeBatch::new();
        {
            let previous: HashMap<&str, &str> = self
                .known
                .iter()
                .map(|(id, doc)| (id.as_str(), doc.as_str()))
                .collect();
            let current_ids: HashSet<&str> = current.iter().map(|(id, _)| id.as_str()).collect();

            for (id, doc) in &self.known {
                if !current_ids.contains(id.as_str()) {
                    batch.extend(to_change(ChangeType::Removed, id, doc));
                }
            }

            for (id, doc) in &current {
                let change_type = match previous.get(id.as_str()) {
                    None => ChangeType::Added,
                    Some(prev) if *prev != doc.as_str() => ChangeType::Modified,
                    Some(_) => continue,
                };
                batch.extend(to_change(change_type, id, doc));
            }
        }

        self.known = current;
        batch
    }
}

fn to_change(change_type: ChangeType, record_id: &str, document: &str) -> Option<RecordChange> {
    match serde_json::from_str(document) {
        Ok(document) => Some(RecordChange {
            change_type,
            record: RecordSnapshot::new(record_id, document),
        }),
        Err(e) => {
            warn!(record_id = %record_id, error = %e, "Skipping record with malformed document");
            None
        }
    }
}

async fn run_poller(
    pool: SqlitePool,
    poll_interval: Duration,
    tx: mpsc::UnboundedSender<ChangeBatch>,
    cancel: CancellationToken,
) {
    let mut watch = FilterWatch::default();
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(poll_interval_ms = poll_interval.as_millis() as u64, "Record subscription started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tx.closed() => break,
            _ = ticker.tick() => {}
        }

        match fetch_unassigned(&pool).await {
            Ok(rows) => {
                let batch = watch.diff(rows);
                if batch.is_empty() {
                    continue;
                }
                debug!(changes = batch.len(), "Delivering change batch");
                if tx.send(batch).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to poll unassigned records, retrying next tick");
            }
        }
    }

    debug!("Record subscription stopped");
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn subscribe_unassigned(
        &self,
        cancel: CancellationToken,
    ) -> Result<mpsc::UnboundedReceiver<ChangeBatch>> {
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll interval must be non-zero".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_poller(self.pool.clone(), self.poll_interval, tx, cancel));
        Ok(rx)
    }

    async fn update(&self, record_id: &str, fields: Map<String, Value>) -> Result<()> {
        if fields.is_empty() {
            return Err(Error::InvalidInput("empty field set".to_string()));
        }

        let patch = serde_json::to_string(&Value::Object(fields))?;
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE feedback_records SET document = json_patch(document, ?), updated_at = ? WHERE record_id = ?",
        )
        .bind(&patch)
        .bind(&now)
        .bind(record_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("record {}", record_id)));
        }

        Ok(())
    }

    async fn insert(&self, record_id: &str, document: &Value) -> Result<()> {
        if !document.is_object() {
            return Err(Error::InvalidInput(format!(
                "record {} document must be a JSON object",
                record_id
            )));
        }

        let text = serde_json::to_string(document)?;
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO feedback_records (record_id, document, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(record_id)
        .bind(&text)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
