//! Feedback record store
//!
//! A document collection with a filtered change subscription and partial
//! updates by record id. The router consumes it through [`RecordStore`];
//! [`SqliteRecordStore`] is the SQLite-backed implementation.

mod sqlite;

pub use sqlite::SqliteRecordStore;

use crate::records::ChangeBatch;
use crate::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Document store used by the router and the generator
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Subscribe to records whose assignment is still unassigned
    ///
    /// The first batch lists every currently eligible record as `Added`.
    /// Later batches carry records entering, changing within, or leaving the
    /// filter. The stream ends when `cancel` fires.
    async fn subscribe_unassigned(
        &self,
        cancel: CancellationToken,
    ) -> Result<mpsc::UnboundedReceiver<ChangeBatch>>;

    /// Merge `fields` into the record's document
    ///
    /// Returns `Error::NotFound` for an unknown id.
    async fn update(&self, record_id: &str, fields: Map<String, Value>) -> Result<()>;

    /// Store a new record
    async fn insert(&self, record_id: &str, document: &Value) -> Result<()>;
}
