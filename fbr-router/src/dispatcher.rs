//! Change dispatcher
//!
//! Sole consumer of the record store's change stream. Each added record is
//! taken through: transcript check → classify → resolve queue → write
//! assignment → inter-record delay. Records are handled strictly one at a
//! time so the classifier's per-minute budget holds no matter how large a
//! batch the store delivers.
//!
//! Per-record failures never leave this module: a failed write is logged and
//! the record stays unassigned.

use crate::classifier::TopicClassifier;
use crate::routing::RoutingTable;
use crate::topic::Topic;
use fbr_common::config::RouterSettings;
use fbr_common::records::{assignment_update, SKIPPED_NO_TRANSCRIPT};
use fbr_common::{ChangeBatch, ChangeType, RecordChange, RecordStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Fixed pauses applied by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTiming {
    /// Sleep after every processed record
    pub inter_record_delay: Duration,
    /// Extra sleep after an `Uncategorized` result
    pub uncategorized_pause: Duration,
}

impl Default for DispatchTiming {
    fn default() -> Self {
        Self::from_settings(&RouterSettings::default())
    }
}

impl DispatchTiming {
    pub fn from_settings(settings: &RouterSettings) -> Self {
        Self {
            inter_record_delay: settings.inter_record_delay(),
            uncategorized_pause: settings.uncategorized_pause(),
        }
    }
}

/// What happened to one change event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not an addition
    Ignored,
    /// No transcript; marked as skipped
    Skipped,
    /// Classified and assigned
    Routed { topic: Topic, queue: String },
    /// Classified but the assignment write failed
    UpdateFailed { topic: Option<Topic>, queue: String },
}

/// Running outcome counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub routed: u64,
    pub skipped: u64,
    pub update_failures: u64,
    pub ignored: u64,
}

impl DispatchStats {
    fn record(&mut self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Ignored => self.ignored += 1,
            DispatchOutcome::Skipped => self.skipped += 1,
            DispatchOutcome::Routed { .. } => self.routed += 1,
            DispatchOutcome::UpdateFailed { .. } => self.update_failures += 1,
        }
    }
}

pub struct ChangeDispatcher {
    classifier: Arc<dyn TopicClassifier>,
    store: Arc<dyn RecordStore>,
    routing: Arc<RoutingTable>,
    timing: DispatchTiming,
    stats: DispatchStats,
}

impl ChangeDispatcher {
    pub fn new(
        classifier: Arc<dyn TopicClassifier>,
        store: Arc<dyn RecordStore>,
        routing: Arc<RoutingTable>,
        timing: DispatchTiming,
    ) -> Self {
        Self {
            classifier,
            store,
            routing,
            timing,
            stats: DispatchStats::default(),
        }
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Consume change batches until cancelled or the stream closes
    pub async fn run(
        mut self,
        mut batches: mpsc::UnboundedReceiver<ChangeBatch>,
        cancel: CancellationToken,
    ) -> DispatchStats {
        info!("Change dispatcher listening for unassigned records");

        loop {
            let batch = tokio::select! {
                _ = cancel.cancelled() => break,
                batch = batches.recv() => match batch {
                    Some(batch) => batch,
                    None => {
                        warn!("Record change stream closed");
                        break;
                    }
                },
            };

            self.handle_batch(batch, &cancel).await;
        }

        info!(
            routed = self.stats.routed,
            skipped = self.stats.skipped,
            update_failures = self.stats.update_failures,
            ignored = self.stats.ignored,
            "Change dispatcher stopped"
        );

        self.stats
    }

    /// Handle every change of a batch in delivered order
    ///
    /// Cancellation is honored between records, never mid-record.
    pub async fn handle_batch(
        &mut self,
        batch: ChangeBatch,
        cancel: &CancellationToken,
    ) -> Vec<DispatchOutcome> {
        debug!(changes = batch.len(), "Processing change batch");
        let total = batch.len();
        let mut outcomes = Vec::with_capacity(total);

        for change in &batch {
            if cancel.is_cancelled() {
                info!(
                    remaining = total - outcomes.len(),
                    "Cancelled, leaving remaining records unassigned"
                );
                break;
            }
            outcomes.push(self.handle_change(change).await);
        }

        outcomes
    }

    /// Take one change event through the routing state machine
    pub async fn handle_change(&mut self, change: &RecordChange) -> DispatchOutcome {
        if change.change_type != ChangeType::Added {
            debug!(
                record_id = %change.record.record_id,
                change_type = ?change.change_type,
                "Ignoring non-addition change"
            );
            let outcome = DispatchOutcome::Ignored;
            self.stats.record(&outcome);
            return outcome;
        }

        let record = &change.record;
        info!(
            record_id = %record.record_id,
            contact_name = %record.contact_name(),
            "New unassigned record"
        );

        let outcome = match record.transcript() {
            None => {
                info!(record_id = %record.record_id, "No transcript, marking as skipped");
                if self.write_assignment(&record.record_id, SKIPPED_NO_TRANSCRIPT).await {
                    DispatchOutcome::Skipped
                } else {
                    DispatchOutcome::UpdateFailed {
                        topic: None,
                        queue: SKIPPED_NO_TRANSCRIPT.to_string(),
                    }
                }
            }
            Some(transcript) => {
                let topic = self.classifier.classify(transcript).await;
                info!(record_id = %record.record_id, topic = %topic, "Transcript classified");

                if topic == Topic::Uncategorized && !self.timing.uncategorized_pause.is_zero() {
                    warn!(
                        pause_ms = self.timing.uncategorized_pause.as_millis() as u64,
                        "Uncategorized result, pausing before continuing"
                    );
                    tokio::time::sleep(self.timing.uncategorized_pause).await;
                }

                let queue = self.routing.resolve(&topic).to_string();
                info!(record_id = %record.record_id, queue = %queue, "Routing record");

                if self.write_assignment(&record.record_id, &queue).await {
                    DispatchOutcome::Routed { topic, queue }
                } else {
                    DispatchOutcome::UpdateFailed {
                        topic: Some(topic),
                        queue,
                    }
                }
            }
        };

        self.stats.record(&outcome);
        tokio::time::sleep(self.timing.inter_record_delay).await;
        outcome
    }

    /// Write the assignment field; failures are logged, not raised
    async fn write_assignment(&self, record_id: &str, value: &str) -> bool {
        match self.store.update(record_id, assignment_update(value)).await {
            Ok(()) => {
                debug!(record_id = %record_id, assignment = %value, "Assignment written");
                true
            }
            Err(e) => {
                error!(
                    record_id = %record_id,
                    assignment = %value,
                    error = %e,
                    "Failed to write assignment, record left unassigned"
                );
                false
            }
        }
    }
}
