//! Feedback record snapshots and change events
//!
//! Records are schemaless JSON documents. The router only cares about two
//! fields: the transcript it classifies and the assignment it writes back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Document field holding the free-text feedback
pub const TRANSCRIPT_FIELD: &str = "last_feedback_summary";

/// Document field holding the routing assignment
pub const ASSIGNMENT_FIELD: &str = "assigned_interviewer_agent";

/// Assignment sentinel for records that have not been routed yet
pub const UNASSIGNED: &str = "N/A";

/// Terminal assignment for records with nothing to classify
pub const SKIPPED_NO_TRANSCRIPT: &str = "Skipped - No Transcript";

/// Point-in-time copy of a stored record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub record_id: String,
    pub document: Value,
}

impl RecordSnapshot {
    pub fn new(record_id: impl Into<String>, document: Value) -> Self {
        Self {
            record_id: record_id.into(),
            document,
        }
    }

    fn str_field(&self, field: &str) -> Option<&str> {
        self.document.get(field).and_then(Value::as_str)
    }

    /// Transcript text as stored, or `None` when absent, non-string or blank
    pub fn transcript(&self) -> Option<&str> {
        self.str_field(TRANSCRIPT_FIELD)
            .filter(|t| !t.trim().is_empty())
    }

    pub fn assignment(&self) -> Option<&str> {
        self.str_field(ASSIGNMENT_FIELD)
    }

    /// Display name for logs
    pub fn contact_name(&self) -> &str {
        self.str_field("contact_name").unwrap_or("Unknown User")
    }

    pub fn is_unassigned(&self) -> bool {
        self.assignment() == Some(UNASSIGNED)
    }
}

/// Kind of change observed on the eligibility filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    /// Record entered the filter (new, or present at subscription start)
    Added,
    /// Record still matches but its document changed
    Modified,
    /// Record left the filter
    Removed,
}

/// One change delivered by a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordChange {
    pub change_type: ChangeType,
    pub record: RecordSnapshot,
}

impl RecordChange {
    pub fn added(record: RecordSnapshot) -> Self {
        Self {
            change_type: ChangeType::Added,
            record,
        }
    }
}

/// Ordered group of changes delivered together
pub type ChangeBatch = Vec<RecordChange>;

/// Partial update setting only the assignment field
pub fn assignment_update(value: &str) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(ASSIGNMENT_FIELD.to_string(), Value::String(value.to_string()));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transcript_passed_through_unchanged() {
        let snapshot = RecordSnapshot::new(
            "r1",
            json!({ "last_feedback_summary": "  Export is slow  " }),
        );
        assert_eq!(snapshot.transcript(), Some("  Export is slow  "));
    }

    #[test]
    fn test_transcript_blank_or_missing() {
        let blank = RecordSnapshot::new("r1", json!({ "last_feedback_summary": "   " }));
        let missing = RecordSnapshot::new("r2", json!({ "contact_name": "Ada" }));
        let wrong_type = RecordSnapshot::new("r3", json!({ "last_feedback_summary": 42 }));

        assert_eq!(blank.transcript(), None);
        assert_eq!(missing.transcript(), None);
        assert_eq!(wrong_type.transcript(), None);
    }

    #[test]
    fn test_contact_name_fallback() {
        let snapshot = RecordSnapshot::new("r1", json!({}));
        assert_eq!(snapshot.contact_name(), "Unknown User");
    }

    #[test]
    fn test_assignment_update_shape() {
        let fields = assignment_update("UX Research Team");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[ASSIGNMENT_FIELD], json!("UX Research Team"));
    }
}
