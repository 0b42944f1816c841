//! Event envelope wire contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The message carried over the broker between write side and read
/// side. This is the only contract the two sides share; the payload
/// schema is versioned and specific to `event_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub event_id: String,
    pub event_type: String,
    /// The arena the event belongs to; doubles as the partition key so
    /// one aggregate's events flow through one ordered stream.
    pub aggregate_id: String,
    /// May be absent on the wire; consumers default it on receipt.
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    pub version: i32,
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Returns the occurrence timestamp, falling back to `fallback`
    /// when the producer did not set one.
    pub fn occurred_at_or(&self, fallback: DateTime<Utc>) -> DateTime<Utc> {
        self.occurred_at.unwrap_or(fallback)
    }

    /// Returns true when the identity fields required for routing and
    /// idempotency are all present.
    pub fn has_required_fields(&self) -> bool {
        !self.event_id.is_empty() && !self.event_type.is_empty() && !self.aggregate_id.is_empty()
    }
}
