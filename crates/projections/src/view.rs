//! Denormalized arena view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the query side serves. Stored as one record per arena; the
/// config rides along as raw JSON because the read side never
/// interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArenaView {
    pub id: String,
    pub name: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub config_json: String,
}
