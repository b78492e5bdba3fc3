//! Sync events - the append-only per-item audit log
//!
//! A content change is recorded as a pair: `modify_remove` with the old
//! snapshot followed by `modify_add` with the new one, both under the same
//! run id. This preserves before/after without versioning blob bytes.
//! Metadata-only updates (renames, moves) emit no event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a sync event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A document was mirrored for the first time
    Add,
    /// A document was deleted remotely or retracted by the filter
    Remove,
    /// New snapshot of a content change (follows `ModifyRemove`)
    ModifyAdd,
    /// Old snapshot of a content change (precedes `ModifyAdd`)
    ModifyRemove,
    /// A download was discarded (hash mismatch or per-item error)
    Failed,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Add => "add",
            EventType::Remove => "remove",
            EventType::ModifyAdd => "modify_add",
            EventType::ModifyRemove => "modify_remove",
            EventType::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add" => Some(EventType::Add),
            "remove" => Some(EventType::Remove),
            "modify_add" => Some(EventType::ModifyAdd),
            "modify_remove" => Some(EventType::ModifyRemove),
            "failed" => Some(EventType::Failed),
            _ => None,
        }
    }
}

/// Item state captured at the moment an event was logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub item_id: String,
    pub name: String,
    pub path: String,
    pub size: i64,
    pub blob_id: Option<i64>,
}

/// One append-only audit row. Ids are monotonic within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEvent {
    pub id: i64,
    pub run_id: i64,
    pub document_id: Option<i64>,
    pub event_type: EventType,
    pub snapshot: EventSnapshot,
    pub logged_at: DateTime<Utc>,
}
