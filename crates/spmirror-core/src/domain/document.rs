//! Documents - logical SharePoint items mirrored into the catalog

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A logical SharePoint item tracked by the catalog.
///
/// Identified remotely by the `(item_id, drive_id)` pair, which is unique
/// together and survives renames and moves. `blob_id` is `None` for
/// metadata-only mode, deleted items, and placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Catalog row id (monotonic)
    pub id: i64,
    /// Stable item id within the drive
    pub item_id: String,
    /// Drive the item belongs to
    pub drive_id: String,
    /// File name as reported by the server
    pub name: String,
    /// Server-reported absolute path within the drive
    pub path: String,
    /// MIME type (server-reported or sniffed at download time)
    pub mime: Option<String>,
    /// Size in bytes as reported by the server
    pub size: i64,
    /// Browser URL of the item
    pub web_url: Option<String>,
    /// Display name of the creator
    pub created_by: Option<String>,
    /// Display name of the last modifier
    pub last_modified_by: Option<String>,
    /// Remote creation timestamp
    pub remote_created_at: Option<DateTime<Utc>>,
    /// Remote last-modified timestamp
    pub remote_modified_at: Option<DateTime<Utc>>,
    /// Blob holding the mirrored content, if any
    pub blob_id: Option<i64>,
    /// Soft-delete flag; deleted rows are kept for history
    pub is_deleted: bool,
    /// When this row was last reconciled against the delta stream
    pub synced_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mutable metadata carried by a delta upsert, used to update a document row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMeta {
    pub name: String,
    pub path: String,
    pub mime: Option<String>,
    pub size: i64,
    pub web_url: Option<String>,
    pub created_by: Option<String>,
    pub last_modified_by: Option<String>,
    pub remote_created_at: Option<DateTime<Utc>>,
    pub remote_modified_at: Option<DateTime<Utc>>,
}

impl Document {
    /// Whether `meta` differs from the metadata currently on this row.
    pub fn metadata_differs(&self, meta: &DocumentMeta) -> bool {
        self.name != meta.name
            || self.path != meta.path
            || self.mime != meta.mime
            || self.size != meta.size
            || self.web_url != meta.web_url
            || self.created_by != meta.created_by
            || self.last_modified_by != meta.last_modified_by
            || self.remote_created_at != meta.remote_created_at
            || self.remote_modified_at != meta.remote_modified_at
    }
}

/// Outcome classification of a document upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
    /// No row existed for `(item_id, drive_id)`; one was inserted
    Inserted,
    /// The row's `blob_id` changed
    UpdatedContent,
    /// Only non-content fields changed (rename, move, timestamps)
    UpdatedMetadata,
    /// Every field already matched and the row was live
    Unchanged,
}
