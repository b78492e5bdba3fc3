//! File blobs - unique content bodies under the hash-addressed store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unique content body, addressed by its SHA-256.
///
/// While `refcount > 0` the bytes exist on disk at
/// `blobs/{sha256[0:2]}/{sha256[2:4]}/{sha256}` with a length equal to
/// `size`. The row and the file are removed together when the refcount
/// reaches zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileBlob {
    /// Catalog row id (monotonic)
    pub id: i64,
    /// Lowercase hex SHA-256 of the content (64 chars, unique)
    pub sha256: String,
    /// Content length in bytes
    pub size: i64,
    /// Detected or server-reported MIME type
    pub mime: Option<String>,
    /// Server-format QuickXorHash (base64), kept for no-download reuse checks
    pub quick_xor_hash: Option<String>,
    /// Number of live document references
    pub refcount: i64,
    pub created_at: DateTime<Utc>,
}

/// Result of decrementing a blob's refcount inside a catalog transaction.
///
/// When `refcount` reached zero the row was removed and the caller must
/// delete the file from the blob store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasedBlob {
    /// Id of the released blob row
    pub blob_id: i64,
    /// Hash of the released blob, for file removal
    pub sha256: String,
    /// Refcount after the decrement
    pub refcount: i64,
}

impl ReleasedBlob {
    /// Whether the last reference was dropped and the file should be removed.
    pub fn is_orphaned(&self) -> bool {
        self.refcount == 0
    }
}
