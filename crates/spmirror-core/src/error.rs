//! Error taxonomy for the sync core
//!
//! `SyncError` is the typed error surface the orchestrator works with. The
//! adapter crates (catalog, blob store, Graph client) define their own error
//! enums and convert into this taxonomy at their boundary, so the engine can
//! apply the failure policy without inspecting error strings:
//!
//! - **fatal** errors finalize the run as `failed` and leave the affected
//!   drive's delta cursor unadvanced
//! - **per-item** errors are logged, counted as `skipped`, and the run goes on

use thiserror::Error;

/// Errors surfaced by the sync core
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing or malformed configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Token acquisition failed or was rejected
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Network or 5xx failure that survived the internal retry budget
    #[error("network error after {attempts} attempts: {message}")]
    TransientNetwork {
        /// Number of attempts made before giving up
        attempts: u32,
        /// Description of the last failure
        message: String,
    },

    /// HTTP 429 that survived the internal retry budget
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Item or blob missing; expected when items are deleted mid-sync
    #[error("not found: {0}")]
    NotFound(String),

    /// Streamed content did not match the server-advertised hash
    #[error("hash mismatch for {item}: expected {expected}, got {actual}")]
    HashMismatch {
        /// Item name or id the download was for
        item: String,
        /// Server-advertised hash
        expected: String,
        /// Hash computed over the received bytes
        actual: String,
    },

    /// Disk I/O failure in the blob store
    #[error("storage error: {0}")]
    Storage(String),

    /// Database failure in the catalog
    #[error("catalog error: {0}")]
    Catalog(String),

    /// A second concurrent run was attempted while the latch is held
    #[error("another sync is already in progress")]
    AlreadyRunning,

    /// The run was cancelled between pages or entries
    #[error("cancelled")]
    Cancelled,
}

impl SyncError {
    /// Whether this error is recoverable per-item (logged and counted as
    /// `skipped`) rather than fatal for the whole run.
    pub fn is_per_item(&self) -> bool {
        matches!(self, SyncError::NotFound(_) | SyncError::HashMismatch { .. })
    }
}
