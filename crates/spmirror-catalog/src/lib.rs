//! spmirror Catalog - durable relational state
//!
//! The catalog is the single writer over all mirror state: documents, blobs,
//! delta cursors, drives, runs, events, and the `sync_in_progress` latch.
//! It is backed by one SQLite file in WAL mode; multi-row mutations (blob
//! swaps, soft deletes, run boundaries) each execute inside a single
//! transaction so the mirror stays convergent across interrupted runs.

pub mod pool;
pub mod repository;

use thiserror::Error;

pub use pool::CatalogPool;
pub use repository::{Catalog, CatalogCounts, RemoveOutcome, UpsertOutcome};

/// Errors from the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Could not open or create the database
    #[error("database connection failed: {0}")]
    ConnectionFailed(String),

    /// A schema migration did not apply
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    /// A stored value could not be decoded into its domain type
    #[error("row decode failed: {0}")]
    Decode(String),

    /// The `sync_in_progress` latch is held by a live run
    #[error("another sync is already in progress")]
    AlreadyRunning,

    /// Refcount operation against a blob id that has no row
    #[error("unknown blob id {0}")]
    UnknownBlob(i64),

    /// Run operation against a run id that has no row
    #[error("unknown run id {0}")]
    UnknownRun(i64),
}

impl From<CatalogError> for spmirror_core::SyncError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::AlreadyRunning => spmirror_core::SyncError::AlreadyRunning,
            other => spmirror_core::SyncError::Catalog(other.to_string()),
        }
    }
}
