//! spmirror Blob Store - content-addressed file storage
//!
//! Maps SHA-256 → bytes under a two-level fan-out directory layout
//! (`{root}/{sha[0:2]}/{sha[2:4]}/{sha}`). Writes stream through a temp file
//! in the same filesystem and are committed with an atomic rename, so readers
//! only ever observe a missing file or a complete correct one. Reference
//! counting lives in the catalog; this crate only moves bytes.

pub mod quickxor;
pub mod store;

use thiserror::Error;

pub use quickxor::QuickXorHash;
pub use store::{BlobStore, BlobWriter, PutResult, StagedBlob, VerifyOutcome};

/// Errors from the blob store.
#[derive(Debug, Error)]
pub enum BlobError {
    /// No blob file exists for the requested hash
    #[error("blob not found: {0}")]
    NotFound(String),

    /// Underlying filesystem failure
    #[error("blob I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl BlobError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        BlobError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

impl From<BlobError> for spmirror_core::SyncError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::NotFound(sha) => spmirror_core::SyncError::NotFound(format!("blob {sha}")),
            other => spmirror_core::SyncError::Storage(other.to_string()),
        }
    }
}
