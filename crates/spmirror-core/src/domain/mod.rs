//! Domain entities for the mirror
//!
//! This module contains the core domain types:
//! - Documents and their metadata snapshots
//! - Content-addressed file blobs with reference counts
//! - Sync runs, counters, and the append-only event log
//! - Drives (SharePoint document libraries)

pub mod blob;
pub mod document;
pub mod drive;
pub mod event;
pub mod run;

pub use blob::{FileBlob, ReleasedBlob};
pub use document::{Document, DocumentMeta, UpsertAction};
pub use drive::Drive;
pub use event::{EventSnapshot, EventType, SyncEvent};
pub use run::{RunCounters, RunStatus, SyncRun};
