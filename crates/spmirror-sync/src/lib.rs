//! spmirror Sync - the run orchestrator
//!
//! The [`SyncEngine`] drives one run end to end: acquire the catalog latch,
//! enumerate drives, pull delta pages, fan each change into catalog and blob
//! store mutations, record audit events, persist the next cursor per drive,
//! and finalize the run. [`MirrorService`] is the maintenance surface the CLI
//! layers on top (status, listing, export, storage verification).

pub mod engine;
pub mod service;

pub use engine::{EventPreview, RunOptions, RunReport, SyncEngine};
pub use service::{ConnectionInfo, ExportFormat, MirrorService, MirrorStatus, StorageReport};
