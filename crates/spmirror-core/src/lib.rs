//! spmirror Core - Domain logic and shared contracts
//!
//! This crate contains the domain layer shared by every other spmirror crate:
//! - **Domain entities** - `Document`, `FileBlob`, `SyncRun`, `SyncEvent`, `Drive`
//! - **Eligibility filter** - the pure predicate deciding which drive items are mirrored
//! - **Port definition** - the `ICloudProvider` trait implemented by the Graph adapter
//! - **Error taxonomy** - `SyncError`, the run-level and per-item error kinds
//! - **Configuration** - typed YAML configuration with validation
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O. The single
//! port, `ICloudProvider`, is what the sync orchestrator drives; the catalog
//! and blob store are concrete collaborators owned by their own crates.

pub mod config;
pub mod domain;
pub mod error;
pub mod filter;
pub mod ports;

pub use error::SyncError;
