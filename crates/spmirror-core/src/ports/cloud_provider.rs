//! Cloud provider port (driven/secondary port)
//!
//! Defines the interface the sync orchestrator drives to talk to the remote
//! side. The production implementation targets SharePoint document libraries
//! through Microsoft Graph, but the trait only speaks in terms of sites,
//! drives, delta pages, and content streams, so tests can script a provider
//! without any HTTP.
//!
//! ## Design Notes
//!
//! - Methods return `Result<_, SyncError>` rather than `anyhow::Result` so
//!   the orchestrator can apply the fatal vs per-item failure policy on
//!   typed error kinds.
//! - `delta_page` returns one fully-materialized page per call; the
//!   orchestrator is the only component that advances cursors.
//! - Retry, throttling, and 410 cursor-expiry recovery are implementation
//!   concerns and must not surface partial pages.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// A resolved SharePoint site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteInfo {
    /// Graph site id (`{hostname},{site-guid},{web-guid}`)
    pub id: String,
    /// Site display name
    pub display_name: Option<String>,
}

/// A document library exposed as a Graph drive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveInfo {
    /// Graph drive id
    pub id: String,
    /// Library display name
    pub name: String,
    /// Browser URL of the library
    pub web_url: Option<String>,
}

/// One change entry from a delta page.
///
/// This is a port-level DTO; the orchestrator maps accepted upserts to
/// `DocumentMeta` for the catalog. Folders and deletions carry only the
/// fields the server provides for them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteChange {
    /// Stable item id within the drive
    pub item_id: String,
    /// Item name (file or folder name)
    pub name: String,
    /// Absolute path within the drive (None for deletions)
    pub path: Option<String>,
    /// File size in bytes (None for folders and deletions)
    pub size: Option<u64>,
    /// Server-reported MIME type
    pub mime: Option<String>,
    /// Server-reported SHA-256 (lowercase hex), when the service provides one
    pub sha256: Option<String>,
    /// Server-reported QuickXorHash (base64), when the service provides one
    pub quick_xor_hash: Option<String>,
    /// Browser URL of the item
    pub web_url: Option<String>,
    /// Display name of the creator
    pub created_by: Option<String>,
    /// Display name of the last modifier
    pub last_modified_by: Option<String>,
    /// Remote creation timestamp
    pub created: Option<DateTime<Utc>>,
    /// Remote last-modified timestamp
    pub modified: Option<DateTime<Utc>>,
    /// Whether the entry is a deletion marker
    pub is_deleted: bool,
    /// Whether the item is a folder (ignored by the core)
    pub is_folder: bool,
}

/// One fully-materialized page of the delta stream.
///
/// Exactly one of `next_link` / `delta_link` is present on a well-formed
/// page: `next_link` when more pages follow, `delta_link` on the terminal
/// page (the next cursor to persist).
#[derive(Debug, Clone, Default)]
pub struct DeltaPage {
    pub items: Vec<RemoteChange>,
    pub next_link: Option<String>,
    pub delta_link: Option<String>,
}

/// Pull-driven chunked content body.
///
/// Yields `None` at end of stream. Dropping the stream early releases the
/// underlying response body.
#[async_trait::async_trait]
pub trait ContentStream: Send {
    /// Next chunk of the body, or `None` when the stream is exhausted.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, SyncError>;
}

impl std::fmt::Debug for dyn ContentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn ContentStream")
    }
}

/// Port trait for the remote document source.
#[async_trait::async_trait]
pub trait ICloudProvider: Send + Sync {
    /// Resolves the configured hostname + site path to a Graph site id.
    ///
    /// # Errors
    /// `SyncError::Auth` when token acquisition fails; `SyncError::NotFound`
    /// when the site does not exist.
    async fn resolve_site(&self) -> Result<SiteInfo, SyncError>;

    /// Lists the document libraries of a site.
    ///
    /// # Arguments
    /// * `site_id` - Graph site id from [`resolve_site`](Self::resolve_site)
    /// * `library` - optional display-name filter
    async fn list_drives(
        &self,
        site_id: &str,
        library: Option<&str>,
    ) -> Result<Vec<DriveInfo>, SyncError>;

    /// Fetches one page of the delta stream for a drive.
    ///
    /// With `link = None` enumeration starts at the drive root delta
    /// endpoint (full enumeration). With a stored `delta_link` or a
    /// `next_link` from the previous page, enumeration resumes there. An
    /// expired cursor (HTTP 410) is recovered internally by restarting full
    /// enumeration, so callers never observe it.
    async fn delta_page(
        &self,
        drive_id: &str,
        link: Option<&str>,
    ) -> Result<DeltaPage, SyncError>;

    /// Opens the content stream of an item.
    ///
    /// # Errors
    /// `SyncError::NotFound` when the item disappeared mid-sync (per-item,
    /// non-fatal); `SyncError::TransientNetwork` after the retry budget.
    async fn download(
        &self,
        drive_id: &str,
        item_id: &str,
    ) -> Result<Box<dyn ContentStream>, SyncError>;
}
