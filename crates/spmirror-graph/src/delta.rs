//! Microsoft Graph delta queries for incremental synchronization
//!
//! Implements the drive delta query pattern: the first call enumerates the
//! whole drive, every page carries either an `@odata.nextLink` (more pages)
//! or a terminal `@odata.deltaLink` that the orchestrator persists as the
//! drive's cursor for the next run.
//!
//! Pages are fetched one at a time and fully materialized before they are
//! handed to the caller; the orchestrator is the only component that
//! advances cursors. An expired cursor (HTTP 410 Gone) is recovered here by
//! restarting full enumeration, so one run heals a stale mirror on its own.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use spmirror_core::ports::{DeltaPage, RemoteChange};

use crate::client::GraphClient;
use crate::GraphError;

// ============================================================================
// Microsoft Graph API response types (JSON deserialization)
// ============================================================================

/// Raw response from the drive delta endpoint
///
/// See: <https://learn.microsoft.com/en-us/graph/api/driveitem-delta>
#[derive(Debug, Deserialize)]
struct GraphDeltaResponse {
    #[serde(default)]
    value: Vec<GraphDriveItem>,

    /// URL for the next page of results (present when more pages exist)
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,

    /// URL containing the delta token for the next sync cycle
    /// (present only on the last page of results)
    #[serde(rename = "@odata.deltaLink")]
    delta_link: Option<String>,
}

/// A drive item from the delta response, camelCase to match the wire format.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDriveItem {
    id: String,

    #[serde(default)]
    name: String,

    size: Option<u64>,

    web_url: Option<String>,

    created_date_time: Option<DateTime<Utc>>,

    last_modified_date_time: Option<DateTime<Utc>>,

    parent_reference: Option<GraphParentReference>,

    created_by: Option<GraphIdentitySet>,

    last_modified_by: Option<GraphIdentitySet>,

    /// File facet (present if the item is a file)
    file: Option<GraphFileFacet>,

    /// Folder facet (present if the item is a folder)
    folder: Option<GraphFolderFacet>,

    /// Deleted facet (present if the item has been deleted)
    deleted: Option<GraphDeletedFacet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphParentReference {
    /// URL-decoded path of the parent, e.g. `/drives/{id}/root:/Reports`
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphIdentitySet {
    user: Option<GraphIdentity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphIdentity {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphFileFacet {
    mime_type: Option<String>,
    hashes: Option<GraphHashes>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphHashes {
    /// QuickXorHash of the file content (Base64-encoded)
    quick_xor_hash: Option<String>,
    /// SHA-256 of the file content (hex), when the service computes one
    sha256_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphFolderFacet {
    #[allow(dead_code)]
    child_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GraphDeletedFacet {
    #[allow(dead_code)]
    state: Option<String>,
}

// ============================================================================
// Parsing into port-level types
// ============================================================================

/// Converts raw delta responses into port-level [`DeltaPage`]s.
pub struct DeltaParser;

impl DeltaParser {
    fn parse_item(item: GraphDriveItem) -> RemoteChange {
        let is_deleted = item.deleted.is_some();
        let is_folder = item.folder.is_some();

        let (mime, quick_xor_hash, sha256) = match item.file.as_ref() {
            Some(file) => (
                file.mime_type.clone(),
                file.hashes.as_ref().and_then(|h| h.quick_xor_hash.clone()),
                file.hashes
                    .as_ref()
                    .and_then(|h| h.sha256_hash.as_ref())
                    .map(|h| h.to_ascii_lowercase()),
            ),
            None => (None, None, None),
        };

        let path = item
            .parent_reference
            .as_ref()
            .and_then(|pr| pr.path.as_ref())
            .map(|p| Self::normalize_parent_path(p, &item.name));

        RemoteChange {
            item_id: item.id,
            name: item.name,
            path,
            size: item.size,
            mime,
            sha256,
            quick_xor_hash,
            web_url: item.web_url,
            created_by: identity_name(item.created_by),
            last_modified_by: identity_name(item.last_modified_by),
            created: item.created_date_time,
            modified: item.last_modified_date_time,
            is_deleted,
            is_folder,
        }
    }

    /// Normalizes a Graph parent path to an absolute path within the drive.
    ///
    /// Graph reports parents as `/drives/{drive-id}/root:/Sub/Folder` (or
    /// `/drive/root:` for the personal-drive form); everything through
    /// `root:` is stripped and the item name appended, yielding
    /// `/Sub/Folder/{name}`.
    fn normalize_parent_path(parent_path: &str, item_name: &str) -> String {
        let stripped = match parent_path.split_once("root:") {
            Some((_, "")) => "/".to_string(),
            Some((_, rest)) => rest.to_string(),
            None => parent_path.to_string(),
        };

        if stripped == "/" {
            format!("/{item_name}")
        } else {
            format!("{stripped}/{item_name}")
        }
    }

    fn parse_response(response: GraphDeltaResponse) -> DeltaPage {
        DeltaPage {
            items: response.value.into_iter().map(Self::parse_item).collect(),
            next_link: response.next_link,
            delta_link: response.delta_link,
        }
    }
}

fn identity_name(set: Option<GraphIdentitySet>) -> Option<String> {
    set.and_then(|s| s.user).and_then(|u| u.display_name)
}

// ============================================================================
// Page fetching
// ============================================================================

/// Fetches one fully-materialized delta page for a drive.
///
/// With `link = None` the enumeration starts at the drive root delta
/// endpoint. With a stored `deltaLink` (or the previous page's `nextLink`)
/// it resumes there; an expired link (410 Gone) drops the cursor and
/// restarts full enumeration within the same run.
pub async fn fetch_page(
    client: &GraphClient,
    drive_id: &str,
    link: Option<&str>,
) -> Result<DeltaPage, GraphError> {
    let url = match link {
        Some(link) => link.to_string(),
        None => root_delta_url(client, drive_id),
    };

    match client.get_json::<GraphDeltaResponse>(&url).await {
        Ok(raw) => {
            let page = DeltaParser::parse_response(raw);
            debug!(
                drive_id,
                items = page.items.len(),
                has_next = page.next_link.is_some(),
                has_delta = page.delta_link.is_some(),
                "delta page fetched"
            );
            Ok(page)
        }
        Err(GraphError::Gone(_)) if link.is_some() => {
            warn!(drive_id, "delta cursor expired (410 Gone), restarting full enumeration");
            let raw: GraphDeltaResponse =
                client.get_json(&root_delta_url(client, drive_id)).await?;
            Ok(DeltaParser::parse_response(raw))
        }
        Err(e) => Err(e),
    }
}

fn root_delta_url(client: &GraphClient, drive_id: &str) -> String {
    client.url(&format!("/drives/{drive_id}/root/delta"))
}

// ============================================================================
// Tests
// ============================================================================
