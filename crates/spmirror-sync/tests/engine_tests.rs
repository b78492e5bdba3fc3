//! End-to-end orchestrator tests
//!
//! A scripted cloud provider feeds delta pages and content to the real
//! engine, in-memory catalog, and a tempdir blob store. No HTTP involved.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use spmirror_blob::{BlobStore, QuickXorHash};
use spmirror_catalog::{Catalog, CatalogPool};
use spmirror_core::config::Config;
use spmirror_core::domain::{EventType, RunStatus};
use spmirror_core::ports::{
    ContentStream, DeltaPage, DriveInfo, ICloudProvider, RemoteChange, SiteInfo,
};
use spmirror_core::SyncError;
use spmirror_sync::{RunOptions, SyncEngine};

// ============================================================================
// Scripted provider
// ============================================================================

enum DownloadBehavior {
    Bytes(Vec<u8>),
    NotFound,
}

/// Cloud provider driven by a script: delta pages are keyed by
/// `(drive_id, link)` and downloads by item id.
struct ScriptedProvider {
    drives: Vec<DriveInfo>,
    pages: Mutex<HashMap<(String, Option<String>), DeltaPage>>,
    content: Mutex<HashMap<String, DownloadBehavior>>,
    downloads: AtomicUsize,
}

impl ScriptedProvider {
    fn new() -> Self {
        Self {
            drives: vec![DriveInfo {
                id: "drive-1".to_string(),
                name: "Documents".to_string(),
                web_url: None,
            }],
            pages: Mutex::new(HashMap::new()),
            content: Mutex::new(HashMap::new()),
            downloads: AtomicUsize::new(0),
        }
    }

    fn script_page(&self, drive_id: &str, link: Option<&str>, page: DeltaPage) {
        self.pages
            .lock()
            .unwrap()
            .insert((drive_id.to_string(), link.map(String::from)), page);
    }

    fn script_content(&self, item_id: &str, bytes: &[u8]) {
        self.content
            .lock()
            .unwrap()
            .insert(item_id.to_string(), DownloadBehavior::Bytes(bytes.to_vec()));
    }

    fn script_missing_content(&self, item_id: &str) {
        self.content
            .lock()
            .unwrap()
            .insert(item_id.to_string(), DownloadBehavior::NotFound);
    }

    fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ICloudProvider for ScriptedProvider {
    async fn resolve_site(&self) -> Result<SiteInfo, SyncError> {
        Ok(SiteInfo {
            id: "site-1".to_string(),
            display_name: Some("Test Site".to_string()),
        })
    }

    async fn list_drives(
        &self,
        _site_id: &str,
        library: Option<&str>,
    ) -> Result<Vec<DriveInfo>, SyncError> {
        let mut drives = self.drives.clone();
        if let Some(name) = library {
            drives.retain(|d| d.name.eq_ignore_ascii_case(name));
        }
        Ok(drives)
    }

    async fn delta_page(
        &self,
        drive_id: &str,
        link: Option<&str>,
    ) -> Result<DeltaPage, SyncError> {
        self.pages
            .lock()
            .unwrap()
            .get(&(drive_id.to_string(), link.map(String::from)))
            .cloned()
            .ok_or_else(|| SyncError::TransientNetwork {
                attempts: 5,
                message: format!("no scripted page for {drive_id} link={link:?}"),
            })
    }

    async fn download(
        &self,
        _drive_id: &str,
        item_id: &str,
    ) -> Result<Box<dyn ContentStream>, SyncError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        match self.content.lock().unwrap().get(item_id) {
            Some(DownloadBehavior::Bytes(bytes)) => Ok(Box::new(ChunkStream::new(bytes))),
            Some(DownloadBehavior::NotFound) | None => {
                Err(SyncError::NotFound(format!("item {item_id}")))
            }
        }
    }
}

struct ChunkStream {
    chunks: VecDeque<Bytes>,
}

impl ChunkStream {
    fn new(bytes: &[u8]) -> Self {
        Self {
            chunks: bytes
                .chunks(7)
                .map(|c| Bytes::copy_from_slice(c))
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl ContentStream for ChunkStream {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, SyncError> {
        Ok(self.chunks.pop_front())
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    _tmp: tempfile::TempDir,
    catalog: Arc<Catalog>,
    blobs: Arc<BlobStore>,
    provider: Arc<ScriptedProvider>,
}

async fn harness() -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let pool = CatalogPool::in_memory().await.unwrap();
    let catalog = Arc::new(Catalog::new(pool.pool().clone()));
    let blobs = Arc::new(BlobStore::open(tmp.path().join("blobs")).await.unwrap());
    Harness {
        _tmp: tmp,
        catalog,
        blobs,
        provider: Arc::new(ScriptedProvider::new()),
    }
}

impl Harness {
    fn engine(&self, config: &Config) -> SyncEngine {
        SyncEngine::new(
            self.provider.clone(),
            self.catalog.clone(),
            self.blobs.clone(),
            config,
        )
        .unwrap()
    }
}

fn sha_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// A live file entry advertising its real SHA-256 and QuickXorHash.
fn file_change(item_id: &str, name: &str, bytes: &[u8]) -> RemoteChange {
    RemoteChange {
        item_id: item_id.to_string(),
        name: name.to_string(),
        path: Some(format!("/{name}")),
        size: Some(bytes.len() as u64),
        sha256: Some(sha_hex(bytes)),
        quick_xor_hash: Some(QuickXorHash::hash_base64(bytes)),
        ..RemoteChange::default()
    }
}

fn deleted_change(item_id: &str, name: &str) -> RemoteChange {
    RemoteChange {
        item_id: item_id.to_string(),
        name: name.to_string(),
        is_deleted: true,
        ..RemoteChange::default()
    }
}

fn page(items: Vec<RemoteChange>, delta_link: &str) -> DeltaPage {
    DeltaPage {
        items,
        next_link: None,
        delta_link: Some(delta_link.to_string()),
    }
}

const A_BYTES: &[u8] = &[b'a'; 100];
const B_BYTES: &[u8] = &[b'b'; 200];
const C_BYTES: &[u8] = &[b'c'; 50];

/// Scripts the cold-start page: three files, cursor `c1`.
fn script_cold_start(provider: &ScriptedProvider) {
    provider.script_page(
        "drive-1",
        None,
        page(
            vec![
                file_change("item-a", "A.pdf", A_BYTES),
                file_change("item-b", "B.docx", B_BYTES),
                file_change("item-c", "C.txt", C_BYTES),
            ],
            "c1",
        ),
    );
    provider.script_content("item-a", A_BYTES);
    provider.script_content("item-b", B_BYTES);
    provider.script_content("item-c", C_BYTES);
}

// ============================================================================
// Scenario chain: cold start → no-op → rename → content change → deletion
// ============================================================================

#[tokio::test]
async fn test_mirror_lifecycle() {
    let h = harness().await;
    let config = Config::default();
    let engine = h.engine(&config);

    // --- Scenario 1: cold start, single drive, three files -----------------
    script_cold_start(&h.provider);
    let report = engine.run(RunOptions::default()).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.counters.added, 3);
    assert_eq!(report.counters.bytes_downloaded, 350);
    assert_eq!(
        h.catalog.get_delta_link("drive-1").await.unwrap().as_deref(),
        Some("c1")
    );

    let docs = h.catalog.list_documents(None, None, false).await.unwrap();
    assert_eq!(docs.len(), 3);
    for doc in &docs {
        let blob = h.catalog.get_blob(doc.blob_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(blob.refcount, 1);
        // The blob file exists with the right identity.
        assert_eq!(
            h.blobs.verify(&blob.sha256, blob.size as u64).await.unwrap(),
            spmirror_blob::VerifyOutcome::Ok
        );
    }
    let events = h.catalog.list_events(report.run_id.unwrap()).await.unwrap();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.event_type == EventType::Add));

    // --- Scenario 2: incremental, no changes -------------------------------
    h.provider
        .script_page("drive-1", Some("c1"), page(vec![], "c2"));
    let report = engine.run(RunOptions::default()).await.unwrap();

    assert_eq!(report.counters, Default::default());
    assert_eq!(
        h.catalog.get_delta_link("drive-1").await.unwrap().as_deref(),
        Some("c2")
    );
    assert!(h
        .catalog
        .list_events(report.run_id.unwrap())
        .await
        .unwrap()
        .is_empty());

    // --- Scenario 3: rename without content change -------------------------
    let renamed = RemoteChange {
        name: "A_v2.pdf".to_string(),
        path: Some("/A_v2.pdf".to_string()),
        ..file_change("item-a", "A.pdf", A_BYTES)
    };
    h.provider
        .script_page("drive-1", Some("c2"), page(vec![renamed], "c3"));
    let downloads_before = h.provider.download_count();
    let report = engine.run(RunOptions::default()).await.unwrap();

    assert_eq!(report.counters.unchanged, 1);
    assert_eq!(report.counters.modified, 0);
    assert_eq!(report.counters.bytes_downloaded, 0);
    // Same hash and size: no download happened.
    assert_eq!(h.provider.download_count(), downloads_before);

    let doc = h.catalog.get_document("item-a", "drive-1").await.unwrap().unwrap();
    assert_eq!(doc.name, "A_v2.pdf");
    let blob = h.catalog.get_blob(doc.blob_id.unwrap()).await.unwrap().unwrap();
    assert_eq!(blob.sha256, sha_hex(A_BYTES));
    assert!(h
        .catalog
        .list_events(report.run_id.unwrap())
        .await
        .unwrap()
        .is_empty());

    // --- Scenario 4: content change -----------------------------------------
    let old_b_sha = sha_hex(B_BYTES);
    let new_b_bytes = vec![b'B'; 250];
    h.provider.script_page(
        "drive-1",
        Some("c3"),
        page(vec![file_change("item-b", "B.docx", &new_b_bytes)], "c4"),
    );
    h.provider.script_content("item-b", &new_b_bytes);
    let report = engine.run(RunOptions::default()).await.unwrap();

    assert_eq!(report.counters.modified, 1);
    assert_eq!(report.counters.bytes_downloaded, 250);

    // Old blob is fully gone: row and file.
    assert!(h.catalog.get_blob_by_sha256(&old_b_sha).await.unwrap().is_none());
    assert!(matches!(
        h.blobs.open_blob(&old_b_sha).await,
        Err(spmirror_blob::BlobError::NotFound(_))
    ));
    let new_blob = h
        .catalog
        .get_blob_by_sha256(&sha_hex(&new_b_bytes))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(new_blob.refcount, 1);

    // Event pair, in order, under this run.
    let events = h.catalog.list_events(report.run_id.unwrap()).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, EventType::ModifyRemove);
    assert_eq!(events[1].event_type, EventType::ModifyAdd);
    assert_eq!(events[0].snapshot.size, 200);
    assert_eq!(events[1].snapshot.size, 250);

    // --- Scenario 5: deletion ------------------------------------------------
    let c_sha = sha_hex(C_BYTES);
    h.provider.script_page(
        "drive-1",
        Some("c4"),
        page(vec![deleted_change("item-c", "C.txt")], "c5"),
    );
    let report = engine.run(RunOptions::default()).await.unwrap();

    assert_eq!(report.counters.removed, 1);
    let doc = h.catalog.get_document("item-c", "drive-1").await.unwrap().unwrap();
    assert!(doc.is_deleted);
    assert_eq!(doc.blob_id, None);
    assert!(h.catalog.get_blob_by_sha256(&c_sha).await.unwrap().is_none());
    assert!(matches!(
        h.blobs.open_blob(&c_sha).await,
        Err(spmirror_blob::BlobError::NotFound(_))
    ));

    let events = h.catalog.list_events(report.run_id.unwrap()).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::Remove);

    // Deleting the same item again is silently ignored.
    h.provider.script_page(
        "drive-1",
        Some("c5"),
        page(vec![deleted_change("item-c", "C.txt")], "c6"),
    );
    let report = engine.run(RunOptions::default()).await.unwrap();
    assert_eq!(report.counters.removed, 0);
}

// ============================================================================
// Scenario 6: filter retraction
// ============================================================================

#[tokio::test]
async fn test_filter_retraction_on_full_resync() {
    let h = harness().await;
    script_cold_start(&h.provider);

    // Seed the mirror accepting everything.
    let permissive = Config::default();
    h.engine(&permissive).run(RunOptions::default()).await.unwrap();
    assert_eq!(h.catalog.counts().await.unwrap().documents, 3);

    // Re-run a full sync with .txt excluded from the allow-list.
    let mut restricted = Config::default();
    restricted.sync.include_extensions = vec!["pdf".to_string(), "docx".to_string()];
    let engine = h.engine(&restricted);
    let report = engine
        .run(RunOptions {
            full: true,
            ..RunOptions::default()
        })
        .await
        .unwrap();

    assert_eq!(report.counters.removed, 1);
    assert_eq!(report.counters.unchanged, 2);
    assert_eq!(report.counters.added, 0);

    let doc = h.catalog.get_document("item-c", "drive-1").await.unwrap().unwrap();
    assert!(doc.is_deleted);
    assert_eq!(doc.blob_id, None);
    assert!(h
        .catalog
        .get_blob_by_sha256(&sha_hex(C_BYTES))
        .await
        .unwrap()
        .is_none());

    let events = h.catalog.list_events(report.run_id.unwrap()).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::Remove);
    assert_eq!(events[0].snapshot.name, "C.txt");
}

#[tokio::test]
async fn test_unmirrored_rejected_items_count_skipped() {
    let h = harness().await;
    script_cold_start(&h.provider);

    let mut config = Config::default();
    config.sync.include_extensions = vec!["pdf".to_string()];
    let report = h.engine(&config).run(RunOptions::default()).await.unwrap();

    assert_eq!(report.counters.added, 1);
    assert_eq!(report.counters.skipped, 2);
    assert_eq!(h.catalog.counts().await.unwrap().documents, 1);
}

// ============================================================================
// Dry run
// ============================================================================

#[tokio::test]
async fn test_dry_run_is_a_noop() {
    let h = harness().await;
    script_cold_start(&h.provider);

    let config = Config::default();
    let report = h
        .engine(&config)
        .run(RunOptions {
            dry_run: true,
            ..RunOptions::default()
        })
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.run_id, None);
    assert_eq!(report.counters.added, 3);
    assert_eq!(report.counters.bytes_downloaded, 350);
    assert_eq!(report.preview.len(), 3);
    assert!(report.preview.iter().all(|p| p.event_type == EventType::Add));

    // Nothing was written anywhere.
    assert_eq!(h.catalog.counts().await.unwrap().documents, 0);
    assert_eq!(h.catalog.counts().await.unwrap().blobs, 0);
    assert!(h.catalog.last_run().await.unwrap().is_none());
    assert!(h.catalog.current_run().await.unwrap().is_none());
    assert!(h.catalog.get_delta_link("drive-1").await.unwrap().is_none());
    assert_eq!(h.provider.download_count(), 0);
}

#[tokio::test]
async fn test_dry_run_previews_modifications_and_removals() {
    let h = harness().await;
    script_cold_start(&h.provider);
    let config = Config::default();
    h.engine(&config).run(RunOptions::default()).await.unwrap();

    let new_b = vec![b'B'; 250];
    h.provider.script_page(
        "drive-1",
        Some("c1"),
        page(
            vec![
                file_change("item-b", "B.docx", &new_b),
                deleted_change("item-c", "C.txt"),
            ],
            "c2",
        ),
    );

    let report = h
        .engine(&config)
        .run(RunOptions {
            dry_run: true,
            ..RunOptions::default()
        })
        .await
        .unwrap();

    assert_eq!(report.counters.modified, 1);
    assert_eq!(report.counters.removed, 1);
    let kinds: Vec<EventType> = report.preview.iter().map(|p| p.event_type).collect();
    assert_eq!(
        kinds,
        vec![EventType::ModifyRemove, EventType::ModifyAdd, EventType::Remove]
    );

    // The cursor did not move and the mirror is untouched.
    assert_eq!(
        h.catalog.get_delta_link("drive-1").await.unwrap().as_deref(),
        Some("c1")
    );
    assert_eq!(h.catalog.counts().await.unwrap().documents, 3);
}

// ============================================================================
// Failure policy
// ============================================================================

#[tokio::test]
async fn test_second_concurrent_run_is_rejected() {
    let h = harness().await;
    script_cold_start(&h.provider);
    let config = Config::default();

    let _held = h.catalog.start_run(false).await.unwrap();
    let err = h.engine(&config).run(RunOptions::default()).await.unwrap_err();
    assert!(matches!(err, SyncError::AlreadyRunning));
}

#[tokio::test]
async fn test_fatal_error_finalizes_run_and_keeps_cursor() {
    let h = harness().await;
    script_cold_start(&h.provider);
    let config = Config::default();
    h.engine(&config).run(RunOptions::default()).await.unwrap();

    // No page scripted for cursor c1: the provider fails like an exhausted
    // retry loop would.
    let err = h.engine(&config).run(RunOptions::default()).await.unwrap_err();
    assert!(matches!(err, SyncError::TransientNetwork { .. }));

    let last = h.catalog.last_run().await.unwrap().unwrap();
    assert_eq!(last.status, RunStatus::Failed);
    assert!(last.error_message.unwrap().contains("network error"));

    // Cursor still points at the last committed page; the latch is free.
    assert_eq!(
        h.catalog.get_delta_link("drive-1").await.unwrap().as_deref(),
        Some("c1")
    );
    assert!(h.catalog.start_run(false).await.is_ok());
}

#[tokio::test]
async fn test_cancellation_finalizes_run_as_failed() {
    let h = harness().await;
    script_cold_start(&h.provider);
    let config = Config::default();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let engine = h.engine(&config).with_cancellation(cancel);

    let err = engine.run(RunOptions::default()).await.unwrap_err();
    assert!(matches!(err, SyncError::Cancelled));

    let last = h.catalog.last_run().await.unwrap().unwrap();
    assert_eq!(last.status, RunStatus::Failed);
    assert_eq!(last.error_message.as_deref(), Some("cancelled"));
    assert!(h.catalog.get_delta_link("drive-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_missing_item_mid_sync_is_skipped() {
    let h = harness().await;
    script_cold_start(&h.provider);
    // C's content disappears between the delta page and the download.
    h.provider.script_missing_content("item-c");

    let config = Config::default();
    let report = h.engine(&config).run(RunOptions::default()).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.counters.added, 2);
    assert_eq!(report.counters.skipped, 1);
    assert!(h.catalog.get_document("item-c", "drive-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_quickxor_mismatch_discards_download() {
    let h = harness().await;
    let mut change = file_change("item-x", "x.bin", b"actual bytes");
    change.sha256 = None;
    change.quick_xor_hash = Some("AAAAAAAAAAAAAAAAAAAAAAAAAAA=".to_string());
    h.provider.script_page("drive-1", None, page(vec![change], "c1"));
    h.provider.script_content("item-x", b"actual bytes");

    let mut config = Config::default();
    config.sync.verify_quickxor_hash = true;
    let report = h.engine(&config).run(RunOptions::default()).await.unwrap();

    assert_eq!(report.counters.skipped, 1);
    assert_eq!(report.counters.added, 0);
    assert_eq!(h.catalog.counts().await.unwrap().blobs, 0);
    assert!(h.catalog.get_document("item-x", "drive-1").await.unwrap().is_none());
    // The discarded temp file left nothing behind.
    assert!(h
        .catalog
        .get_blob_by_sha256(&sha_hex(b"actual bytes"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_quickxor_verification_accepts_matching_hash() {
    let h = harness().await;
    let payload = b"verified payload";
    let mut change = file_change("item-v", "v.bin", payload);
    change.sha256 = None;
    h.provider.script_page("drive-1", None, page(vec![change], "c1"));
    h.provider.script_content("item-v", payload);

    let mut config = Config::default();
    config.sync.verify_quickxor_hash = true;
    let report = h.engine(&config).run(RunOptions::default()).await.unwrap();

    assert_eq!(report.counters.added, 1);
    assert_eq!(report.counters.skipped, 0);
}

#[tokio::test]
async fn test_missing_server_hash_is_accepted_with_verification_on() {
    let h = harness().await;
    let payload = b"no hash from server";
    let mut change = file_change("item-n", "n.bin", payload);
    change.sha256 = None;
    change.quick_xor_hash = None;
    h.provider.script_page("drive-1", None, page(vec![change], "c1"));
    h.provider.script_content("item-n", payload);

    let mut config = Config::default();
    config.sync.verify_quickxor_hash = true;
    let report = h.engine(&config).run(RunOptions::default()).await.unwrap();

    // Cannot verify → accept, do not reject.
    assert_eq!(report.counters.added, 1);
    assert_eq!(report.counters.skipped, 0);
}

// ============================================================================
// Modes and pagination
// ============================================================================

#[tokio::test]
async fn test_metadata_only_mode_stores_no_blobs() {
    let h = harness().await;
    script_cold_start(&h.provider);

    let mut config = Config::default();
    config.sync.metadata_only = true;
    let report = h.engine(&config).run(RunOptions::default()).await.unwrap();

    assert_eq!(report.counters.added, 3);
    assert_eq!(report.counters.bytes_downloaded, 0);
    assert_eq!(h.provider.download_count(), 0);

    let counts = h.catalog.counts().await.unwrap();
    assert_eq!(counts.documents, 3);
    assert_eq!(counts.blobs, 0);
    let docs = h.catalog.list_documents(None, None, false).await.unwrap();
    assert!(docs.iter().all(|d| d.blob_id.is_none()));
}

#[tokio::test]
async fn test_multi_page_delta_is_applied_in_order() {
    let h = harness().await;
    h.provider.script_page(
        "drive-1",
        None,
        DeltaPage {
            items: vec![file_change("item-a", "A.pdf", A_BYTES)],
            next_link: Some("page-2".to_string()),
            delta_link: None,
        },
    );
    h.provider.script_page(
        "drive-1",
        Some("page-2"),
        page(vec![file_change("item-b", "B.docx", B_BYTES)], "done"),
    );
    h.provider.script_content("item-a", A_BYTES);
    h.provider.script_content("item-b", B_BYTES);

    let config = Config::default();
    let report = h.engine(&config).run(RunOptions::default()).await.unwrap();

    assert_eq!(report.counters.added, 2);
    assert_eq!(
        h.catalog.get_delta_link("drive-1").await.unwrap().as_deref(),
        Some("done")
    );

    let events = h.catalog.list_events(report.run_id.unwrap()).await.unwrap();
    assert_eq!(events[0].snapshot.name, "A.pdf");
    assert_eq!(events[1].snapshot.name, "B.docx");
}

#[tokio::test]
async fn test_duplicate_content_is_stored_once() {
    let h = harness().await;
    let same = b"identical bytes in two files";
    h.provider.script_page(
        "drive-1",
        None,
        page(
            vec![
                file_change("item-1", "one.bin", same),
                file_change("item-2", "two.bin", same),
            ],
            "c1",
        ),
    );
    h.provider.script_content("item-1", same);
    h.provider.script_content("item-2", same);

    let config = Config::default();
    let report = h.engine(&config).run(RunOptions::default()).await.unwrap();

    assert_eq!(report.counters.added, 2);
    // Second download deduplicated: one blob row, refcount 2, bytes counted once.
    assert_eq!(report.counters.bytes_downloaded, same.len() as u64);
    let blob = h.catalog.get_blob_by_sha256(&sha_hex(same)).await.unwrap().unwrap();
    assert_eq!(blob.refcount, 2);
    assert_eq!(h.catalog.counts().await.unwrap().blobs, 1);
}

#[tokio::test]
async fn test_folders_are_ignored() {
    let h = harness().await;
    let folder = RemoteChange {
        item_id: "folder-1".to_string(),
        name: "Reports".to_string(),
        path: Some("/Reports".to_string()),
        is_folder: true,
        ..RemoteChange::default()
    };
    h.provider.script_page("drive-1", None, page(vec![folder], "c1"));

    let config = Config::default();
    let report = h.engine(&config).run(RunOptions::default()).await.unwrap();

    assert_eq!(report.counters.total_seen(), 0);
    assert_eq!(h.catalog.counts().await.unwrap().documents, 0);
}
