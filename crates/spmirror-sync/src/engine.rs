//! The sync run state machine
//!
//! ```text
//! idle → acquire_latch → enumerate_drives → per drive: delta_loop → finalize → idle
//!                   │                                        │
//!                   └──→ fail (latch held)                   └──→ fail (unrecoverable)
//! ```
//!
//! Within a drive the order of delta entries is preserved end to end, from
//! the Graph page through catalog mutation through the event log. The engine
//! is the only component that advances delta cursors, and it only does so
//! when a terminal `deltaLink` arrives; a failed or cancelled run therefore
//! resumes from the last committed point.
//!
//! ## Failure policy
//!
//! Fatal errors (auth, retry exhaustion, disk, catalog) finalize the run as
//! `failed` with the error message and leave cursors unadvanced. Per-item
//! errors (hash mismatch, item deleted mid-sync) are logged, evented where a
//! document exists, counted as `skipped`, and the run goes on.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use spmirror_blob::{BlobStore, StagedBlob};
use spmirror_catalog::Catalog;
use spmirror_core::config::Config;
use spmirror_core::domain::{
    Document, DocumentMeta, EventSnapshot, EventType, FileBlob, RunCounters, RunStatus,
    UpsertAction,
};
use spmirror_core::filter::{FilterDecision, SyncFilter};
use spmirror_core::ports::{DriveInfo, ICloudProvider, RemoteChange};
use spmirror_core::SyncError;

// ============================================================================
// Run options and report
// ============================================================================

/// Per-invocation options for [`SyncEngine::run`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Ignore stored delta cursors and re-enumerate every drive.
    ///
    /// The stored cursor is not cleared up front; it is replaced when the
    /// run commits, so a crashed full run still resumes incrementally.
    pub full: bool,
    /// Traverse and evaluate without mutating the catalog or blob store.
    pub dry_run: bool,
    /// Restrict the run to one document library by display name.
    pub library: Option<String>,
}

/// An event the orchestrator would have logged, reported by dry runs.
#[derive(Debug, Clone)]
pub struct EventPreview {
    pub event_type: EventType,
    pub snapshot: EventSnapshot,
}

/// Summary of a completed (or dry) run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Catalog run id; `None` for dry runs, which write nothing
    pub run_id: Option<i64>,
    pub status: RunStatus,
    pub counters: RunCounters,
    pub dry_run: bool,
    /// Events a dry run would have logged, in order
    pub preview: Vec<EventPreview>,
}

/// Transient per-run state.
struct RunContext {
    run_id: Option<i64>,
    dry: bool,
    counters: RunCounters,
    preview: Vec<EventPreview>,
}

impl RunContext {
    fn preview_event(&mut self, event_type: EventType, snapshot: EventSnapshot) {
        self.preview.push(EventPreview {
            event_type,
            snapshot,
        });
    }
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Top-level state machine coordinating one sync run.
pub struct SyncEngine {
    provider: Arc<dyn ICloudProvider>,
    catalog: Arc<Catalog>,
    blobs: Arc<BlobStore>,
    filter: SyncFilter,
    metadata_only: bool,
    verify_quickxor: bool,
    cancel: CancellationToken,
}

impl SyncEngine {
    /// Creates an engine over its collaborators.
    ///
    /// # Errors
    ///
    /// `SyncError::Config` when the filter patterns do not compile.
    pub fn new(
        provider: Arc<dyn ICloudProvider>,
        catalog: Arc<Catalog>,
        blobs: Arc<BlobStore>,
        config: &Config,
    ) -> Result<Self, SyncError> {
        Ok(Self {
            provider,
            catalog,
            blobs,
            filter: SyncFilter::from_config(&config.sync)?,
            metadata_only: config.sync.metadata_only,
            verify_quickxor: config.sync.verify_quickxor_hash,
            cancel: CancellationToken::new(),
        })
    }

    /// Attaches a cancellation token observed between pages and entries.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Executes one run end to end.
    ///
    /// Real runs acquire the catalog latch first and always finalize the run
    /// row, also on failure. Dry runs skip the latch and mutate nothing.
    pub async fn run(&self, opts: RunOptions) -> Result<RunReport, SyncError> {
        if opts.dry_run {
            let mut ctx = RunContext {
                run_id: None,
                dry: true,
                counters: RunCounters::default(),
                preview: Vec::new(),
            };
            info!(full = opts.full, "starting dry run");
            self.execute(&mut ctx, &opts).await?;
            return Ok(RunReport {
                run_id: None,
                status: RunStatus::Completed,
                counters: ctx.counters,
                dry_run: true,
                preview: ctx.preview,
            });
        }

        let run_id = self.catalog.start_run(opts.full).await?;
        info!(run_id, full = opts.full, "sync run started");

        let mut ctx = RunContext {
            run_id: Some(run_id),
            dry: false,
            counters: RunCounters::default(),
            preview: Vec::new(),
        };

        match self.execute(&mut ctx, &opts).await {
            Ok(()) => {
                self.catalog.finish_run(run_id, &ctx.counters, None).await?;
                info!(
                    run_id,
                    added = ctx.counters.added,
                    modified = ctx.counters.modified,
                    removed = ctx.counters.removed,
                    unchanged = ctx.counters.unchanged,
                    skipped = ctx.counters.skipped,
                    bytes = ctx.counters.bytes_downloaded,
                    "sync run completed"
                );
                Ok(RunReport {
                    run_id: Some(run_id),
                    status: RunStatus::Completed,
                    counters: ctx.counters,
                    dry_run: false,
                    preview: Vec::new(),
                })
            }
            Err(err) => {
                let message = err.to_string();
                warn!(run_id, error = %message, "sync run failed");
                if let Err(finish_err) = self
                    .catalog
                    .finish_run(run_id, &ctx.counters, Some(&message))
                    .await
                {
                    warn!(run_id, error = %finish_err, "failed to finalize failed run");
                }
                Err(err)
            }
        }
    }

    /// Enumerates drives and runs the delta loop for each, sequentially.
    async fn execute(&self, ctx: &mut RunContext, opts: &RunOptions) -> Result<(), SyncError> {
        let site = self.provider.resolve_site().await?;
        let drives = self
            .provider
            .list_drives(&site.id, opts.library.as_deref())
            .await?;
        info!(site_id = %site.id, drives = drives.len(), "drives enumerated");

        for drive in &drives {
            if !ctx.dry {
                self.catalog
                    .upsert_drive(&drive.id, &drive.name, drive.web_url.as_deref())
                    .await?;
            }
            self.sync_drive(ctx, drive, opts.full).await?;
        }
        Ok(())
    }

    /// Pulls delta pages for one drive until a terminal `deltaLink` arrives.
    async fn sync_drive(
        &self,
        ctx: &mut RunContext,
        drive: &DriveInfo,
        full: bool,
    ) -> Result<(), SyncError> {
        let mut link = if full {
            None
        } else {
            self.catalog.get_delta_link(&drive.id).await?
        };
        debug!(drive_id = %drive.id, resuming = link.is_some(), "starting delta loop");

        let mut pages: u32 = 0;
        loop {
            self.check_cancelled()?;

            let page = self.provider.delta_page(&drive.id, link.as_deref()).await?;
            pages += 1;
            debug!(
                drive_id = %drive.id,
                page = pages,
                items = page.items.len(),
                "delta page received"
            );

            for change in &page.items {
                self.check_cancelled()?;
                self.apply_change(ctx, &drive.id, change).await?;
            }

            if let Some(run_id) = ctx.run_id {
                self.catalog
                    .update_run_counters(run_id, &ctx.counters)
                    .await?;
            }

            if let Some(next) = page.next_link {
                link = Some(next);
                continue;
            }
            match page.delta_link {
                Some(delta) => {
                    if !ctx.dry {
                        self.catalog.set_delta_link(&drive.id, &delta).await?;
                        debug!(drive_id = %drive.id, "delta cursor persisted");
                    }
                }
                None => warn!(
                    drive_id = %drive.id,
                    "terminal page carried no deltaLink; cursor not advanced"
                ),
            }
            break;
        }

        info!(drive_id = %drive.id, pages, "drive reconciled");
        Ok(())
    }

    /// Applies one change entry. Only fatal errors propagate.
    async fn apply_change(
        &self,
        ctx: &mut RunContext,
        drive_id: &str,
        change: &RemoteChange,
    ) -> Result<(), SyncError> {
        if change.is_folder {
            return Ok(());
        }
        if change.is_deleted {
            return self.retract(ctx, drive_id, &change.item_id).await;
        }

        let path = change
            .path
            .clone()
            .unwrap_or_else(|| format!("/{}", change.name));
        let size = change.size.unwrap_or(0);

        match self.filter.evaluate(&path, &change.name, size) {
            FilterDecision::Reject(reason) => {
                let existing = self.catalog.get_document(&change.item_id, drive_id).await?;
                if existing.map(|d| !d.is_deleted).unwrap_or(false) {
                    debug!(
                        path,
                        reason = reason.as_str(),
                        "filter retracts previously mirrored item"
                    );
                    self.retract(ctx, drive_id, &change.item_id).await
                } else {
                    debug!(path, reason = reason.as_str(), "item skipped by filter");
                    ctx.counters.skipped += 1;
                    Ok(())
                }
            }
            FilterDecision::Accept => self.apply_upsert(ctx, drive_id, change, path, size).await,
        }
    }

    /// Soft-deletes a mirrored item: remote deletion or filter retraction.
    /// Unknown and already-deleted items are silently ignored.
    async fn retract(
        &self,
        ctx: &mut RunContext,
        drive_id: &str,
        item_id: &str,
    ) -> Result<(), SyncError> {
        if ctx.dry {
            if let Some(doc) = self.catalog.get_document(item_id, drive_id).await? {
                if !doc.is_deleted {
                    ctx.counters.removed += 1;
                    ctx.preview_event(EventType::Remove, snapshot_of_document(&doc));
                }
            }
            return Ok(());
        }

        match self.catalog.soft_delete(item_id, drive_id).await? {
            Some(outcome) => {
                if let Some(run_id) = ctx.run_id {
                    self.catalog
                        .log_event(
                            run_id,
                            Some(outcome.document.id),
                            EventType::Remove,
                            &snapshot_of_document(&outcome.document),
                        )
                        .await?;
                }
                if let Some(released) = &outcome.released {
                    if released.is_orphaned() {
                        self.blobs.delete(&released.sha256).await?;
                    }
                }
                ctx.counters.removed += 1;
                debug!(item_id, drive_id, "document removed");
            }
            None => debug!(item_id, drive_id, "deletion for unknown item ignored"),
        }
        Ok(())
    }

    /// Handles an accepted upsert: metadata-only, blob reuse, or download.
    async fn apply_upsert(
        &self,
        ctx: &mut RunContext,
        drive_id: &str,
        change: &RemoteChange,
        path: String,
        size: u64,
    ) -> Result<(), SyncError> {
        let meta = DocumentMeta {
            name: change.name.clone(),
            path: path.clone(),
            mime: change.mime.clone(),
            size: size as i64,
            web_url: change.web_url.clone(),
            created_by: change.created_by.clone(),
            last_modified_by: change.last_modified_by.clone(),
            remote_created_at: change.created,
            remote_modified_at: change.modified,
        };
        let existing = self.catalog.get_document(&change.item_id, drive_id).await?;

        if self.metadata_only {
            return self
                .upsert_metadata_only(ctx, drive_id, change, &meta, existing.as_ref())
                .await;
        }

        // Reuse the current blob when the server-advertised hash and size
        // match what the mirror already holds; no download needed.
        if let Some(doc) = existing.as_ref().filter(|d| !d.is_deleted) {
            if let Some(blob_id) = doc.blob_id {
                if let Some(blob) = self.catalog.get_blob(blob_id).await? {
                    if blob_matches_server(&blob, change, size) {
                        if !ctx.dry {
                            let outcome = self
                                .catalog
                                .upsert_document(&change.item_id, drive_id, &meta, Some(blob_id))
                                .await?;
                            debug!(
                                path,
                                action = ?outcome.action,
                                "server hash matches stored blob, no download"
                            );
                        }
                        ctx.counters.unchanged += 1;
                        return Ok(());
                    }
                }
            }
        }

        if ctx.dry {
            let old_blob = existing
                .as_ref()
                .filter(|d| !d.is_deleted)
                .and_then(|d| d.blob_id);
            match (old_blob, existing.as_ref()) {
                (Some(_), Some(doc)) => {
                    ctx.counters.modified += 1;
                    ctx.preview_event(EventType::ModifyRemove, snapshot_of_document(doc));
                    ctx.preview_event(EventType::ModifyAdd, snapshot_of_change(change, &path, None));
                }
                _ => {
                    ctx.counters.added += 1;
                    ctx.preview_event(EventType::Add, snapshot_of_change(change, &path, None));
                }
            }
            ctx.counters.bytes_downloaded += size;
            return Ok(());
        }

        let staged = match self
            .download_to_store(ctx, drive_id, change, existing.as_ref(), size)
            .await?
        {
            Some(staged) => staged,
            None => return Ok(()), // per-item failure already recorded
        };

        if self.verify_quickxor {
            match change.quick_xor_hash.as_deref() {
                Some(server_qx) if server_qx != staged.quick_xor_base64() => {
                    let actual = staged.quick_xor_base64().to_string();
                    staged.discard().await?;
                    warn!(
                        item = %change.name,
                        expected = server_qx,
                        actual = %actual,
                        "QuickXorHash mismatch, download discarded"
                    );
                    self.record_item_failure(ctx, existing.as_ref(), change, &path, size)
                        .await?;
                    return Ok(());
                }
                Some(_) => {}
                None => warn!(
                    item = %change.name,
                    "server provided no QuickXorHash; accepting download unverified"
                ),
            }
        }

        let quick_xor = staged.quick_xor_base64().to_string();
        let put = staged.commit().await?;
        if put.newly_written {
            ctx.counters.bytes_downloaded += put.size;
        }

        let blob_id = self
            .catalog
            .acquire_blob(&put.sha256, put.size as i64, Some(&put.mime), Some(&quick_xor))
            .await?;
        let outcome = self
            .catalog
            .upsert_document(&change.item_id, drive_id, &meta, Some(blob_id))
            .await?;

        let Some(run_id) = ctx.run_id else {
            return Ok(());
        };
        let new_snapshot = snapshot_of_change(change, &path, Some(blob_id));
        let old_live = existing.as_ref().filter(|d| !d.is_deleted);

        match outcome.action {
            UpsertAction::Inserted => {
                self.catalog
                    .log_event(run_id, Some(outcome.document.id), EventType::Add, &new_snapshot)
                    .await?;
                ctx.counters.added += 1;
                debug!(path, "document added");
            }
            UpsertAction::UpdatedContent => match old_live.filter(|d| d.blob_id.is_some()) {
                Some(old_doc) => {
                    self.catalog
                        .log_event(
                            run_id,
                            Some(outcome.document.id),
                            EventType::ModifyRemove,
                            &snapshot_of_document(old_doc),
                        )
                        .await?;
                    self.catalog
                        .log_event(
                            run_id,
                            Some(outcome.document.id),
                            EventType::ModifyAdd,
                            &new_snapshot,
                        )
                        .await?;
                    ctx.counters.modified += 1;
                    debug!(path, "document content updated");
                }
                None => {
                    // Revival of a deleted row, or a placeholder gaining
                    // content for the first time.
                    self.catalog
                        .log_event(run_id, Some(outcome.document.id), EventType::Add, &new_snapshot)
                        .await?;
                    ctx.counters.added += 1;
                    debug!(path, "document re-added");
                }
            },
            UpsertAction::UpdatedMetadata | UpsertAction::Unchanged => {
                ctx.counters.unchanged += 1;
            }
        }

        if let Some(released) = &outcome.released {
            if released.is_orphaned() {
                self.blobs.delete(&released.sha256).await?;
            }
        }
        Ok(())
    }

    /// Metadata-only mode: the document row carries no blob.
    async fn upsert_metadata_only(
        &self,
        ctx: &mut RunContext,
        drive_id: &str,
        change: &RemoteChange,
        meta: &DocumentMeta,
        existing: Option<&Document>,
    ) -> Result<(), SyncError> {
        let path = meta.path.clone();
        if ctx.dry {
            match existing {
                Some(doc) if !doc.is_deleted => ctx.counters.unchanged += 1,
                _ => {
                    ctx.counters.added += 1;
                    ctx.preview_event(EventType::Add, snapshot_of_change(change, &path, None));
                }
            }
            return Ok(());
        }

        let outcome = self
            .catalog
            .upsert_document(&change.item_id, drive_id, meta, None)
            .await?;

        match outcome.action {
            UpsertAction::Inserted => {
                if let Some(run_id) = ctx.run_id {
                    self.catalog
                        .log_event(
                            run_id,
                            Some(outcome.document.id),
                            EventType::Add,
                            &snapshot_of_change(change, &path, None),
                        )
                        .await?;
                }
                ctx.counters.added += 1;
            }
            _ => ctx.counters.unchanged += 1,
        }

        // A previously mirrored body is dropped when the mode changed.
        if let Some(released) = &outcome.released {
            if released.is_orphaned() {
                self.blobs.delete(&released.sha256).await?;
            }
        }
        Ok(())
    }

    /// Streams the item's content into the blob store.
    ///
    /// Returns `None` when a per-item error was recorded (item skipped);
    /// fatal errors propagate.
    async fn download_to_store(
        &self,
        ctx: &mut RunContext,
        drive_id: &str,
        change: &RemoteChange,
        existing: Option<&Document>,
        size: u64,
    ) -> Result<Option<StagedBlob>, SyncError> {
        let path = change.path.as_deref().unwrap_or("");
        let mut stream = match self.provider.download(drive_id, &change.item_id).await {
            Ok(stream) => stream,
            Err(e) if e.is_per_item() => {
                warn!(item = %change.name, error = %e, "download failed, item skipped");
                self.record_item_failure(ctx, existing, change, path, size)
                    .await?;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let mut writer = self.blobs.writer().await?;
        loop {
            match stream.next_chunk().await {
                Ok(Some(chunk)) => writer.write_chunk(&chunk).await?,
                Ok(None) => break,
                Err(e) if e.is_per_item() => {
                    writer.abort().await;
                    warn!(item = %change.name, error = %e, "download interrupted, item skipped");
                    self.record_item_failure(ctx, existing, change, path, size)
                        .await?;
                    return Ok(None);
                }
                Err(e) => {
                    writer.abort().await;
                    return Err(e);
                }
            }
        }

        Ok(Some(writer.finish(change.mime.as_deref()).await?))
    }

    /// Counts a per-item failure as skipped and events it when the item is
    /// already mirrored.
    async fn record_item_failure(
        &self,
        ctx: &mut RunContext,
        existing: Option<&Document>,
        change: &RemoteChange,
        path: &str,
        size: u64,
    ) -> Result<(), SyncError> {
        ctx.counters.skipped += 1;
        if let (Some(run_id), Some(doc)) = (ctx.run_id, existing.filter(|d| !d.is_deleted)) {
            self.catalog
                .log_event(
                    run_id,
                    Some(doc.id),
                    EventType::Failed,
                    &snapshot_of_change(change, path, None),
                )
                .await?;
        }
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), SyncError> {
        if self.cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Whether the server-advertised identity matches a stored blob, allowing
/// the download to be skipped.
fn blob_matches_server(blob: &FileBlob, change: &RemoteChange, size: u64) -> bool {
    if blob.size != size as i64 {
        return false;
    }
    match (&change.sha256, &change.quick_xor_hash) {
        (Some(sha), _) => *sha == blob.sha256,
        (None, Some(qx)) => blob.quick_xor_hash.as_deref() == Some(qx.as_str()),
        (None, None) => false,
    }
}

fn snapshot_of_document(doc: &Document) -> EventSnapshot {
    EventSnapshot {
        item_id: doc.item_id.clone(),
        name: doc.name.clone(),
        path: doc.path.clone(),
        size: doc.size,
        blob_id: doc.blob_id,
    }
}

fn snapshot_of_change(change: &RemoteChange, path: &str, blob_id: Option<i64>) -> EventSnapshot {
    EventSnapshot {
        item_id: change.item_id.clone(),
        name: change.name.clone(),
        path: path.to_string(),
        size: change.size.unwrap_or(0) as i64,
        blob_id,
    }
}
