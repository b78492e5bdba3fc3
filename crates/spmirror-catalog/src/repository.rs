//! Catalog operations over the SQLite schema
//!
//! All multi-row mutations (blob swaps, soft deletes, run boundaries) run
//! inside a single transaction. The catalog is the sole writer of every
//! table; concurrent readers are served through the WAL.
//!
//! ## Type Mapping
//!
//! | Domain Type        | SQL Type | Strategy                                  |
//! |--------------------|----------|-------------------------------------------|
//! | i64 ids            | INTEGER  | `AUTOINCREMENT` rowids                    |
//! | DateTime<Utc>      | TEXT     | RFC 3339 via `to_rfc3339()` / parse       |
//! | RunStatus          | TEXT     | `as_str()` / `parse()`                    |
//! | EventType          | TEXT     | `as_str()` / `parse()`                    |
//! | bool flags         | INTEGER  | 0 / 1                                     |

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use spmirror_core::domain::{
    Document, DocumentMeta, Drive, EventSnapshot, EventType, FileBlob, ReleasedBlob, RunCounters,
    RunStatus, SyncEvent, SyncRun, UpsertAction,
};

use crate::CatalogError;

/// The `app_settings` key guarding mutual exclusion of runs.
const SYNC_LATCH_KEY: &str = "sync_in_progress";

/// Result of [`Catalog::upsert_document`].
#[derive(Debug)]
pub struct UpsertOutcome {
    /// The row as it stands after the upsert
    pub document: Document,
    pub action: UpsertAction,
    /// Old blob released by a content swap, for file GC when orphaned
    pub released: Option<ReleasedBlob>,
}

/// Result of [`Catalog::soft_delete`].
#[derive(Debug)]
pub struct RemoveOutcome {
    /// The row as it stood before the delete
    pub document: Document,
    /// Blob released by the delete, for file GC when orphaned
    pub released: Option<ReleasedBlob>,
}

/// Aggregate mirror counts for the status surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogCounts {
    /// Live (non-deleted) documents
    pub documents: i64,
    /// Blob rows
    pub blobs: i64,
    /// Total blob bytes
    pub bytes: i64,
}

/// Single-writer transactional store over the catalog schema.
pub struct Catalog {
    pool: SqlitePool,
}

impl Catalog {
    /// Creates a new catalog over the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Inserts or updates the document identified by `(item_id, drive_id)`.
    ///
    /// Classification:
    /// - `Inserted` when no row existed
    /// - `UpdatedContent` when `blob_id` changed (the old blob's refcount is
    ///   decremented in the same transaction and reported via `released`)
    /// - `UpdatedMetadata` when any other field changed or the row was
    ///   soft-deleted and is being revived
    /// - `Unchanged` when every field matched and the row was live; only
    ///   `synced_at` is refreshed
    pub async fn upsert_document(
        &self,
        item_id: &str,
        drive_id: &str,
        meta: &DocumentMeta,
        blob_id: Option<i64>,
    ) -> Result<UpsertOutcome, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let existing = sqlx::query(
            "SELECT * FROM documents WHERE item_id = ?1 AND drive_id = ?2",
        )
        .bind(item_id)
        .bind(drive_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(|row| document_from_row(&row))
        .transpose()?;

        let (action, released, document_id) = match existing {
            None => {
                let result = sqlx::query(
                    "INSERT INTO documents (item_id, drive_id, name, path, mime, size, web_url,
                        created_by, last_modified_by, remote_created_at, remote_modified_at,
                        blob_id, is_deleted, synced_at, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0, ?13, ?13, ?13)",
                )
                .bind(item_id)
                .bind(drive_id)
                .bind(&meta.name)
                .bind(&meta.path)
                .bind(&meta.mime)
                .bind(meta.size)
                .bind(&meta.web_url)
                .bind(&meta.created_by)
                .bind(&meta.last_modified_by)
                .bind(meta.remote_created_at.map(|t| t.to_rfc3339()))
                .bind(meta.remote_modified_at.map(|t| t.to_rfc3339()))
                .bind(blob_id)
                .bind(now.to_rfc3339())
                .execute(&mut *tx)
                .await?;
                (UpsertAction::Inserted, None, result.last_insert_rowid())
            }
            Some(doc) => {
                let blob_changed = doc.blob_id != blob_id;
                let action = if blob_changed {
                    UpsertAction::UpdatedContent
                } else if doc.is_deleted || doc.metadata_differs(meta) {
                    UpsertAction::UpdatedMetadata
                } else {
                    UpsertAction::Unchanged
                };

                let mut released = None;
                if blob_changed {
                    if let Some(old_blob) = doc.blob_id {
                        released = Some(release_blob_tx(&mut tx, old_blob).await?);
                    }
                }

                if action == UpsertAction::Unchanged {
                    sqlx::query("UPDATE documents SET synced_at = ?2 WHERE id = ?1")
                        .bind(doc.id)
                        .bind(now.to_rfc3339())
                        .execute(&mut *tx)
                        .await?;
                } else {
                    sqlx::query(
                        "UPDATE documents SET name = ?2, path = ?3, mime = ?4, size = ?5,
                            web_url = ?6, created_by = ?7, last_modified_by = ?8,
                            remote_created_at = ?9, remote_modified_at = ?10, blob_id = ?11,
                            is_deleted = 0, synced_at = ?12, updated_at = ?12
                         WHERE id = ?1",
                    )
                    .bind(doc.id)
                    .bind(&meta.name)
                    .bind(&meta.path)
                    .bind(&meta.mime)
                    .bind(meta.size)
                    .bind(&meta.web_url)
                    .bind(&meta.created_by)
                    .bind(&meta.last_modified_by)
                    .bind(meta.remote_created_at.map(|t| t.to_rfc3339()))
                    .bind(meta.remote_modified_at.map(|t| t.to_rfc3339()))
                    .bind(blob_id)
                    .bind(now.to_rfc3339())
                    .execute(&mut *tx)
                    .await?;
                }

                (action, released, doc.id)
            }
        };

        let document = sqlx::query("SELECT * FROM documents WHERE id = ?1")
            .bind(document_id)
            .fetch_one(&mut *tx)
            .await
            .map(|row| document_from_row(&row))??;

        tx.commit().await?;

        debug!(
            item_id,
            drive_id,
            action = ?action,
            "document upserted"
        );

        Ok(UpsertOutcome {
            document,
            action,
            released,
        })
    }

    /// Soft-deletes the document identified by `(item_id, drive_id)`.
    ///
    /// Returns `None` when the document is unknown or already deleted (the
    /// orchestrator silently ignores those). The released blob's refcount is
    /// decremented inside the same transaction.
    pub async fn soft_delete(
        &self,
        item_id: &str,
        drive_id: &str,
    ) -> Result<Option<RemoveOutcome>, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let existing = sqlx::query(
            "SELECT * FROM documents WHERE item_id = ?1 AND drive_id = ?2",
        )
        .bind(item_id)
        .bind(drive_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(|row| document_from_row(&row))
        .transpose()?;

        let doc = match existing {
            Some(doc) if !doc.is_deleted => doc,
            _ => return Ok(None),
        };

        let released = match doc.blob_id {
            Some(blob_id) => Some(release_blob_tx(&mut tx, blob_id).await?),
            None => None,
        };

        sqlx::query(
            "UPDATE documents SET is_deleted = 1, blob_id = NULL, synced_at = ?2, updated_at = ?2
             WHERE id = ?1",
        )
        .bind(doc.id)
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(item_id, drive_id, "document soft-deleted");

        Ok(Some(RemoveOutcome {
            document: doc,
            released,
        }))
    }

    /// Fetches a document by its remote identity.
    pub async fn get_document(
        &self,
        item_id: &str,
        drive_id: &str,
    ) -> Result<Option<Document>, CatalogError> {
        sqlx::query("SELECT * FROM documents WHERE item_id = ?1 AND drive_id = ?2")
            .bind(item_id)
            .bind(drive_id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| document_from_row(&row))
            .transpose()
    }

    /// Lists documents, optionally restricted by a full-text search over
    /// name and path.
    pub async fn list_documents(
        &self,
        search: Option<&str>,
        limit: Option<i64>,
        include_deleted: bool,
    ) -> Result<Vec<Document>, CatalogError> {
        let limit = limit.unwrap_or(i64::MAX);
        let rows = match search {
            Some(term) if !term.trim().is_empty() => {
                sqlx::query(
                    "SELECT * FROM documents
                     WHERE id IN (SELECT rowid FROM documents_fts WHERE documents_fts MATCH ?1)
                       AND (is_deleted = 0 OR ?2)
                     ORDER BY path LIMIT ?3",
                )
                .bind(fts_quote(term))
                .bind(include_deleted)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            _ => {
                sqlx::query(
                    "SELECT * FROM documents WHERE (is_deleted = 0 OR ?1)
                     ORDER BY path LIMIT ?2",
                )
                .bind(include_deleted)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.iter().map(document_from_row).collect()
    }

    /// Live documents referencing the given blob. Used by invariant checks.
    pub async fn documents_for_blob(&self, blob_id: i64) -> Result<Vec<Document>, CatalogError> {
        sqlx::query("SELECT * FROM documents WHERE blob_id = ?1 AND is_deleted = 0")
            .bind(blob_id)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(document_from_row)
            .collect()
    }

    // ========================================================================
    // Blobs
    // ========================================================================

    /// Inserts a blob row with refcount 1, or increments the refcount of the
    /// existing row for the same hash. Returns the blob id.
    pub async fn acquire_blob(
        &self,
        sha256: &str,
        size: i64,
        mime: Option<&str>,
        quick_xor_hash: Option<&str>,
    ) -> Result<i64, CatalogError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT id FROM file_blobs WHERE sha256 = ?1")
            .bind(sha256)
            .fetch_optional(&mut *tx)
            .await?;

        let blob_id = match existing {
            Some(row) => {
                let id: i64 = row.get("id");
                sqlx::query("UPDATE file_blobs SET refcount = refcount + 1 WHERE id = ?1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                id
            }
            None => {
                let result = sqlx::query(
                    "INSERT INTO file_blobs (sha256, size, mime, quick_xor_hash, refcount, created_at)
                     VALUES (?1, ?2, ?3, ?4, 1, ?5)",
                )
                .bind(sha256)
                .bind(size)
                .bind(mime)
                .bind(quick_xor_hash)
                .bind(Utc::now().to_rfc3339())
                .execute(&mut *tx)
                .await?;
                result.last_insert_rowid()
            }
        };

        tx.commit().await?;
        Ok(blob_id)
    }

    /// Decrements a blob's refcount, removing the row when it reaches zero.
    ///
    /// The caller removes the file from the blob store when
    /// [`ReleasedBlob::is_orphaned`] is true.
    pub async fn release_blob(&self, blob_id: i64) -> Result<ReleasedBlob, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let released = release_blob_tx(&mut tx, blob_id).await?;
        tx.commit().await?;
        Ok(released)
    }

    pub async fn get_blob(&self, blob_id: i64) -> Result<Option<FileBlob>, CatalogError> {
        sqlx::query("SELECT * FROM file_blobs WHERE id = ?1")
            .bind(blob_id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| blob_from_row(&row))
            .transpose()
    }

    pub async fn get_blob_by_sha256(&self, sha256: &str) -> Result<Option<FileBlob>, CatalogError> {
        sqlx::query("SELECT * FROM file_blobs WHERE sha256 = ?1")
            .bind(sha256)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| blob_from_row(&row))
            .transpose()
    }

    /// All blob rows, for the verify-storage maintenance path.
    pub async fn list_blobs(&self) -> Result<Vec<FileBlob>, CatalogError> {
        sqlx::query("SELECT * FROM file_blobs ORDER BY id")
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(blob_from_row)
            .collect()
    }

    // ========================================================================
    // Drives and delta cursors
    // ========================================================================

    /// Records (or refreshes) a drive in the lookup table.
    pub async fn upsert_drive(
        &self,
        drive_id: &str,
        name: &str,
        web_url: Option<&str>,
    ) -> Result<(), CatalogError> {
        sqlx::query(
            "INSERT INTO drives (id, name, web_url, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, web_url = excluded.web_url,
                updated_at = excluded.updated_at",
        )
        .bind(drive_id)
        .bind(name)
        .bind(web_url)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_drives(&self) -> Result<Vec<Drive>, CatalogError> {
        sqlx::query("SELECT * FROM drives ORDER BY name")
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(drive_from_row)
            .collect()
    }

    pub async fn get_delta_link(&self, drive_id: &str) -> Result<Option<String>, CatalogError> {
        let link = sqlx::query_scalar::<_, String>(
            "SELECT delta_link FROM delta_cursors WHERE drive_id = ?1",
        )
        .bind(drive_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(link)
    }

    pub async fn set_delta_link(&self, drive_id: &str, link: &str) -> Result<(), CatalogError> {
        sqlx::query(
            "INSERT INTO delta_cursors (drive_id, delta_link, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(drive_id) DO UPDATE SET delta_link = excluded.delta_link,
                updated_at = excluded.updated_at",
        )
        .bind(drive_id)
        .bind(link)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Drops every stored cursor, forcing full enumeration on the next run.
    pub async fn clear_delta_links(&self) -> Result<u64, CatalogError> {
        let result = sqlx::query("DELETE FROM delta_cursors")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ========================================================================
    // Runs and the sync latch
    // ========================================================================

    /// Atomically acquires the `sync_in_progress` latch and inserts a
    /// `running` row.
    ///
    /// # Errors
    ///
    /// `CatalogError::AlreadyRunning` when the latch is held by a run that is
    /// still in `running` state. A latch left behind by a run that already
    /// finished is reclaimed.
    pub async fn start_run(&self, is_full: bool) -> Result<i64, CatalogError> {
        let mut tx = self.pool.begin().await?;

        let latch = sqlx::query_scalar::<_, String>(
            "SELECT value FROM app_settings WHERE key = ?1",
        )
        .bind(SYNC_LATCH_KEY)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(value) = latch {
            let holder: Option<String> = match value.parse::<i64>() {
                Ok(run_id) => sqlx::query_scalar::<_, String>(
                    "SELECT status FROM sync_runs WHERE id = ?1",
                )
                .bind(run_id)
                .fetch_optional(&mut *tx)
                .await?,
                Err(_) => None,
            };

            if holder.as_deref() == Some(RunStatus::Running.as_str()) {
                return Err(CatalogError::AlreadyRunning);
            }
            warn!(latch = %value, "reclaiming stale sync latch");
        }

        let result = sqlx::query(
            "INSERT INTO sync_runs (status, started_at, is_full) VALUES (?1, ?2, ?3)",
        )
        .bind(RunStatus::Running.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(is_full)
        .execute(&mut *tx)
        .await?;
        let run_id = result.last_insert_rowid();

        sqlx::query(
            "INSERT INTO app_settings (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                updated_at = excluded.updated_at",
        )
        .bind(SYNC_LATCH_KEY)
        .bind(run_id.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(run_id, is_full, "sync run started");
        Ok(run_id)
    }

    /// Finalizes a run and releases the latch in the same transaction.
    pub async fn finish_run(
        &self,
        run_id: i64,
        counters: &RunCounters,
        error: Option<&str>,
    ) -> Result<(), CatalogError> {
        let mut tx = self.pool.begin().await?;

        let status = if error.is_some() {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };

        let result = sqlx::query(
            "UPDATE sync_runs SET status = ?2, completed_at = ?3, added = ?4, modified = ?5,
                removed = ?6, unchanged = ?7, skipped = ?8, bytes_downloaded = ?9,
                error_message = ?10
             WHERE id = ?1",
        )
        .bind(run_id)
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(counters.added as i64)
        .bind(counters.modified as i64)
        .bind(counters.removed as i64)
        .bind(counters.unchanged as i64)
        .bind(counters.skipped as i64)
        .bind(counters.bytes_downloaded as i64)
        .bind(error)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::UnknownRun(run_id));
        }

        sqlx::query("DELETE FROM app_settings WHERE key = ?1")
            .bind(SYNC_LATCH_KEY)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(run_id, status = status.as_str(), "sync run finished");
        Ok(())
    }

    /// Persists the running counters of an in-flight run.
    pub async fn update_run_counters(
        &self,
        run_id: i64,
        counters: &RunCounters,
    ) -> Result<(), CatalogError> {
        sqlx::query(
            "UPDATE sync_runs SET added = ?2, modified = ?3, removed = ?4, unchanged = ?5,
                skipped = ?6, bytes_downloaded = ?7
             WHERE id = ?1",
        )
        .bind(run_id)
        .bind(counters.added as i64)
        .bind(counters.modified as i64)
        .bind(counters.removed as i64)
        .bind(counters.unchanged as i64)
        .bind(counters.skipped as i64)
        .bind(counters.bytes_downloaded as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_run(&self, run_id: i64) -> Result<Option<SyncRun>, CatalogError> {
        sqlx::query("SELECT * FROM sync_runs WHERE id = ?1")
            .bind(run_id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| run_from_row(&row))
            .transpose()
    }

    /// The run currently in `running` state, if any.
    pub async fn current_run(&self) -> Result<Option<SyncRun>, CatalogError> {
        sqlx::query("SELECT * FROM sync_runs WHERE status = 'running' ORDER BY id DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await?
            .map(|row| run_from_row(&row))
            .transpose()
    }

    /// The most recent finished run.
    pub async fn last_run(&self) -> Result<Option<SyncRun>, CatalogError> {
        sqlx::query(
            "SELECT * FROM sync_runs WHERE status != 'running' ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?
        .map(|row| run_from_row(&row))
        .transpose()
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Appends an audit event. Ids are monotonic.
    pub async fn log_event(
        &self,
        run_id: i64,
        document_id: Option<i64>,
        event_type: EventType,
        snapshot: &EventSnapshot,
    ) -> Result<i64, CatalogError> {
        let result = sqlx::query(
            "INSERT INTO sync_events (run_id, document_id, event_type, item_id, name, path,
                size, blob_id, logged_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(run_id)
        .bind(document_id)
        .bind(event_type.as_str())
        .bind(&snapshot.item_id)
        .bind(&snapshot.name)
        .bind(&snapshot.path)
        .bind(snapshot.size)
        .bind(snapshot.blob_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Events of one run, in logged order.
    pub async fn list_events(&self, run_id: i64) -> Result<Vec<SyncEvent>, CatalogError> {
        sqlx::query("SELECT * FROM sync_events WHERE run_id = ?1 ORDER BY id")
            .bind(run_id)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(event_from_row)
            .collect()
    }

    // ========================================================================
    // Aggregates
    // ========================================================================

    /// Aggregate counts for the status surface.
    pub async fn counts(&self) -> Result<CatalogCounts, CatalogError> {
        let documents: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE is_deleted = 0")
                .fetch_one(&self.pool)
                .await?;
        let blobs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM file_blobs")
            .fetch_one(&self.pool)
            .await?;
        let bytes: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(size), 0) FROM file_blobs")
            .fetch_one(&self.pool)
            .await?;
        Ok(CatalogCounts {
            documents,
            blobs,
            bytes,
        })
    }
}

// ============================================================================
// Transaction helpers
// ============================================================================

/// Decrements a blob's refcount inside an open transaction, deleting the row
/// when it reaches zero.
async fn release_blob_tx(
    tx: &mut SqliteConnection,
    blob_id: i64,
) -> Result<ReleasedBlob, CatalogError> {
    let row = sqlx::query("SELECT sha256, refcount FROM file_blobs WHERE id = ?1")
        .bind(blob_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CatalogError::UnknownBlob(blob_id))?;

    let sha256: String = row.get("sha256");
    let refcount = row.get::<i64, _>("refcount") - 1;

    if refcount <= 0 {
        sqlx::query("DELETE FROM file_blobs WHERE id = ?1")
            .bind(blob_id)
            .execute(&mut *tx)
            .await?;
    } else {
        sqlx::query("UPDATE file_blobs SET refcount = ?2 WHERE id = ?1")
            .bind(blob_id)
            .bind(refcount)
            .execute(&mut *tx)
            .await?;
    }

    Ok(ReleasedBlob {
        blob_id,
        sha256,
        refcount: refcount.max(0),
    })
}

// ============================================================================
// Row mapping
// ============================================================================

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, CatalogError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CatalogError::Decode(format!("bad datetime '{s}': {e}")))
}

fn parse_optional_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, CatalogError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

fn document_from_row(row: &SqliteRow) -> Result<Document, CatalogError> {
    Ok(Document {
        id: row.get("id"),
        item_id: row.get("item_id"),
        drive_id: row.get("drive_id"),
        name: row.get("name"),
        path: row.get("path"),
        mime: row.get("mime"),
        size: row.get("size"),
        web_url: row.get("web_url"),
        created_by: row.get("created_by"),
        last_modified_by: row.get("last_modified_by"),
        remote_created_at: parse_optional_datetime(row.get("remote_created_at"))?,
        remote_modified_at: parse_optional_datetime(row.get("remote_modified_at"))?,
        blob_id: row.get("blob_id"),
        is_deleted: row.get::<i64, _>("is_deleted") != 0,
        synced_at: parse_datetime(&row.get::<String, _>("synced_at"))?,
        created_at: parse_datetime(&row.get::<String, _>("created_at"))?,
        updated_at: parse_datetime(&row.get::<String, _>("updated_at"))?,
    })
}

fn blob_from_row(row: &SqliteRow) -> Result<FileBlob, CatalogError> {
    Ok(FileBlob {
        id: row.get("id"),
        sha256: row.get("sha256"),
        size: row.get("size"),
        mime: row.get("mime"),
        quick_xor_hash: row.get("quick_xor_hash"),
        refcount: row.get("refcount"),
        created_at: parse_datetime(&row.get::<String, _>("created_at"))?,
    })
}

fn drive_from_row(row: &SqliteRow) -> Result<Drive, CatalogError> {
    Ok(Drive {
        id: row.get("id"),
        name: row.get("name"),
        web_url: row.get("web_url"),
        updated_at: parse_datetime(&row.get::<String, _>("updated_at"))?,
    })
}

fn run_from_row(row: &SqliteRow) -> Result<SyncRun, CatalogError> {
    let status_str: String = row.get("status");
    let status = RunStatus::parse(&status_str)
        .ok_or_else(|| CatalogError::Decode(format!("unknown run status '{status_str}'")))?;

    Ok(SyncRun {
        id: row.get("id"),
        status,
        started_at: parse_datetime(&row.get::<String, _>("started_at"))?,
        completed_at: parse_optional_datetime(row.get("completed_at"))?,
        is_full: row.get::<i64, _>("is_full") != 0,
        counters: RunCounters {
            added: row.get::<i64, _>("added") as u64,
            modified: row.get::<i64, _>("modified") as u64,
            removed: row.get::<i64, _>("removed") as u64,
            unchanged: row.get::<i64, _>("unchanged") as u64,
            skipped: row.get::<i64, _>("skipped") as u64,
            bytes_downloaded: row.get::<i64, _>("bytes_downloaded") as u64,
        },
        error_message: row.get("error_message"),
    })
}

fn event_from_row(row: &SqliteRow) -> Result<SyncEvent, CatalogError> {
    let type_str: String = row.get("event_type");
    let event_type = EventType::parse(&type_str)
        .ok_or_else(|| CatalogError::Decode(format!("unknown event type '{type_str}'")))?;

    Ok(SyncEvent {
        id: row.get("id"),
        run_id: row.get("run_id"),
        document_id: row.get("document_id"),
        event_type,
        snapshot: EventSnapshot {
            item_id: row.get("item_id"),
            name: row.get("name"),
            path: row.get("path"),
            size: row.get("size"),
            blob_id: row.get("blob_id"),
        },
        logged_at: parse_datetime(&row.get::<String, _>("logged_at"))?,
    })
}

/// Quotes a user-supplied search term as a single FTS5 string token.
fn fts_quote(term: &str) -> String {
    format!("\"{}\"", term.replace('"', "\"\""))
}
