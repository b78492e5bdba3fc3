//! Maintenance surface exposed to the CLI
//!
//! Read-mostly operations layered over the catalog and blob store, plus the
//! connection probe. None of these touch delta cursors except
//! [`MirrorService::clear_delta_cursors`], which explicitly resets the
//! mirror to full-sync state.

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use spmirror_blob::{BlobStore, VerifyOutcome};
use spmirror_catalog::{Catalog, CatalogCounts};
use spmirror_core::domain::{Document, SyncRun};
use spmirror_core::ports::{ICloudProvider, SiteInfo};
use spmirror_core::SyncError;

/// Aggregate mirror state for `spmirror status`.
#[derive(Debug, Clone, Serialize)]
pub struct MirrorStatus {
    pub current_run: Option<SyncRun>,
    pub last_run: Option<SyncRun>,
    pub documents: i64,
    pub blobs: i64,
    pub bytes: i64,
}

/// Result of the connection probe.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub site_id: String,
    pub site_name: Option<String>,
    pub drives: Vec<String>,
}

/// Result of the verify-storage maintenance pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StorageReport {
    pub ok_count: usize,
    /// Hashes whose blob file is absent
    pub missing: Vec<String>,
    /// Hashes whose blob file exists but fails size or hash comparison
    pub corrupt: Vec<String>,
}

impl StorageReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.corrupt.is_empty()
    }
}

/// Export serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// One JSON array
    Json,
    /// One JSON object per line
    Jsonl,
}

/// Maintenance operations over the mirror.
pub struct MirrorService {
    provider: Arc<dyn ICloudProvider>,
    catalog: Arc<Catalog>,
    blobs: Arc<BlobStore>,
}

impl MirrorService {
    pub fn new(
        provider: Arc<dyn ICloudProvider>,
        catalog: Arc<Catalog>,
        blobs: Arc<BlobStore>,
    ) -> Self {
        Self {
            provider,
            catalog,
            blobs,
        }
    }

    /// Current and last run plus aggregate counts.
    pub async fn status(&self) -> Result<MirrorStatus, SyncError> {
        let current_run = self.catalog.current_run().await?;
        let last_run = self.catalog.last_run().await?;
        let CatalogCounts {
            documents,
            blobs,
            bytes,
        } = self.catalog.counts().await?;
        Ok(MirrorStatus {
            current_run,
            last_run,
            documents,
            blobs,
            bytes,
        })
    }

    /// Lists mirrored documents, optionally full-text filtered.
    pub async fn list(
        &self,
        search: Option<&str>,
        limit: Option<i64>,
        include_deleted: bool,
    ) -> Result<Vec<Document>, SyncError> {
        Ok(self
            .catalog
            .list_documents(search, limit, include_deleted)
            .await?)
    }

    /// Streams document metadata to `out` as JSON or JSONL.
    ///
    /// With `include_blob_path` each record carries the absolute path of its
    /// blob file in the store.
    pub async fn export_metadata<W: Write>(
        &self,
        format: ExportFormat,
        include_blob_path: bool,
        out: &mut W,
    ) -> Result<usize, SyncError> {
        let documents = self.catalog.list_documents(None, None, false).await?;

        let mut records = Vec::with_capacity(documents.len());
        for doc in &documents {
            let mut value = serde_json::to_value(doc)
                .map_err(|e| SyncError::Catalog(format!("serialize document: {e}")))?;
            if include_blob_path {
                let blob_path = match doc.blob_id {
                    Some(blob_id) => self
                        .catalog
                        .get_blob(blob_id)
                        .await?
                        .map(|b| self.blobs.blob_path(&b.sha256).display().to_string()),
                    None => None,
                };
                value["blob_path"] = serde_json::to_value(blob_path)
                    .map_err(|e| SyncError::Catalog(format!("serialize blob path: {e}")))?;
            }
            records.push(value);
        }

        let write_err = |e: std::io::Error| SyncError::Storage(format!("export write: {e}"));
        match format {
            ExportFormat::Json => {
                serde_json::to_writer_pretty(&mut *out, &records)
                    .map_err(|e| SyncError::Storage(format!("export write: {e}")))?;
                writeln!(out).map_err(write_err)?;
            }
            ExportFormat::Jsonl => {
                for record in &records {
                    serde_json::to_writer(&mut *out, record)
                        .map_err(|e| SyncError::Storage(format!("export write: {e}")))?;
                    writeln!(out).map_err(write_err)?;
                }
            }
        }

        debug!(records = records.len(), "metadata exported");
        Ok(records.len())
    }

    /// Probes authentication and site resolution.
    pub async fn test_connection(&self) -> Result<ConnectionInfo, SyncError> {
        let SiteInfo { id, display_name } = self.provider.resolve_site().await?;
        let drives = self.provider.list_drives(&id, None).await?;
        Ok(ConnectionInfo {
            site_id: id,
            site_name: display_name,
            drives: drives.into_iter().map(|d| d.name).collect(),
        })
    }

    /// Drops all stored delta cursors; the next run re-enumerates fully.
    pub async fn clear_delta_cursors(&self) -> Result<u64, SyncError> {
        let cleared = self.catalog.clear_delta_links().await?;
        info!(cleared, "delta cursors cleared");
        Ok(cleared)
    }

    /// Rehashes every blob on disk against its catalog row.
    pub async fn verify_storage(&self) -> Result<StorageReport, SyncError> {
        let mut report = StorageReport::default();
        for blob in self.catalog.list_blobs().await? {
            match self.blobs.verify(&blob.sha256, blob.size as u64).await? {
                VerifyOutcome::Ok => report.ok_count += 1,
                VerifyOutcome::Missing => report.missing.push(blob.sha256),
                VerifyOutcome::Corrupt => report.corrupt.push(blob.sha256),
            }
        }
        info!(
            ok = report.ok_count,
            missing = report.missing.len(),
            corrupt = report.corrupt.len(),
            "storage verified"
        );
        Ok(report)
    }
}
