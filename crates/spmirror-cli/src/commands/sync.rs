//! Sync command - run the orchestrator against the configured site

use std::path::Path;

use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use spmirror_core::SyncError;
use spmirror_sync::{RunOptions, SyncEngine};

use crate::context;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Ignore stored delta cursors and re-enumerate every drive
    #[arg(long)]
    pub full: bool,

    /// Traverse and evaluate without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Restrict the run to one document library by display name
    #[arg(long)]
    pub library: Option<String>,
}

impl SyncCommand {
    pub async fn execute(
        &self,
        config_path: Option<&Path>,
        format: OutputFormat,
    ) -> Result<(), SyncError> {
        let ctx = context::init(config_path).await?;
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        // Ctrl-C cancels between pages and entries; in-flight mutations
        // stay committed and the cursor is not advanced past them.
        let cancel = CancellationToken::new();
        {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, stopping after the current entry");
                    cancel.cancel();
                }
            });
        }

        let engine = SyncEngine::new(
            ctx.provider.clone(),
            ctx.catalog.clone(),
            ctx.blobs.clone(),
            &ctx.config,
        )?
        .with_cancellation(cancel);

        let report = engine
            .run(RunOptions {
                full: self.full,
                dry_run: self.dry_run,
                library: self.library.clone(),
            })
            .await?;

        if matches!(format, OutputFormat::Json) {
            let preview: Vec<serde_json::Value> = report
                .preview
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "event": p.event_type.as_str(),
                        "path": p.snapshot.path,
                        "size": p.snapshot.size,
                    })
                })
                .collect();
            formatter.print_json(&serde_json::json!({
                "run_id": report.run_id,
                "dry_run": report.dry_run,
                "status": report.status.as_str(),
                "added": report.counters.added,
                "modified": report.counters.modified,
                "removed": report.counters.removed,
                "unchanged": report.counters.unchanged,
                "skipped": report.counters.skipped,
                "bytes_downloaded": report.counters.bytes_downloaded,
                "preview": preview,
            }));
            return Ok(());
        }

        if report.dry_run {
            formatter.success("Dry run complete (nothing written)");
            for p in &report.preview {
                formatter.info(&format!("would {}: {}", p.event_type.as_str(), p.snapshot.path));
            }
        } else {
            formatter.success(&format!("Sync run {} completed", report.run_id.unwrap_or(0)));
        }
        let c = &report.counters;
        formatter.info(&format!(
            "added {} | modified {} | removed {} | unchanged {} | skipped {}",
            c.added, c.modified, c.removed, c.unchanged, c.skipped
        ));
        formatter.info(&format!("downloaded {} bytes", c.bytes_downloaded));
        Ok(())
    }
}
