//! Status command - mirror counts and run history

use std::path::Path;

use clap::Args;

use spmirror_core::SyncError;

use crate::context;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(
        &self,
        config_path: Option<&Path>,
        format: OutputFormat,
    ) -> Result<(), SyncError> {
        let ctx = context::init(config_path).await?;
        let status = ctx.service().status().await?;
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        if matches!(format, OutputFormat::Json) {
            let value = serde_json::to_value(&status)
                .map_err(|e| SyncError::Catalog(format!("serialize status: {e}")))?;
            formatter.print_json(&value);
            return Ok(());
        }

        match &status.current_run {
            Some(run) => formatter.info(&format!(
                "sync in progress (run {}, started {})",
                run.id, run.started_at
            )),
            None => formatter.info("no sync in progress"),
        }
        match &status.last_run {
            Some(run) => {
                formatter.info(&format!(
                    "last run {}: {} ({} added, {} modified, {} removed, {} skipped)",
                    run.id,
                    run.status.as_str(),
                    run.counters.added,
                    run.counters.modified,
                    run.counters.removed,
                    run.counters.skipped
                ));
                if let Some(error) = &run.error_message {
                    formatter.info(&format!("last error: {error}"));
                }
            }
            None => formatter.info("no completed runs yet"),
        }
        formatter.info(&format!(
            "{} documents, {} blobs, {} bytes stored",
            status.documents, status.blobs, status.bytes
        ));
        Ok(())
    }
}
