//! Verify command - re-hash stored blobs against the catalog

use std::path::Path;

use clap::Args;

use spmirror_core::SyncError;

use crate::context;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct VerifyCommand {}

impl VerifyCommand {
    pub async fn execute(
        &self,
        config_path: Option<&Path>,
        format: OutputFormat,
    ) -> Result<(), SyncError> {
        let ctx = context::init(config_path).await?;
        let report = ctx.service().verify_storage().await?;
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        if matches!(format, OutputFormat::Json) {
            let value = serde_json::to_value(&report)
                .map_err(|e| SyncError::Catalog(format!("serialize report: {e}")))?;
            formatter.print_json(&value);
        } else if report.is_clean() {
            formatter.success(&format!("{} blobs verified, storage is clean", report.ok_count));
        } else {
            formatter.error(&format!(
                "{} ok, {} missing, {} corrupt",
                report.ok_count,
                report.missing.len(),
                report.corrupt.len()
            ));
            for sha in &report.missing {
                formatter.info(&format!("missing: {sha}"));
            }
            for sha in &report.corrupt {
                formatter.info(&format!("corrupt: {sha}"));
            }
        }

        if report.is_clean() {
            Ok(())
        } else {
            Err(SyncError::Storage(format!(
                "{} blobs missing, {} corrupt",
                report.missing.len(),
                report.corrupt.len()
            )))
        }
    }
}
