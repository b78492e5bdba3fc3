//! Test-connection command - probe credentials and site reachability

use std::path::Path;

use clap::Args;

use spmirror_core::SyncError;

use crate::context;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct TestConnectionCommand {}

impl TestConnectionCommand {
    pub async fn execute(
        &self,
        config_path: Option<&Path>,
        format: OutputFormat,
    ) -> Result<(), SyncError> {
        let ctx = context::init(config_path).await?;
        let info = ctx.service().test_connection().await?;
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        if matches!(format, OutputFormat::Json) {
            let value = serde_json::to_value(&info)
                .map_err(|e| SyncError::Catalog(format!("serialize info: {e}")))?;
            formatter.print_json(&value);
            return Ok(());
        }

        formatter.success(&format!(
            "connected to {} ({})",
            info.site_name.as_deref().unwrap_or("site"),
            info.site_id
        ));
        for drive in &info.drives {
            formatter.info(&format!("library: {drive}"));
        }
        Ok(())
    }
}
