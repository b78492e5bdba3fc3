//! Reset-cursors command - force full enumeration on the next run

use std::path::Path;

use clap::Args;

use spmirror_core::SyncError;

use crate::context;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct ResetCursorsCommand {}

impl ResetCursorsCommand {
    pub async fn execute(
        &self,
        config_path: Option<&Path>,
        format: OutputFormat,
    ) -> Result<(), SyncError> {
        let ctx = context::init(config_path).await?;
        let cleared = ctx.service().clear_delta_cursors().await?;
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&serde_json::json!({"cleared": cleared}));
        } else {
            formatter.success(&format!(
                "{cleared} delta cursor(s) cleared; next sync re-enumerates fully"
            ));
        }
        Ok(())
    }
}
