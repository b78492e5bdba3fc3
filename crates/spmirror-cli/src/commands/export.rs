//! Export command - stream document metadata to stdout

use std::path::Path;

use clap::{Args, ValueEnum};

use spmirror_core::SyncError;
use spmirror_sync::ExportFormat;

use crate::context;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Format {
    /// One JSON array
    Json,
    /// One JSON object per line
    Jsonl,
}

#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Serialization format
    #[arg(long, value_enum, default_value = "jsonl")]
    pub format: Format,

    /// Include the blob file path of each document
    #[arg(long)]
    pub include_blob_path: bool,
}

impl ExportCommand {
    pub async fn execute(&self, config_path: Option<&Path>) -> Result<(), SyncError> {
        let ctx = context::init(config_path).await?;
        let format = match self.format {
            Format::Json => ExportFormat::Json,
            Format::Jsonl => ExportFormat::Jsonl,
        };

        let mut stdout = std::io::stdout().lock();
        ctx.service()
            .export_metadata(format, self.include_blob_path, &mut stdout)
            .await?;
        Ok(())
    }
}
