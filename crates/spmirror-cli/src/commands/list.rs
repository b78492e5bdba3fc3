//! List command - browse mirrored documents

use std::path::Path;

use clap::Args;

use spmirror_core::SyncError;

use crate::context;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct ListCommand {
    /// Full-text search over document names and paths
    #[arg(long)]
    pub search: Option<String>,

    /// Maximum number of documents to return
    #[arg(long)]
    pub limit: Option<i64>,

    /// Include soft-deleted documents
    #[arg(long)]
    pub include_deleted: bool,
}

impl ListCommand {
    pub async fn execute(
        &self,
        config_path: Option<&Path>,
        format: OutputFormat,
    ) -> Result<(), SyncError> {
        let ctx = context::init(config_path).await?;
        let documents = ctx
            .service()
            .list(self.search.as_deref(), self.limit, self.include_deleted)
            .await?;
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        if matches!(format, OutputFormat::Json) {
            let value = serde_json::to_value(&documents)
                .map_err(|e| SyncError::Catalog(format!("serialize documents: {e}")))?;
            formatter.print_json(&value);
            return Ok(());
        }

        if documents.is_empty() {
            formatter.info("no documents");
            return Ok(());
        }
        for doc in &documents {
            let marker = if doc.is_deleted { " [deleted]" } else { "" };
            formatter.info(&format!("{} ({} bytes){}", doc.path, doc.size, marker));
        }
        formatter.info(&format!("{} documents", documents.len()));
        Ok(())
    }
}
