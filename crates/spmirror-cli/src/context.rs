//! Shared command bootstrap
//!
//! Loads and validates the configuration, then opens the catalog, the blob
//! store, and the Graph provider. Every command goes through here so the
//! instance layout and error mapping stay uniform.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use spmirror_blob::BlobStore;
use spmirror_catalog::{Catalog, CatalogPool};
use spmirror_core::config::Config;
use spmirror_core::SyncError;
use spmirror_graph::GraphProvider;
use spmirror_sync::MirrorService;

/// Shared collaborators for one command invocation.
pub struct AppContext {
    pub config: Config,
    pub catalog: Arc<Catalog>,
    pub blobs: Arc<BlobStore>,
    pub provider: Arc<GraphProvider>,
}

/// Opens the instance named by the configuration.
pub async fn init(config_path: Option<&Path>) -> Result<AppContext, SyncError> {
    let path = config_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(Config::default_path);
    debug!(path = %path.display(), "loading configuration");

    let config = Config::load(&path)?;
    config.validate()?;

    let pool = CatalogPool::new(&config.storage.database_path).await?;
    let catalog = Arc::new(Catalog::new(pool.pool().clone()));
    let blobs = Arc::new(BlobStore::open(config.storage.blob_root.clone()).await?);
    let provider = Arc::new(GraphProvider::from_config(&config.sharepoint)?);

    Ok(AppContext {
        config,
        catalog,
        blobs,
        provider,
    })
}

impl AppContext {
    /// The maintenance surface over this instance.
    pub fn service(&self) -> MirrorService {
        MirrorService::new(self.provider.clone(), self.catalog.clone(), self.blobs.clone())
    }
}
