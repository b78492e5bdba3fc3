//! `ICloudProvider` implementation over the Graph client

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use spmirror_core::config::SharePointConfig;
use spmirror_core::ports::{ContentStream, DeltaPage, DriveInfo, ICloudProvider, SiteInfo};
use spmirror_core::SyncError;

use crate::auth::TokenProvider;
use crate::client::GraphClient;
use crate::{delta, GraphError};

/// Production cloud provider backed by Microsoft Graph.
pub struct GraphProvider {
    client: GraphClient,
    hostname: String,
    site_path: String,
}

impl GraphProvider {
    /// Builds a provider from the SharePoint configuration section.
    pub fn from_config(config: &SharePointConfig) -> Result<Self, GraphError> {
        let tokens = Arc::new(TokenProvider::new(
            &config.tenant_id,
            &config.client_id,
            &config.client_secret,
        )?);
        Ok(Self {
            client: GraphClient::new(tokens),
            hostname: config.site_hostname.clone(),
            site_path: config.site_path.clone(),
        })
    }

    /// Builds a provider over an explicit client (used by tests).
    pub fn with_client(client: GraphClient, hostname: &str, site_path: &str) -> Self {
        Self {
            client,
            hostname: hostname.to_string(),
            site_path: site_path.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl ICloudProvider for GraphProvider {
    async fn resolve_site(&self) -> Result<SiteInfo, SyncError> {
        let site = self
            .client
            .resolve_site(&self.hostname, &self.site_path)
            .await?;
        debug!(site_id = %site.id, "site resolved");
        Ok(site)
    }

    async fn list_drives(
        &self,
        site_id: &str,
        library: Option<&str>,
    ) -> Result<Vec<DriveInfo>, SyncError> {
        let mut drives = self.client.list_drives(site_id).await?;
        if let Some(name) = library {
            drives.retain(|d| d.name.eq_ignore_ascii_case(name));
        }
        Ok(drives)
    }

    async fn delta_page(
        &self,
        drive_id: &str,
        link: Option<&str>,
    ) -> Result<DeltaPage, SyncError> {
        Ok(delta::fetch_page(&self.client, drive_id, link).await?)
    }

    async fn download(
        &self,
        drive_id: &str,
        item_id: &str,
    ) -> Result<Box<dyn ContentStream>, SyncError> {
        let response = self.client.download(drive_id, item_id).await?;
        Ok(Box::new(ResponseStream { response }))
    }
}

/// Chunked body of an in-flight download response.
struct ResponseStream {
    response: reqwest::Response,
}

#[async_trait::async_trait]
impl ContentStream for ResponseStream {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, SyncError> {
        self.response
            .chunk()
            .await
            .map_err(|e| SyncError::TransientNetwork {
                attempts: 1,
                message: format!("download body error: {e}"),
            })
    }
}
