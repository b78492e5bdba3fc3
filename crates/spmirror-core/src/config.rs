//! Configuration module for spmirror.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and programmatic construction for tests.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Top-level configuration for spmirror.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub sharepoint: SharePointConfig,
    pub sync: SyncConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// SharePoint tenant and site coordinates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SharePointConfig {
    /// Azure AD tenant (directory) ID.
    pub tenant_id: String,
    /// Application (client) ID of the app registration.
    pub client_id: String,
    /// Client secret for the client-credentials flow.
    pub client_secret: String,
    /// SharePoint hostname, e.g. `contoso.sharepoint.com`.
    pub site_hostname: String,
    /// Server-relative site path, e.g. `/sites/engineering`.
    pub site_path: String,
    /// Restrict the sync to a single document library by display name.
    pub library_name: Option<String>,
}

/// Item eligibility and download behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Files above this size (in MiB) are skipped.
    pub max_file_size_mb: u64,
    /// Extension allow-list (lowercase, without dot). Empty = allow all.
    pub include_extensions: Vec<String>,
    /// Extension deny-list (lowercase, without dot).
    pub exclude_extensions: Vec<String>,
    /// Path prefix allow-list; prefixes match at path boundaries only.
    pub include_paths: Vec<String>,
    /// Glob patterns evaluated first-match-wins; `!` prefix excludes.
    pub path_patterns: Vec<String>,
    /// Mirror metadata only; no content is downloaded.
    pub metadata_only: bool,
    /// Verify streamed content against the server's QuickXorHash.
    pub verify_quickxor_hash: bool,
}

/// Instance directory layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the content-addressed blob tree.
    pub blob_root: PathBuf,
    /// Path of the SQLite catalog database.
    pub database_path: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| SyncError::Config(format!("cannot parse {}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/spmirror/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("spmirror")
            .join("config.yaml")
    }

    /// Validate that the required SharePoint coordinates are present.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Config` naming the first missing key.
    pub fn validate(&self) -> Result<(), SyncError> {
        let required = [
            ("sharepoint.tenant_id", &self.sharepoint.tenant_id),
            ("sharepoint.client_id", &self.sharepoint.client_id),
            ("sharepoint.client_secret", &self.sharepoint.client_secret),
            ("sharepoint.site_hostname", &self.sharepoint.site_hostname),
            ("sharepoint.site_path", &self.sharepoint.site_path),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(SyncError::Config(format!("{key} is not set")));
            }
        }
        if !self.sharepoint.site_path.starts_with('/') {
            return Err(SyncError::Config(
                "sharepoint.site_path must start with '/'".to_string(),
            ));
        }
        Ok(())
    }

    /// Maximum file size in bytes derived from `sync.max_file_size_mb`.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.sync.max_file_size_mb * 1024 * 1024
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            include_extensions: Vec::new(),
            exclude_extensions: Vec::new(),
            include_paths: Vec::new(),
            path_patterns: Vec::new(),
            metadata_only: false,
            verify_quickxor_hash: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            blob_root: PathBuf::from("instance/blobs"),
            database_path: PathBuf::from("instance/catalog.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
