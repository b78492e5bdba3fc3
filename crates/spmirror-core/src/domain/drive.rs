//! Drives - SharePoint document libraries known to the catalog

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A SharePoint document library, as recorded in the catalog lookup table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drive {
    /// Graph drive id
    pub id: String,
    /// Library display name
    pub name: String,
    /// Browser URL of the library
    pub web_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}
