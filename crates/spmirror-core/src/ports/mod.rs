//! Port definitions implemented by adapter crates

pub mod cloud_provider;

pub use cloud_provider::{
    ContentStream, DeltaPage, DriveInfo, ICloudProvider, RemoteChange, SiteInfo,
};
