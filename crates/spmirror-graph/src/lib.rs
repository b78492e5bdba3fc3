//! spmirror Graph - Microsoft Graph adapter
//!
//! Implements the `ICloudProvider` port against Microsoft Graph:
//! - client-credentials token acquisition with in-memory caching
//! - site and drive resolution
//! - delta stream iteration with 410 cursor-expiry recovery
//! - chunked content download
//! - throttling (`Retry-After`) and bounded exponential backoff with jitter

pub mod auth;
pub mod client;
pub mod delta;
pub mod provider;

use thiserror::Error;

pub use auth::TokenProvider;
pub use client::{GraphClient, RetryPolicy};
pub use provider::GraphProvider;

/// Errors from the Graph adapter.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Token acquisition failed or the service rejected the credentials
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Network or 5xx failure that survived the retry budget
    #[error("retries exhausted after {attempts} attempts: {message}")]
    RetriesExhausted {
        attempts: u32,
        message: String,
    },

    /// HTTP 429 that survived the retry budget
    #[error("rate limited after {attempts} attempts: {url}")]
    RateLimited {
        attempts: u32,
        url: String,
    },

    /// HTTP 404
    #[error("not found: {0}")]
    NotFound(String),

    /// HTTP 410; a delta cursor has expired
    #[error("gone: {0}")]
    Gone(String),

    /// Unexpected non-retryable status
    #[error("unexpected status {status} for {url}")]
    Status {
        status: u16,
        url: String,
    },

    /// Body could not be read or parsed
    #[error("invalid response from {url}: {message}")]
    InvalidResponse {
        url: String,
        message: String,
    },
}

impl From<GraphError> for spmirror_core::SyncError {
    fn from(err: GraphError) -> Self {
        use spmirror_core::SyncError;
        match err {
            GraphError::Auth(msg) => SyncError::Auth(msg),
            GraphError::RetriesExhausted { attempts, message } => {
                SyncError::TransientNetwork { attempts, message }
            }
            GraphError::RateLimited { attempts, url } => {
                SyncError::RateLimited(format!("{url} (after {attempts} attempts)"))
            }
            GraphError::NotFound(what) => SyncError::NotFound(what),
            other => SyncError::TransientNetwork {
                attempts: 1,
                message: other.to_string(),
            },
        }
    }
}
