//! Microsoft Graph HTTP client
//!
//! Wraps `reqwest::Client` with bearer authentication and the retry policy
//! the delta protocol requires:
//!
//! - HTTP 429 and 503 honor the `Retry-After` header before retrying
//! - other 5xx and network errors back off exponentially (base 1 s, cap
//!   60 s, jitter ±20 %), up to 5 attempts per request
//! - exhaustion surfaces as a typed error, never as control flow
//! - 401/403, 404, and 410 map to their own error kinds and are not retried

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use spmirror_core::ports::{DriveInfo, SiteInfo};

use crate::auth::TokenProvider;
use crate::GraphError;

/// Base URL for Microsoft Graph API v1.0
const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

// ============================================================================
// Retry policy
// ============================================================================

/// Bounded-retry parameters for Graph requests.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts per request (first try included)
    pub max_attempts: u32,
    /// Base delay for exponential backoff
    pub base_delay: Duration,
    /// Cap applied to the computed backoff
    pub max_delay: Duration,
    /// Jitter fraction applied symmetrically around the computed delay
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based), with jitter.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
            .min(self.max_delay);
        let spread = 1.0 + self.jitter * (rand::thread_rng().gen::<f64>() * 2.0 - 1.0);
        exp.mul_f64(spread.max(0.0))
    }
}

/// Parses a `Retry-After` header value in seconds, falling back when the
/// value is absent or in HTTP-date form.
fn parse_retry_after(value: &str, fallback: Duration) -> Duration {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .unwrap_or(fallback)
}

// ============================================================================
// Graph API response types
// ============================================================================

/// Response from `GET /sites/{hostname}:{site-path}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SiteResponse {
    id: String,
    display_name: Option<String>,
}

/// Response from `GET /sites/{id}/drives`
#[derive(Debug, Deserialize)]
struct DriveListResponse {
    #[serde(default)]
    value: Vec<DriveResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveResponse {
    id: String,
    #[serde(default)]
    name: String,
    web_url: Option<String>,
}

// ============================================================================
// GraphClient
// ============================================================================

/// Authenticated HTTP client for Microsoft Graph.
pub struct GraphClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenProvider>,
    retry: RetryPolicy,
}

impl GraphClient {
    /// Creates a client against the production Graph endpoint.
    pub fn new(tokens: Arc<TokenProvider>) -> Self {
        Self::with_base_url(tokens, GRAPH_BASE_URL)
    }

    /// Creates a client against a custom base URL (used by tests).
    pub fn with_base_url(tokens: Arc<TokenProvider>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            tokens,
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the retry policy (tests use zero delays).
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path relative to the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issues an authenticated GET with the full retry policy applied.
    ///
    /// `url` is absolute: delta `nextLink`/`deltaLink` values are served by
    /// Graph as complete URLs.
    pub async fn get(&self, url: &str) -> Result<Response, GraphError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;

            let bearer = self.tokens.bearer().await?;
            let result = self.http.get(url).bearer_auth(bearer).send().await;

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(GraphError::RetriesExhausted {
                            attempts: attempt,
                            message: e.to_string(),
                        });
                    }
                    let delay = self.retry.backoff_delay(attempt);
                    warn!(url, attempt, error = %e, delay_ms = delay.as_millis() as u64,
                        "network error, backing off");
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                if attempt > 1 {
                    info!(url, attempt, "request succeeded after retry");
                }
                return Ok(response);
            }

            match status {
                StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
                    if attempt >= self.retry.max_attempts {
                        return if status == StatusCode::TOO_MANY_REQUESTS {
                            Err(GraphError::RateLimited {
                                attempts: attempt,
                                url: url.to_string(),
                            })
                        } else {
                            Err(GraphError::RetriesExhausted {
                                attempts: attempt,
                                message: format!("{status} for {url}"),
                            })
                        };
                    }
                    let delay = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .map(|v| parse_retry_after(v, self.retry.backoff_delay(attempt)))
                        .unwrap_or_else(|| self.retry.backoff_delay(attempt));
                    info!(url, attempt, status = status.as_u16(),
                        delay_ms = delay.as_millis() as u64, "throttled, backing off");
                    tokio::time::sleep(delay).await;
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    return Err(GraphError::Auth(format!("{status} for {url}")));
                }
                StatusCode::NOT_FOUND => {
                    return Err(GraphError::NotFound(url.to_string()));
                }
                StatusCode::GONE => {
                    return Err(GraphError::Gone(url.to_string()));
                }
                s if s.is_server_error() => {
                    if attempt >= self.retry.max_attempts {
                        return Err(GraphError::RetriesExhausted {
                            attempts: attempt,
                            message: format!("{status} for {url}"),
                        });
                    }
                    let delay = self.retry.backoff_delay(attempt);
                    warn!(url, attempt, status = status.as_u16(),
                        delay_ms = delay.as_millis() as u64, "server error, backing off");
                    tokio::time::sleep(delay).await;
                }
                _ => {
                    return Err(GraphError::Status {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
            }
        }
    }

    /// GET + JSON decode with the retry policy applied.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, GraphError> {
        let response = self.get(url).await?;
        response.json::<T>().await.map_err(|e| GraphError::InvalidResponse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    // ========================================================================
    // Site and drive resolution
    // ========================================================================

    /// Resolves `hostname:{site_path}` to a Graph site id.
    pub async fn resolve_site(
        &self,
        hostname: &str,
        site_path: &str,
    ) -> Result<SiteInfo, GraphError> {
        let url = self.url(&format!("/sites/{hostname}:{site_path}"));
        debug!(hostname, site_path, "resolving site");

        let site: SiteResponse = self.get_json(&url).await?;
        Ok(SiteInfo {
            id: site.id,
            display_name: site.display_name,
        })
    }

    /// Lists the document libraries of a site.
    pub async fn list_drives(&self, site_id: &str) -> Result<Vec<DriveInfo>, GraphError> {
        let url = self.url(&format!("/sites/{site_id}/drives"));
        debug!(site_id, "listing drives");

        let drives: DriveListResponse = self.get_json(&url).await?;
        Ok(drives
            .value
            .into_iter()
            .map(|d| DriveInfo {
                id: d.id,
                name: d.name,
                web_url: d.web_url,
            })
            .collect())
    }

    /// Opens the content stream of an item.
    ///
    /// Graph redirects to a pre-signed download URL; reqwest follows the
    /// redirect automatically.
    pub async fn download(
        &self,
        drive_id: &str,
        item_id: &str,
    ) -> Result<Response, GraphError> {
        let url = self.url(&format!("/drives/{drive_id}/items/{item_id}/content"));
        debug!(drive_id, item_id, "downloading item content");
        self.get(&url).await
    }
}
