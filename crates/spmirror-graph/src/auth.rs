//! Client-credentials authentication against the Microsoft identity platform
//!
//! Acquires application-permission bearer tokens scoped to the Graph
//! resource and caches them in memory until shortly before expiry. The
//! daemonized sync worker never interacts with a user, so this is the plain
//! OAuth2 client-credentials grant; the `oauth2` crate drives the token
//! endpoint exchange.

use chrono::{DateTime, Duration, Utc};
use oauth2::{
    basic::BasicClient, AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, Scope,
    TokenResponse, TokenUrl,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::GraphError;

/// Default scope requesting the app-role permissions granted to the client.
const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Tokens are refreshed this long before their reported expiry.
const EXPIRY_SAFETY_MARGIN_SECS: i64 = 60;

/// Fallback lifetime when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

type CredentialsClient =
    BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// A cached bearer token with its refresh deadline.
#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    refresh_after: DateTime<Utc>,
}

/// Acquires and caches client-credentials bearer tokens.
///
/// The cache is guarded by a `tokio::sync::Mutex` so concurrent drive
/// workers share one token and at most one refresh is in flight.
pub struct TokenProvider {
    client: CredentialsClient,
    http: reqwest::Client,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    /// Creates a provider for the given tenant's v2.0 token endpoint.
    pub fn new(
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Self, GraphError> {
        let token_url = format!(
            "https://login.microsoftonline.com/{tenant_id}/oauth2/v2.0/token"
        );
        Self::with_token_url(client_id, client_secret, token_url)
    }

    /// Creates a provider against an explicit token endpoint (used by tests).
    pub fn with_token_url(
        client_id: &str,
        client_secret: &str,
        token_url: String,
    ) -> Result<Self, GraphError> {
        let token_url = TokenUrl::new(token_url)
            .map_err(|e| GraphError::Auth(format!("invalid token URL: {e}")))?;

        // The identity platform expects the client secret in the request
        // body, not in a Basic auth header.
        let client = BasicClient::new(ClientId::new(client_id.to_string()))
            .set_client_secret(ClientSecret::new(client_secret.to_string()))
            .set_auth_type(AuthType::RequestBody)
            .set_token_uri(token_url);

        Ok(Self {
            client,
            http: reqwest::Client::new(),
            scope: GRAPH_DEFAULT_SCOPE.to_string(),
            cached: Mutex::new(None),
        })
    }

    /// Returns a valid bearer token, refreshing when the cached one is
    /// within the safety margin of its expiry.
    ///
    /// # Errors
    ///
    /// `GraphError::Auth` when the exchange fails; the orchestrator treats
    /// this as fatal for the run.
    pub async fn bearer(&self) -> Result<String, GraphError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if Utc::now() < token.refresh_after {
                return Ok(token.access_token.clone());
            }
            debug!("cached token within expiry margin, refreshing");
        }

        let response = self
            .client
            .exchange_client_credentials()
            .add_scope(Scope::new(self.scope.clone()))
            .request_async(&self.http)
            .await
            .map_err(|e| GraphError::Auth(e.to_string()))?;

        let lifetime = response
            .expires_in()
            .map(|d| d.as_secs() as i64)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let refresh_after =
            Utc::now() + Duration::seconds((lifetime - EXPIRY_SAFETY_MARGIN_SECS).max(0));

        let access_token = response.access_token().secret().to_string();
        *cached = Some(CachedToken {
            access_token: access_token.clone(),
            refresh_after,
        });

        info!(lifetime_secs = lifetime, "acquired Graph bearer token");
        Ok(access_token)
    }
}
