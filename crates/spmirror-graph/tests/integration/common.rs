//! Shared test helpers for Graph adapter integration tests
//!
//! Provides wiremock-based mock server setup for the token endpoint and the
//! Graph API, plus a retry policy with negligible delays so throttling tests
//! run fast.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use spmirror_graph::{GraphClient, RetryPolicy, TokenProvider};

/// Retry policy with sub-millisecond backoff for tests.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 5,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        jitter: 0.0,
    }
}

/// Mounts a token endpoint that issues `test-access-token`.
pub async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/tenant/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "test-access-token",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

/// Sets up a mock server with a working token endpoint and returns a
/// `(MockServer, GraphClient)` tuple pointing at it.
pub async fn setup_graph_mock() -> (MockServer, GraphClient) {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    let tokens = Arc::new(
        TokenProvider::with_token_url(
            "client-test",
            "secret-test",
            format!("{}/tenant/oauth2/v2.0/token", server.uri()),
        )
        .unwrap(),
    );
    let client = GraphClient::with_base_url(tokens, server.uri()).with_retry_policy(fast_retry());

    (server, client)
}
