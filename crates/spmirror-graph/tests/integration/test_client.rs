//! Client behavior: auth, retries, throttling, downloads.

use std::sync::Arc;

use wiremock::matchers::{bearer_token, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use spmirror_graph::{GraphClient, GraphError, TokenProvider};

use crate::common::{fast_retry, setup_graph_mock};

#[tokio::test]
async fn test_requests_carry_bearer_token() {
    let (server, client) = setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/sites/contoso.sharepoint.com:/sites/eng"))
        .and(bearer_token("test-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "site-001",
            "displayName": "Engineering"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let site = client
        .resolve_site("contoso.sharepoint.com", "/sites/eng")
        .await
        .unwrap();
    assert_eq!(site.id, "site-001");
    assert_eq!(site.display_name.as_deref(), Some("Engineering"));
}

#[tokio::test]
async fn test_token_is_cached_across_requests() {
    let (server, client) = setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/sites/s/drives"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"value": []})),
        )
        .mount(&server)
        .await;

    client.list_drives("s").await.unwrap();
    client.list_drives("s").await.unwrap();

    // Exactly one token exchange despite two API calls.
    let token_requests = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path().ends_with("/token"))
        .count();
    assert_eq!(token_requests, 1);
}

#[tokio::test]
async fn test_rejected_credentials_surface_as_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tenant/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_client",
            "error_description": "AADSTS7000215: Invalid client secret provided."
        })))
        .mount(&server)
        .await;

    let tokens = Arc::new(
        TokenProvider::with_token_url(
            "client-test",
            "bad-secret",
            format!("{}/tenant/oauth2/v2.0/token", server.uri()),
        )
        .unwrap(),
    );
    let client = GraphClient::with_base_url(tokens, server.uri()).with_retry_policy(fast_retry());

    let err = client.list_drives("s").await.unwrap_err();
    assert!(matches!(err, GraphError::Auth(_)));
}

#[tokio::test]
async fn test_429_honors_retry_after_then_succeeds() {
    let (server, client) = setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/sites/s/drives"))
        .respond_with(
            ResponseTemplate::new(429).insert_header("Retry-After", "0"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sites/s/drives"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [{"id": "drive-1", "name": "Documents"}]
        })))
        .mount(&server)
        .await;

    let drives = client.list_drives("s").await.unwrap();
    assert_eq!(drives.len(), 1);
    assert_eq!(drives[0].id, "drive-1");
}

#[tokio::test]
async fn test_429_exhaustion_is_typed() {
    let (server, client) = setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/sites/s/drives"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .mount(&server)
        .await;

    let err = client.list_drives("s").await.unwrap_err();
    match err {
        GraphError::RateLimited { attempts, .. } => assert_eq!(attempts, 5),
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_errors_retry_then_succeed() {
    let (server, client) = setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/sites/s/drives"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sites/s/drives"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"value": []})),
        )
        .mount(&server)
        .await;

    assert!(client.list_drives("s").await.unwrap().is_empty());
    assert_eq!(
        server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == "/sites/s/drives")
            .count(),
        3
    );
}

#[tokio::test]
async fn test_500_exhaustion_is_typed() {
    let (server, client) = setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/sites/s/drives"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client.list_drives("s").await.unwrap_err();
    match err {
        GraphError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 5),
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_404_is_not_retried() {
    let (server, client) = setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/sites/ghost.sharepoint.com:/sites/none"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = client
        .resolve_site("ghost.sharepoint.com", "/sites/none")
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::NotFound(_)));
}

#[tokio::test]
async fn test_download_streams_content() {
    let (server, client) = setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/drives/drive-1/items/item-1/content"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"file contents here".to_vec())
                .append_header("Content-Type", "application/octet-stream"),
        )
        .mount(&server)
        .await;

    let response = client.download("drive-1", "item-1").await.unwrap();
    let body = response.bytes().await.unwrap();
    assert_eq!(&body[..], b"file contents here");
}

#[tokio::test]
async fn test_list_drives_filters_nothing_by_default() {
    let (server, client) = setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/sites/site-1/drives"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [
                {"id": "d1", "name": "Documents", "webUrl": "https://x/docs"},
                {"id": "d2", "name": "Archive"}
            ]
        })))
        .mount(&server)
        .await;

    let drives = client.list_drives("site-1").await.unwrap();
    assert_eq!(drives.len(), 2);
    assert_eq!(drives[1].name, "Archive");
}
