//! The `ICloudProvider` surface end to end against the mock server.

use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use spmirror_core::ports::ICloudProvider;
use spmirror_graph::GraphProvider;

use crate::common::setup_graph_mock;

#[tokio::test]
async fn test_resolve_site_and_filtered_drives() {
    let (server, client) = setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/sites/contoso.sharepoint.com:/sites/eng"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "site-001",
            "displayName": "Engineering"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sites/site-001/drives"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [
                {"id": "d1", "name": "Documents"},
                {"id": "d2", "name": "Site Assets"}
            ]
        })))
        .mount(&server)
        .await;

    let provider = GraphProvider::with_client(client, "contoso.sharepoint.com", "/sites/eng");

    let site = provider.resolve_site().await.unwrap();
    assert_eq!(site.id, "site-001");

    let all = provider.list_drives(&site.id, None).await.unwrap();
    assert_eq!(all.len(), 2);

    // Library filter is a case-insensitive display-name match.
    let filtered = provider.list_drives(&site.id, Some("documents")).await.unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, "d1");
}

#[tokio::test]
async fn test_download_content_stream_yields_all_chunks() {
    let (server, client) = setup_graph_mock().await;

    let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    Mock::given(method("GET"))
        .and(path("/drives/d1/items/item-1/content"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
        .mount(&server)
        .await;

    let provider = GraphProvider::with_client(client, "h", "/s");
    let mut stream = provider.download("d1", "item-1").await.unwrap();

    let mut collected = Vec::new();
    while let Some(chunk) = stream.next_chunk().await.unwrap() {
        collected.extend_from_slice(&chunk);
    }
    assert_eq!(collected, payload);
}

#[tokio::test]
async fn test_download_missing_item_is_not_found() {
    let (server, client) = setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/drives/d1/items/ghost/content"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let provider = GraphProvider::with_client(client, "h", "/s");
    let err = provider.download("d1", "ghost").await.unwrap_err();
    assert!(matches!(err, spmirror_core::SyncError::NotFound(_)));
}
