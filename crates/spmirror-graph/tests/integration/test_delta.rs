//! Delta iteration: pagination, cursor resumption, 410 recovery.

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use spmirror_graph::delta;

use crate::common::setup_graph_mock;

fn file_item(id: &str, name: &str, size: u64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "size": size,
        "lastModifiedDateTime": "2026-07-01T12:00:00Z",
        "parentReference": {"path": "/drives/drive-1/root:"},
        "file": {"mimeType": "application/octet-stream"}
    })
}

#[tokio::test]
async fn test_single_page_with_delta_link() {
    let (server, client) = setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/delta"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [file_item("item-1", "a.pdf", 100)],
            "@odata.deltaLink": format!("{}/drives/drive-1/root/delta?token=t1", server.uri())
        })))
        .mount(&server)
        .await;

    let page = delta::fetch_page(&client, "drive-1", None).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].path.as_deref(), Some("/a.pdf"));
    assert!(page.next_link.is_none());
    assert!(page.delta_link.unwrap().contains("token=t1"));
}

#[tokio::test]
async fn test_pagination_follows_next_link() {
    let (server, client) = setup_graph_mock().await;

    // Page 1: returns a nextLink.
    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/delta"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [file_item("item-1", "a.pdf", 100)],
            "@odata.nextLink": format!(
                "{}/drives/drive-1/root/delta?$skiptoken=page2",
                server.uri()
            )
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    // Page 2: terminal page with a deltaLink.
    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/delta"))
        .and(query_param("$skiptoken", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [file_item("item-2", "b.docx", 200)],
            "@odata.deltaLink": format!("{}/drives/drive-1/root/delta?token=t2", server.uri())
        })))
        .mount(&server)
        .await;

    let first = delta::fetch_page(&client, "drive-1", None).await.unwrap();
    assert_eq!(first.items[0].item_id, "item-1");
    let next_link = first.next_link.unwrap();

    let second = delta::fetch_page(&client, "drive-1", Some(&next_link))
        .await
        .unwrap();
    assert_eq!(second.items[0].item_id, "item-2");
    assert!(second.next_link.is_none());
    assert!(second.delta_link.unwrap().contains("token=t2"));
}

#[tokio::test]
async fn test_expired_cursor_restarts_full_enumeration() {
    let (server, client) = setup_graph_mock().await;

    // The stored cursor is rejected with 410 Gone.
    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/delta"))
        .and(query_param("token", "expired"))
        .respond_with(ResponseTemplate::new(410))
        .expect(1)
        .mount(&server)
        .await;

    // Full enumeration from the root endpoint succeeds.
    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/delta"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [file_item("item-1", "a.pdf", 100), file_item("item-2", "b.docx", 200)],
            "@odata.deltaLink": format!("{}/drives/drive-1/root/delta?token=fresh", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;

    let stale = format!("{}/drives/drive-1/root/delta?token=expired", server.uri());
    let page = delta::fetch_page(&client, "drive-1", Some(&stale))
        .await
        .unwrap();

    assert_eq!(page.items.len(), 2);
    assert!(page.delta_link.unwrap().contains("token=fresh"));
}

#[tokio::test]
async fn test_410_on_initial_enumeration_is_an_error() {
    let (server, client) = setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/delta"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    // Without a cursor there is nothing to drop; the error surfaces.
    let result = delta::fetch_page(&client, "drive-1", None).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_deletion_entries_parse() {
    let (server, client) = setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/delta"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [{"id": "item-3", "name": "c.txt", "deleted": {}}],
            "@odata.deltaLink": format!("{}/drives/drive-1/root/delta?token=t", server.uri())
        })))
        .mount(&server)
        .await;

    let page = delta::fetch_page(&client, "drive-1", None).await.unwrap();
    assert!(page.items[0].is_deleted);
    assert_eq!(page.items[0].item_id, "item-3");
}
