//! HTTP-level tests: the axum router bound to a free local port, backed by
//! the in-memory engine, exercised with reqwest.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use doc_search::engine::InMemoryEngine;
use doc_search::server::router;
use doc_search::service::SearchService;

async fn start_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let service = SearchService::new(Arc::new(InMemoryEngine::new()), Duration::from_secs(2));
    tokio::spawn(async move {
        axum::serve(listener, router(service)).await.unwrap();
    });
    format!("http://{}", addr)
}

fn document(id: &str, category: &str) -> Value {
    json!({
        "id": id,
        "title": format!("Guide {}", id),
        "body": "How the query compiler builds boolean queries.",
        "tags": ["search", "guide"],
        "category": category,
        "publishedAt": "2024-04-01T09:30:00Z",
        "views": 42,
        "isFeatured": false,
    })
}

#[tokio::test]
async fn test_health() {
    let base = start_server().await;
    let resp = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_upsert_query_delete_roundtrip() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("{}/search/upsert", base))
        .json(&document("D1", "docs"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .post(format!("{}/search/query", base))
        .json(&json!({ "category": "docs" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total"], 1);
    let hit = &body["hits"][0];
    assert_eq!(hit["id"], "D1");
    assert_eq!(hit["publishedAt"], "2024-04-01T09:30:00Z");
    assert_eq!(hit["views"], 42);
    assert!(hit.get("body").is_none(), "body is not part of the projection");
    assert!(hit.get("highlight").is_none());

    let resp = client
        .delete(format!("{}/search/delete/D1", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = client
        .post(format!("{}/search/query", base))
        .json(&json!({}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_delete_all() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    for id in ["a", "b", "c"] {
        client
            .put(format!("{}/search/upsert", base))
            .json(&document(id, "docs"))
            .send()
            .await
            .unwrap();
    }

    let resp = client
        .delete(format!("{}/search/delete-all", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = client
        .post(format!("{}/search/query", base))
        .json(&json!({ "q": "guide" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 0);
    assert_eq!(body["hits"], json!([]));
}

#[tokio::test]
async fn test_page_size_out_of_range_is_bad_request() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    for params in [
        json!({ "pageSize": 51 }),
        json!({ "pageSize": 0 }),
        json!({ "page": 0 }),
        json!({ "sort": "oldest" }),
        json!({ "featured": "yes" }),
    ] {
        let resp = client
            .post(format!("{}/search/query", base))
            .json(&params)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "params: {}", params);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "bad_request");
    }
}

#[tokio::test]
async fn test_incomplete_document_is_bad_request() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    let mut doc = document("x", "docs");
    doc.as_object_mut().unwrap().remove("views");
    let resp = client
        .put(format!("{}/search/upsert", base))
        .json(&doc)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_bodyless_query_matches_everything() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    client
        .put(format!("{}/search/upsert", base))
        .json(&document("D1", "docs"))
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{}/search/query", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_malformed_json_uses_error_envelope() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    for path in ["/search/query", "/search/upsert"] {
        let builder = if path == "/search/query" {
            client.post(format!("{}{}", base, path))
        } else {
            client.put(format!("{}{}", base, path))
        };
        let resp = builder
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "path: {}", path);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "bad_request");
    }

    let resp = client
        .put(format!("{}/search/upsert", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_delete_missing_id_is_internal_error() {
    let base = start_server().await;
    let resp = reqwest::Client::new()
        .delete(format!("{}/search/delete/nope", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "internal");
    assert_eq!(
        body["error"]["message"],
        "Failed to remove document. Please try again later."
    );
}

#[tokio::test]
async fn test_sort_by_views() {
    let base = start_server().await;
    let client = reqwest::Client::new();

    for (id, views) in [("low", 1), ("high", 500), ("mid", 60)] {
        let mut doc = document(id, "docs");
        doc["views"] = json!(views);
        client
            .put(format!("{}/search/upsert", base))
            .json(&doc)
            .send()
            .await
            .unwrap();
    }

    let body: Value = client
        .post(format!("{}/search/query", base))
        .json(&json!({ "sort": "views", "pageSize": 2 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 3);
    let ids: Vec<&str> = body["hits"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["high", "mid"]);
}
