mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::ScriptedBackend;
use notes_retrieval::api::{create_router, AppState};
use notes_retrieval::domain::CommandStatus;
use notes_retrieval::infrastructure::AppConfig;

fn app(backend: std::sync::Arc<ScriptedBackend>) -> Router {
    let mut config = AppConfig::default();
    config.commands.poll_interval_seconds = 1;
    config.commands.timeout_seconds = 2;
    create_router(AppState::new(backend, config))
}

async fn call(app: Router, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let (status, body) = call(app(ScriptedBackend::new()), Method::GET, "/health", Value::Null).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["datastore"], "memory");
}

#[tokio::test]
async fn test_upsert_then_query() {
    let backend = ScriptedBackend::new();

    let (status, body) = call(
        app(backend.clone()),
        Method::POST,
        "/upsert",
        json!({
            "documents": [{
                "id": "journal",
                "text": "two entries",
                "metadata": {"source": "FILE", "author": "sam"},
                "chunks": [
                    {"text": "went hiking", "metadata": {}, "embedding": [1.0, 0.0]},
                    {"text": "baked bread", "metadata": {}, "embedding": [0.0, 1.0]}
                ]
            }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ids": ["journal"]}));

    let (status, body) = call(
        app(backend.clone()),
        Method::POST,
        "/query",
        json!({
            "queries": [
                {"query": "outdoors", "embedding": [1.0, 0.0], "top_k": 1},
                {"query": "by author", "embedding": [0.0, 1.0], "filter": {"author": "sam"}}
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["query"], "outdoors");
    assert_eq!(results[0]["results"].as_array().unwrap().len(), 1);
    assert_eq!(results[0]["results"][0]["text"], "went hiking");
    assert_eq!(results[0]["results"][0]["metadata"]["source"], "FILE");
    assert_eq!(results[1]["results"][0]["text"], "baked bread");
    assert!(results[1]["results"][0]["score"].as_f64().unwrap() > 0.99);
}

#[tokio::test]
async fn test_delete_requires_a_mode() {
    let (status, body) = call(app(ScriptedBackend::new()), Method::DELETE, "/delete", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "One of ids, filter, or delete_all is required");
}

#[tokio::test]
async fn test_delete_all() {
    let backend = ScriptedBackend::new();
    let (status, body) = call(
        app(backend.clone()),
        Method::DELETE,
        "/delete",
        json!({"delete_all": true, "filter": {"author": "nobody"}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    assert_eq!(*backend.delete_calls.lock().unwrap(), vec!["like"]);
}

#[tokio::test]
async fn test_upsert_with_bad_date_is_bad_request() {
    let (status, _) = call(
        app(ScriptedBackend::new()),
        Method::POST,
        "/upsert",
        json!({
            "documents": [{
                "text": "t",
                "chunks": [{"text": "t", "metadata": {"created_at": "soon"}, "embedding": [1.0]}]
            }]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(start_paused = true)]
async fn test_command_completes() {
    let backend = ScriptedBackend::new();
    backend.script(&[(CommandStatus::Processing, None), (CommandStatus::Completed, None)]);

    let (status, body) = call(
        app(backend.clone()),
        Method::POST,
        "/commands",
        json!({"command": {"type": "MODIFY_NOTE", "content": {"text": "edit", "metadata": {}}}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["id"].as_str().is_some());
    assert_eq!(body["errors"], Value::Null);
}

#[tokio::test(start_paused = true)]
async fn test_command_times_out() {
    let (status, body) = call(
        app(ScriptedBackend::new()),
        Method::POST,
        "/commands",
        json!({"command": {"type": "DELETE_NOTE", "content": {"text": "old"}}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["errors"]
        .as_str()
        .unwrap()
        .contains("abandoned due to timeout"));
}
