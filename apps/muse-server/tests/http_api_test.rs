//! HTTP API integration tests for muse-server.
//!
//! Drives the router directly via tower's `oneshot`, the axum-native way
//! to test handlers without opening a socket.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use muse_match::LinearMatcher;
use muse_server::auth::AdminAuth;
use muse_server::config::MatchingConfig;
use muse_server::health::HealthChecker;
use muse_server::http::{router, AppState};
use muse_server::metrics::PrometheusMeter;
use muse_store::{DescriptorStore, MemoryCatalog};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

const TOKEN: &str = "test-secret";

fn app(store: Arc<DescriptorStore>) -> Router {
    router(AppState {
        store: Arc::clone(&store),
        matcher: Arc::new(LinearMatcher),
        auth: AdminAuth::new(TOKEN),
        matching: MatchingConfig::default(),
        meter: Arc::new(PrometheusMeter::new()),
        health_checker: Arc::new(HealthChecker::new(store)),
        serve_metrics: true,
    })
}

fn json_request(method: &str, uri: &str, authorized: bool, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if authorized {
        builder = builder.header("authorization", format!("Bearer {}", TOKEN));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn bare_request(method: &str, uri: &str, authorized: bool) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if authorized {
        builder = builder.header("authorization", format!("Bearer {}", TOKEN));
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn upsert_body(descriptors: &[(&str, &[f32])]) -> serde_json::Value {
    json!({
        "metadata": {"title": "test"},
        "descriptors": descriptors
            .iter()
            .map(|(id, v)| json!({"descriptor_id": id, "vector": v}))
            .collect::<Vec<_>>(),
    })
}

#[tokio::test]
async fn upsert_then_match_flow() {
    let store = Arc::new(DescriptorStore::in_memory());
    let app = app(store);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/artworks/starry-night",
            true,
            upsert_body(&[("front", &[0.9f32, 0.1, 0.0])]),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["artwork_id"], "starry-night");
    assert_eq!(body["descriptor_count"], 1);
    assert_eq!(body["dimension"], 3);

    // A raw (unnormalized) query close to the stored vector matches
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/match",
            false,
            json!({"vector": [9.0, 1.0, 0.0]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["matches"][0]["artwork_id"], "starry-night");
    assert!(body["matches"][0]["score"].as_f64().unwrap() > 0.99);
}

#[tokio::test]
async fn match_below_threshold_is_empty_ok() {
    let store = Arc::new(DescriptorStore::in_memory());
    store
        .upsert_artwork(
            "a",
            serde_json::Value::Null,
            vec![("d".to_string(), vec![1.0, 0.0])],
        )
        .unwrap();
    let app = app(store);

    // Orthogonal query with threshold 0.55: empty result, 200
    let response = app
        .oneshot(json_request(
            "POST",
            "/v1/match",
            false,
            json!({"vector": [0.0, 1.0], "threshold": 0.55}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["matches"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn mutations_require_token() {
    let store = Arc::new(DescriptorStore::in_memory());
    let app = app(Arc::clone(&store));

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/artworks/a",
            false,
            upsert_body(&[("d", &[1.0f32, 0.0])]),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(bare_request("DELETE", "/v1/artworks/a", false))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // No partial effect: the store never saw the artwork
    assert_eq!(store.snapshot().unwrap().artwork_count(), 0);
}

#[tokio::test]
async fn wrong_token_is_rejected() {
    let store = Arc::new(DescriptorStore::in_memory());
    let app = app(store);

    let request = Request::builder()
        .method("DELETE")
        .uri("/v1/artworks/a")
        .header("authorization", "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn dimension_mismatch_maps_to_422() {
    let store = Arc::new(DescriptorStore::in_memory());
    let app = app(store);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/artworks/a",
            true,
            upsert_body(&[("d", &[1.0f32, 0.0, 0.0])]),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Insert with a different dimension
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/artworks/b",
            true,
            upsert_body(&[("d", &[1.0f32, 0.0])]),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Query with a different dimension
    let response = app
        .oneshot(json_request(
            "POST",
            "/v1/match",
            false,
            json!({"vector": [1.0, 0.0]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn delete_unknown_artwork_is_404() {
    let store = Arc::new(DescriptorStore::in_memory());
    let app = app(store);

    let response = app
        .oneshot(bare_request("DELETE", "/v1/artworks/ghost", true))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_descriptor_and_cascade() {
    let store = Arc::new(DescriptorStore::in_memory());
    store
        .upsert_artwork(
            "a",
            serde_json::Value::Null,
            vec![
                ("d1".to_string(), vec![1.0, 0.0]),
                ("d2".to_string(), vec![0.0, 1.0]),
            ],
        )
        .unwrap();
    let app = app(Arc::clone(&store));

    let response = app
        .clone()
        .oneshot(bare_request("DELETE", "/v1/artworks/a/descriptors/d1", true))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(bare_request("DELETE", "/v1/artworks/a", true))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(store.snapshot().unwrap().descriptor_count(), 0);

    let response = app
        .oneshot(bare_request("DELETE", "/v1/artworks/a/descriptors/d2", true))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unloaded_store_reports_not_ready() {
    // A store over a durable backend that has not loaded yet
    let store = Arc::new(DescriptorStore::new(Box::new(MemoryCatalog::new())));
    let app = app(store);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/match",
            false,
            json!({"vector": [1.0, 0.0]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app
        .clone()
        .oneshot(bare_request("GET", "/health/quick", false))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app
        .oneshot(bare_request("GET", "/health", false))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "starting");
    assert_eq!(body["ready"], false);
}

#[tokio::test]
async fn status_and_catalog_listing() {
    let store = Arc::new(DescriptorStore::in_memory());
    store
        .upsert_artwork(
            "a",
            json!({"title": "A"}),
            vec![("d1".to_string(), vec![1.0, 0.0])],
        )
        .unwrap();
    store
        .upsert_artwork("b", json!({"title": "B"}), vec![])
        .unwrap();
    let app = app(store);

    let response = app
        .clone()
        .oneshot(bare_request("GET", "/v1/status", false))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["dimension"], 2);
    assert_eq!(body["artworks"], 2);
    assert_eq!(body["descriptors"], 1);

    let response = app
        .clone()
        .oneshot(bare_request("GET", "/v1/artworks", false))
        .await
        .unwrap();
    let body = body_json(response).await;
    let listing = body.as_array().unwrap();
    assert_eq!(listing.len(), 2);

    let response = app
        .oneshot(bare_request("GET", "/v1/artworks/a", false))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["metadata"]["title"], "A");
    assert_eq!(body["descriptor_ids"][0], "d1");
}

#[tokio::test]
async fn invalid_match_parameters_are_400() {
    let store = Arc::new(DescriptorStore::in_memory());
    let app = app(store);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/match",
            false,
            json!({"vector": [1.0, 0.0], "threshold": 2.0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request(
            "POST",
            "/v1/match",
            false,
            json!({"vector": [], "threshold": 0.5}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn limit_is_capped_and_ordering_deterministic() {
    let store = Arc::new(DescriptorStore::in_memory());
    // Best scores 0.9, 0.9, 0.4 for ids "b", "a", "c"
    let y9 = (1.0f32 - 0.81).sqrt();
    let y4 = (1.0f32 - 0.16).sqrt();
    for (id, v) in [("b", [0.9, y9]), ("a", [0.9, y9]), ("c", [0.4, y4])] {
        store
            .upsert_artwork(id, serde_json::Value::Null, vec![("d".to_string(), v.to_vec())])
            .unwrap();
    }
    let app = app(store);

    let response = app
        .oneshot(json_request(
            "POST",
            "/v1/match",
            false,
            json!({"vector": [1.0, 0.0], "threshold": 0.5, "limit": 2}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let matches = body["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0]["artwork_id"], "a");
    assert_eq!(matches[1]["artwork_id"], "b");
}

#[tokio::test]
async fn metrics_endpoint_exports_prometheus_text() {
    let store = Arc::new(DescriptorStore::in_memory());
    store
        .upsert_artwork(
            "a",
            serde_json::Value::Null,
            vec![("d".to_string(), vec![1.0, 0.0])],
        )
        .unwrap();
    let app = app(store);

    let response = app
        .oneshot(bare_request("GET", "/metrics", false))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/plain"));
}
