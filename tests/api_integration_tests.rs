//! Integration Tests for the HTTP Surface
//!
//! Tests full request/response cycles through the router.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use common::{active_interceptor, wait_until_stored, ScriptedNetwork};
use kakeibo_offline::api::SOURCE_HEADER;
use kakeibo_offline::{create_router, AppState};

// == Helper Functions ==

async fn body_to_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX).await.unwrap().to_vec()
}

async fn body_to_json(body: Body) -> Value {
    serde_json::from_slice(&body_to_bytes(body).await).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// == Proxy ==

#[tokio::test]
async fn test_proxy_serves_network_then_cache() {
    let network = ScriptedNetwork::new();
    network.serve("/", "<html>root</html>");
    let state = AppState::new(active_interceptor(network.clone()).await);
    let app: Router = create_router(state.clone());

    // Online: straight from the network
    let response = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[SOURCE_HEADER], "network");
    assert_eq!(response.headers()["content-type"], "text/html; charset=utf-8");
    assert_eq!(body_to_bytes(response.into_body()).await, b"<html>root</html>");

    // Offline: the copy seeded on install
    network.go_offline();
    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[SOURCE_HEADER], "cache");
    assert_eq!(body_to_bytes(response.into_body()).await, b"<html>root</html>");
}

#[tokio::test]
async fn test_proxy_keeps_query_in_identity() {
    let network = ScriptedNetwork::new();
    network.serve("/static/app.js?v=1", "v1");
    let interceptor = active_interceptor(network.clone()).await;
    let state = AppState::new(interceptor);
    let app = create_router(state.clone());

    let response = app.clone().oneshot(get("/static/app.js?v=1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    wait_until_stored(&state.interceptor, "/static/app.js?v=1", "v1").await;

    network.go_offline();
    let hit = app.clone().oneshot(get("/static/app.js?v=1")).await.unwrap();
    assert_eq!(hit.status(), StatusCode::OK);

    let miss = app.oneshot(get("/static/app.js?v=2")).await.unwrap();
    assert_eq!(miss.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_offline_miss_is_json_error() {
    let network = ScriptedNetwork::new();
    let app = create_router(AppState::new(active_interceptor(network.clone()).await));
    network.go_offline();

    let response = app.oneshot(get("/page.html")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("GET /page.html"));
}

#[tokio::test]
async fn test_api_failure_is_bad_gateway() {
    let network = ScriptedNetwork::new();
    let app = create_router(AppState::new(active_interceptor(network.clone()).await));
    network.go_offline();

    let response = app.oneshot(get("/api/accounts")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("unreachable"));
}

#[tokio::test]
async fn test_post_is_forwarded() {
    let network = ScriptedNetwork::new();
    network.serve("/api/transactions", r#"{"ok":true}"#);
    let app = create_router(AppState::new(active_interceptor(network.clone()).await));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/transactions")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"amount":1200,"type":"expense"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(network.calls(), 2); // install seed + this request
}

// == Own Endpoints ==

#[tokio::test]
async fn test_health_endpoint() {
    let network = ScriptedNetwork::new();
    let app = create_router(AppState::new(active_interceptor(network.clone()).await));
    network.go_offline();

    // Health never depends on the upstream
    let response = app.oneshot(get("/__offline/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
    assert_eq!(network.calls(), 1);
}

#[tokio::test]
async fn test_stats_endpoint_counts_requests() {
    let network = ScriptedNetwork::new();
    network.serve("/", "root");
    network.serve("/api/tags", "[]");
    let state = AppState::new(active_interceptor(network.clone()).await);
    let app = create_router(state);

    app.clone().oneshot(get("/")).await.unwrap();
    app.clone().oneshot(get("/api/tags")).await.unwrap();
    network.go_offline();
    app.clone().oneshot(get("/")).await.unwrap();
    app.clone().oneshot(get("/missing.css")).await.unwrap();

    let response = app.oneshot(get("/__offline/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["state"], "activated");
    assert_eq!(json["cache_name"], "kakeibo-v1");
    assert_eq!(json["network"], 1);
    assert_eq!(json["bypassed"], 1);
    assert_eq!(json["fallback_hits"], 1);
    assert_eq!(json["fallback_misses"], 1);
    assert_eq!(json["fallback_hit_rate"], 0.5);
    assert_eq!(json["cached_entries"], 1);
}
