//! API Handlers
//!
//! The catch-all proxy handler plus the proxy's own health and stats endpoints.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::HeaderValue,
    response::Response,
    Json,
};

use crate::cache::MAX_BODY_SIZE;
use crate::error::{ProxyError, Result};
use crate::models::{HealthResponse, StatsResponse};
use crate::network::{FetchRequest, FetchResponse};
use crate::worker::Interceptor;

/// Response header naming where a proxied response came from.
pub const SOURCE_HEADER: &str = "x-kakeibo-source";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The interceptor every proxied request goes through
    pub interceptor: Arc<Interceptor>,
}

impl AppState {
    /// Creates a new AppState around an interceptor.
    pub fn new(interceptor: Interceptor) -> Self {
        Self {
            interceptor: Arc::new(interceptor),
        }
    }
}

/// Fallback handler for every path not owned by the proxy.
///
/// Buffers the request, hands it to the interceptor, and streams back
/// whatever it answers with, tagged with [`SOURCE_HEADER`].
pub async fn proxy_handler(State(state): State<AppState>, request: Request) -> Result<Response> {
    let (parts, body) = request.into_parts();

    let body = to_bytes(body, MAX_BODY_SIZE)
        .await
        .map_err(|e| ProxyError::InvalidRequest(format!("failed to read request body: {}", e)))?;

    let url = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let fetch = FetchRequest {
        method: parts.method,
        url,
        headers: parts.headers,
        body,
    };

    let response = state.interceptor.on_fetch(fetch).await?;
    Ok(into_http_response(response))
}

fn into_http_response(response: FetchResponse) -> Response {
    let mut http = Response::new(Body::from(response.body));
    *http.status_mut() = response.status;
    *http.headers_mut() = response.headers;
    http.headers_mut().insert(
        SOURCE_HEADER,
        HeaderValue::from_static(response.source.as_str()),
    );
    http
}

/// Handler for GET /__offline/stats
///
/// Returns interceptor counters and the size of the current cache.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let interceptor = &state.interceptor;
    let cache_name = interceptor.settings().cache_name.clone();

    let cached_entries = {
        let storage = interceptor.storage().read().await;
        storage.get(&cache_name).map(|c| c.len()).unwrap_or(0)
    };

    Json(StatsResponse::new(
        interceptor.state().await,
        cache_name,
        cached_entries,
        interceptor.stats(),
    ))
}

/// Handler for GET /__offline/health
///
/// Returns health status of the proxy itself, regardless of the upstream.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
