//! API Routes
//!
//! Configures the Axum router: the proxy's own endpoints plus a catch-all
//! that sends everything else through the interceptor.

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{health_handler, proxy_handler, stats_handler, AppState};

/// Path prefix reserved for the proxy's own endpoints.
pub const ADMIN_PREFIX: &str = "/__offline";

/// Creates the main router.
///
/// # Endpoints
/// - `GET /__offline/health` - Health check endpoint
/// - `GET /__offline/stats` - Interceptor counters
/// - anything else - proxied through the interceptor
///
/// # Middleware
/// - CORS: Allows any origin, on the proxy's own endpoints only
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Proxied responses keep the upstream's CORS headers untouched
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin: Router<AppState> = Router::new()
        .route(&format!("{}/health", ADMIN_PREFIX), get(health_handler))
        .route(&format!("{}/stats", ADMIN_PREFIX), get(stats_handler))
        .layer(cors);

    Router::new()
        .merge(admin)
        .fallback(proxy_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
