//! API Module
//!
//! HTTP surface of the offline proxy.
//!
//! # Endpoints
//! - `GET /__offline/health` - Health check endpoint
//! - `GET /__offline/stats` - Interceptor counters
//! - everything else - network first, stored response on failure

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::{create_router, ADMIN_PREFIX};
