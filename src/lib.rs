//! Kakeibo Offline - network-first, cache-fallback proxy for the kakeibo web app
//!
//! Forwards every request to the application server and keeps a persistent
//! copy of each response, so the app shell still loads when the server is
//! unreachable. `/api/` requests are never cached.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod network;
pub mod tasks;
pub mod worker;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{ProxyError, Result};
pub use network::{FetchRequest, FetchResponse, Network, NetworkError, UpstreamClient};
pub use worker::{Interceptor, WorkerEvent, WorkerSettings};
