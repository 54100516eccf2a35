//! Error types for the offline proxy
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::network::NetworkError;

// == Proxy Error Enum ==
/// Unified error type for the offline proxy.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Network fetch failed and the request was not eligible for fallback
    #[error("Network error: {0}")]
    Network(NetworkError),

    /// Network fetch failed and no stored response exists for the request
    #[error("Offline and not cached: {0}")]
    Offline(String),

    /// Reading or writing the cache storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Lifecycle event arrived in the wrong worker state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// A URL the upstream cannot resolve is the caller's fault, not an outage.
impl From<NetworkError> for ProxyError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::InvalidUrl(msg) => ProxyError::InvalidRequest(msg),
            other => ProxyError::Network(other),
        }
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        ProxyError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        ProxyError::Storage(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::Network(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Offline(_) => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::InvalidState(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the offline proxy.
pub type Result<T> = std::result::Result<T, ProxyError>;
