//! Network Module
//!
//! The network collaborator the interceptor talks to, plus the request and
//! response types that flow through it.

mod upstream;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, Method, StatusCode};
use thiserror::Error;

use crate::cache::RequestKey;

pub use upstream::UpstreamClient;

// == Network Error ==
/// Failure reported by a [`Network`] implementation.
///
/// Any of these counts as "the network failed" for fallback purposes. An
/// HTTP error status is a successful fetch, not a `NetworkError`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// Connection refused, DNS failure, reset, ...
    #[error("upstream unreachable: {0}")]
    Unreachable(String),

    /// Connected, but the response body could not be read
    #[error("failed to read response body: {0}")]
    Body(String),

    /// The request URL could not be resolved against the upstream
    #[error("invalid upstream url: {0}")]
    InvalidUrl(String),
}

// == Network Trait ==
/// Something that can turn a request into a response.
#[async_trait]
pub trait Network: Send + Sync {
    /// Performs the request, yielding a fully buffered response.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetworkError>;
}

// == Fetch Request ==
/// An intercepted request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// HTTP method
    pub method: Method,
    /// Path and query, e.g. `/static/app.js?v=3`
    pub url: String,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Bytes,
}

impl FetchRequest {
    /// Creates a request with no headers or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Shorthand for a bare `GET`.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Identity under which this request's response is stored.
    pub fn key(&self) -> RequestKey {
        RequestKey::new(self.method.clone(), self.url.clone())
    }
}

// == Response Source ==
/// Where a returned response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Fresh from the network
    Network,
    /// Served from the store after a network failure
    Cache,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Cache => "cache",
        }
    }
}

// == Fetch Response ==
/// A fully buffered response.
///
/// The body is a `Bytes`, so cloning a response is how it gets duplicated
/// for the store.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Response headers, hop-by-hop headers already removed
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
    /// Network or cache
    pub source: ResponseSource,
}

impl FetchResponse {
    /// Creates a response that came from the network.
    pub fn from_network(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            source: ResponseSource::Network,
        }
    }

    /// Body as UTF-8 text, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

// == Header Helpers ==
const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
];

/// Removes headers that only apply to a single transport hop.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers listed in `Connection` are hop-by-hop too.
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_request_key_includes_method() {
        let get = FetchRequest::get("/page.html");
        let post = FetchRequest::new(Method::POST, "/page.html");

        assert_eq!(get.key().to_string(), "GET /page.html");
        assert_ne!(get.key(), post.key());
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("close, x-trace"));
        headers.insert("x-trace", HeaderValue::from_static("1"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert_eq!(headers[header::CONTENT_TYPE], "text/html");
    }

    #[test]
    fn test_response_source_as_str() {
        assert_eq!(ResponseSource::Network.as_str(), "network");
        assert_eq!(ResponseSource::Cache.as_str(), "cache");
    }
}
