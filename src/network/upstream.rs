//! Upstream Client
//!
//! reqwest-backed [`Network`] that forwards requests to the application server.

use async_trait::async_trait;
use axum::http::header;
use reqwest::{redirect, Client, Url};
use tracing::debug;

use super::{strip_hop_by_hop, FetchRequest, FetchResponse, Network, NetworkError};

/// Forwards intercepted requests to a fixed upstream origin.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    base: Url,
}

impl UpstreamClient {
    /// Creates a client for the given base URL, e.g. `http://127.0.0.1:8080`.
    ///
    /// Redirects are not followed; they are handed back to the caller like
    /// any other response.
    pub fn new(base_url: &str) -> Result<Self, NetworkError> {
        let base = Url::parse(base_url)
            .map_err(|e| NetworkError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| NetworkError::Unreachable(e.to_string()))?;

        Ok(Self { client, base })
    }

    /// Upstream base URL.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolves an origin-relative path against the base.
    ///
    /// Anything that would leave the upstream origin, such as `//host/x` or
    /// an absolute URL, is rejected.
    fn resolve(&self, url: &str) -> Result<Url, NetworkError> {
        if !url.starts_with('/') || url.starts_with("//") {
            return Err(NetworkError::InvalidUrl(format!(
                "{}: not an origin-relative path",
                url
            )));
        }

        let target = self
            .base
            .join(url)
            .map_err(|e| NetworkError::InvalidUrl(format!("{}: {}", url, e)))?;

        if target.origin() != self.base.origin() {
            return Err(NetworkError::InvalidUrl(format!(
                "{}: resolves outside {}",
                url,
                self.base.origin().ascii_serialization()
            )));
        }

        Ok(target)
    }
}

#[async_trait]
impl Network for UpstreamClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetworkError> {
        let url = self.resolve(&request.url)?;

        let mut headers = request.headers.clone();
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);
        strip_hop_by_hop(&mut headers);

        debug!("Forwarding {} {}", request.method, url);

        let response = self
            .client
            .request(request.method.clone(), url)
            .headers(headers)
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| NetworkError::Unreachable(e.to_string()))?;

        let status = response.status();
        let mut headers = response.headers().clone();
        strip_hop_by_hop(&mut headers);
        headers.remove(header::CONTENT_LENGTH);

        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::Body(e.to_string()))?;

        Ok(FetchResponse::from_network(status, headers, body))
    }
}
