//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use tokio::sync::RwLock;

use kakeibo_offline::cache::{CacheStorage, RequestKey};
use kakeibo_offline::{
    FetchRequest, FetchResponse, Interceptor, Network, NetworkError, WorkerSettings,
};

/// In-memory stand-in for the kakeibo server.
///
/// Serves whatever bodies were registered while online; every fetch fails
/// with `Unreachable` while offline. Counts calls so tests can tell whether
/// the network was consulted.
#[derive(Default)]
pub struct ScriptedNetwork {
    offline: AtomicBool,
    calls: AtomicUsize,
    routes: Mutex<HashMap<String, (StatusCode, String)>>,
}

impl ScriptedNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, url: &str, body: &str) {
        self.serve_status(url, StatusCode::OK, body);
    }

    pub fn serve_status(&self, url: &str, status: StatusCode, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body.to_string()));
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn go_online(&self) {
        self.offline.store(false, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::Unreachable(format!(
                "connection refused: {}",
                request.url
            )));
        }

        let (status, body) = self
            .routes
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .unwrap_or((StatusCode::NOT_FOUND, "not found".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        Ok(FetchResponse::from_network(status, headers, body))
    }
}

pub fn interceptor_with(network: Arc<ScriptedNetwork>, storage: CacheStorage) -> Interceptor {
    Interceptor::new(
        WorkerSettings::default(),
        Arc::new(RwLock::new(storage)),
        network,
    )
}

/// Installed and activated interceptor over an in-memory store.
pub async fn active_interceptor(network: Arc<ScriptedNetwork>) -> Interceptor {
    let interceptor = interceptor_with(network, CacheStorage::in_memory());
    interceptor.on_install().await.unwrap();
    interceptor.on_activate().await.unwrap();
    interceptor
}

/// Body currently stored for `GET url` in the current cache.
pub async fn stored_body(interceptor: &Interceptor, url: &str) -> Option<String> {
    let key = RequestKey::new(Method::GET, url);
    interceptor
        .storage()
        .read()
        .await
        .match_request(&interceptor.settings().cache_name, &key)
        .map(|entry| String::from_utf8_lossy(&entry.body).into_owned())
}

/// Polls until the background write for `url` has stored `expected`.
pub async fn wait_until_stored(interceptor: &Interceptor, url: &str, expected: &str) {
    for _ in 0..200 {
        if stored_body(interceptor, url).await.as_deref() == Some(expected) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "{} never stored with body {:?}, last seen {:?}",
        url,
        expected,
        stored_body(interceptor, url).await
    );
}
