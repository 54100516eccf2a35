//! Cache Storage Module
//!
//! Named response caches, persisted as one JSON file per cache.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{CachedResponse, RequestKey};
use crate::error::{ProxyError, Result};

const CACHE_FILE_EXT: &str = "json";

// == Response Cache ==
/// A single named cache mapping request identity to response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseCache {
    /// Cache name, e.g. `kakeibo-v1`
    name: String,
    /// Stored responses keyed by `"<METHOD> <url>"`
    entries: BTreeMap<String, CachedResponse>,
}

impl ResponseCache {
    // == Constructor ==
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // == Match ==
    /// Looks up the stored response for a request.
    pub fn match_request(&self, key: &RequestKey) -> Option<&CachedResponse> {
        self.entries.get(&key.to_string())
    }

    // == Put ==
    /// Stores a response, returning the one it replaced.
    pub fn put(&mut self, key: &RequestKey, entry: CachedResponse) -> Option<CachedResponse> {
        self.entries.insert(key.to_string(), entry)
    }

    // == Delete ==
    /// Removes the entry for a request. Returns true if one existed.
    pub fn delete(&mut self, key: &RequestKey) -> bool {
        self.entries.remove(&key.to_string()).is_some()
    }

    /// Stored keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Total body bytes held.
    pub fn size(&self) -> usize {
        self.entries.values().map(CachedResponse::size).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Cache Storage ==
/// The set of named caches, optionally backed by a directory.
#[derive(Debug, Default)]
pub struct CacheStorage {
    /// Backing directory; `None` keeps everything in memory
    dir: Option<PathBuf>,
    /// Caches by name
    caches: BTreeMap<String, ResponseCache>,
    /// Bumped for every change that must reach disk
    generation: u64,
    /// Newest generation on disk per cache; also serializes file writes
    written: Arc<Mutex<BTreeMap<String, u64>>>,
}

impl CacheStorage {
    // == Constructors ==
    /// Creates a storage that never touches disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens a storage directory, loading every cache file found in it.
    ///
    /// The directory is created if missing. Unreadable or corrupt cache files
    /// are skipped with a warning.
    pub async fn open_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;

        let mut caches = BTreeMap::new();
        let mut read_dir = fs::read_dir(&dir).await?;
        while let Some(dirent) = read_dir.next_entry().await? {
            let path = dirent.path();
            if path.extension().and_then(|e| e.to_str()) != Some(CACHE_FILE_EXT) {
                continue;
            }

            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            match load_cache_file(&path).await {
                Ok(cache) if cache.name() != stem => {
                    warn!(
                        "Skipping cache file {:?}: holds cache '{}'",
                        path,
                        cache.name()
                    );
                }
                Ok(cache) if validate_cache_name(cache.name()).is_ok() => {
                    debug!("Loaded cache '{}' ({} entries)", cache.name(), cache.len());
                    caches.insert(cache.name().to_string(), cache);
                }
                Ok(cache) => {
                    warn!("Skipping cache file {:?}: bad name '{}'", path, cache.name());
                }
                Err(e) => {
                    warn!("Skipping unreadable cache file {:?}: {}", path, e);
                }
            }
        }

        info!("Cache storage opened at {:?} with {} cache(s)", dir, caches.len());
        Ok(Self {
            dir: Some(dir),
            caches,
            ..Self::default()
        })
    }

    /// Backing directory, if any.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    // == Open ==
    /// Opens a named cache, creating and persisting it if absent.
    pub async fn open(&mut self, name: &str) -> Result<&mut ResponseCache> {
        validate_cache_name(name)?;

        if !self.caches.contains_key(name) {
            self.caches
                .insert(name.to_string(), ResponseCache::new(name));
            if let Some(pending) = self.snapshot(name) {
                pending.commit().await?;
            }
            info!("Created cache '{}'", name);
        }

        self.caches
            .get_mut(name)
            .ok_or_else(|| ProxyError::Storage(format!("cache '{}' vanished after open", name)))
    }

    /// Returns true if a cache with this name exists.
    pub fn has(&self, name: &str) -> bool {
        self.caches.contains_key(name)
    }

    /// Borrows a named cache without creating it.
    pub fn get(&self, name: &str) -> Option<&ResponseCache> {
        self.caches.get(name)
    }

    // == Match ==
    /// Looks up a response in the named cache. A missing cache is a miss.
    pub fn match_request(&self, name: &str, key: &RequestKey) -> Option<CachedResponse> {
        self.caches
            .get(name)
            .and_then(|cache| cache.match_request(key))
            .cloned()
    }

    // == Put ==
    /// Stores a response in the named cache and persists it.
    ///
    /// Overwrites any previous entry for the same key.
    pub async fn put(&mut self, name: &str, key: &RequestKey, entry: CachedResponse) -> Result<()> {
        if let Some(pending) = self.stage_put(name, key, entry)? {
            pending.commit().await?;
        }
        Ok(())
    }

    /// Stores a response in memory and returns the disk write still owed.
    ///
    /// The [`PendingWrite`] can be committed after the storage lock is
    /// released. `None` means there is nothing to write (in-memory storage).
    pub fn stage_put(
        &mut self,
        name: &str,
        key: &RequestKey,
        entry: CachedResponse,
    ) -> Result<Option<PendingWrite>> {
        if !key.is_storable() {
            return Err(ProxyError::InvalidRequest(format!(
                "only GET responses can be stored, got {}",
                key
            )));
        }
        validate_cache_name(name)?;

        self.caches
            .entry(name.to_string())
            .or_insert_with(|| ResponseCache::new(name))
            .put(key, entry);
        Ok(self.snapshot(name))
    }

    // == Delete ==
    /// Deletes a named cache and its file. Returns true if it existed.
    pub async fn delete(&mut self, name: &str) -> Result<bool> {
        if self.caches.remove(name).is_none() {
            return Ok(false);
        }

        if let Some(dir) = &self.dir {
            // Supersede any write staged before the delete
            self.generation += 1;
            let mut written = self.written.lock().await;
            written.insert(name.to_string(), self.generation);

            match fs::remove_file(cache_file(dir, name)).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(true)
    }

    /// All cache names in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.caches.keys().cloned().collect()
    }

    /// Copies a cache for writing, stamped with a fresh generation.
    fn snapshot(&mut self, name: &str) -> Option<PendingWrite> {
        let dir = self.dir.as_ref()?;
        let cache = self.caches.get(name)?;
        self.generation += 1;

        Some(PendingWrite {
            name: name.to_string(),
            path: cache_file(dir, name),
            generation: self.generation,
            cache: cache.clone(),
            written: self.written.clone(),
        })
    }
}

// == Pending Write ==
/// A copy of one cache waiting to be written to `<name>.json`.
///
/// Writes are serialized per storage; one older than what is already on
/// disk is skipped, so the file always ends up at the newest state.
#[derive(Debug)]
pub struct PendingWrite {
    name: String,
    path: PathBuf,
    generation: u64,
    cache: ResponseCache,
    written: Arc<Mutex<BTreeMap<String, u64>>>,
}

impl PendingWrite {
    /// Writes the cache via a temp file and rename.
    pub async fn commit(self) -> Result<()> {
        let mut written = self.written.lock().await;
        if written
            .get(&self.name)
            .is_some_and(|&on_disk| on_disk >= self.generation)
        {
            debug!("Skipping superseded write of cache '{}'", self.name);
            return Ok(());
        }

        let json = serde_json::to_vec(&self.cache)?;
        let tmp = self.path.with_extension("json.tmp");

        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;
        written.insert(self.name, self.generation);
        Ok(())
    }
}

fn cache_file(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.{}", name, CACHE_FILE_EXT))
}

async fn load_cache_file(path: &Path) -> Result<ResponseCache> {
    let bytes = fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Cache names become file names, so keep them to a safe alphabet.
pub fn validate_cache_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(ProxyError::InvalidRequest(format!(
            "invalid cache name '{}'",
            name
        )))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};
    use chrono::Utc;

    fn entry(body: &str) -> CachedResponse {
        CachedResponse {
            status: StatusCode::OK,
            headers: vec![("content-type".to_string(), b"text/html".to_vec())],
            body: body.as_bytes().to_vec(),
            stored_at: Utc::now(),
        }
    }

    fn get(url: &str) -> RequestKey {
        RequestKey::new(Method::GET, url)
    }

    #[test]
    fn test_response_cache_put_and_match() {
        let mut cache = ResponseCache::new("kakeibo-v1");
        assert!(cache.put(&get("/"), entry("root")).is_none());

        assert_eq!(cache.match_request(&get("/")).unwrap().body, b"root");
        assert!(cache.match_request(&get("/other")).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_response_cache_overwrite() {
        let mut cache = ResponseCache::new("kakeibo-v1");
        cache.put(&get("/page.html"), entry("first"));
        let previous = cache.put(&get("/page.html"), entry("second"));

        assert_eq!(previous.unwrap().body, b"first");
        assert_eq!(cache.match_request(&get("/page.html")).unwrap().body, b"second");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_response_cache_delete() {
        let mut cache = ResponseCache::new("kakeibo-v1");
        cache.put(&get("/"), entry("root"));

        assert!(cache.delete(&get("/")));
        assert!(!cache.delete(&get("/")));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_response_cache_size() {
        let mut cache = ResponseCache::new("kakeibo-v1");
        cache.put(&get("/a"), entry("1234"));
        cache.put(&get("/b"), entry("56"));
        assert_eq!(cache.size(), 6);
        assert_eq!(cache.keys(), vec!["GET /a", "GET /b"]);
    }

    #[tokio::test]
    async fn test_storage_open_creates_once() {
        let mut storage = CacheStorage::in_memory();
        storage.open("kakeibo-v1").await.unwrap().put(&get("/"), entry("root"));

        // Re-opening keeps existing entries
        let cache = storage.open("kakeibo-v1").await.unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(storage.keys(), vec!["kakeibo-v1"]);
    }

    #[tokio::test]
    async fn test_storage_match_missing_cache_is_miss() {
        let storage = CacheStorage::in_memory();
        assert!(storage.match_request("kakeibo-v1", &get("/")).is_none());
        assert!(!storage.has("kakeibo-v1"));
    }

    #[tokio::test]
    async fn test_storage_put_rejects_non_get() {
        let mut storage = CacheStorage::in_memory();
        let key = RequestKey::new(Method::POST, "/form");

        let result = storage.put("kakeibo-v1", &key, entry("x")).await;
        assert!(matches!(result, Err(ProxyError::InvalidRequest(_))));
        assert!(storage.match_request("kakeibo-v1", &key).is_none());
    }

    #[tokio::test]
    async fn test_storage_delete() {
        let mut storage = CacheStorage::in_memory();
        storage.put("kakeibo-v0", &get("/"), entry("old")).await.unwrap();

        assert!(storage.delete("kakeibo-v0").await.unwrap());
        assert!(!storage.delete("kakeibo-v0").await.unwrap());
        assert!(storage.keys().is_empty());
    }

    #[tokio::test]
    async fn test_storage_open_rejects_bad_names() {
        let mut storage = CacheStorage::in_memory();
        for name in ["", "../escape", ".hidden", "a/b", "spa ce"] {
            assert!(storage.open(name).await.is_err(), "accepted {:?}", name);
        }
    }

    #[test]
    fn test_validate_cache_name() {
        assert!(validate_cache_name("kakeibo-v1").is_ok());
        assert!(validate_cache_name("kakeibo_v1.2").is_ok());
        assert!(validate_cache_name("..").is_err());
    }
}
