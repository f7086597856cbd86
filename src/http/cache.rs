//! Response cache decorator
//!
//! [`CachedTransport`] wraps any [`Transport`] and serves repeated requests
//! from its entry table. Entries are keyed by [`ApiRequest::signature`] and
//! expire after a configurable lifetime measured from when they were stored.
//! Only successful responses are stored.
//!
//! A cache opened with [`CachedTransport::persistent`] mirrors its entries to
//! a JSON file, so a later run within the lifetime is answered without
//! touching the API.

use super::transport::{ApiRequest, ApiResponse, Transport};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    response: ApiResponse,
    created_at: DateTime<Utc>,
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests answered from the cache
    pub hits: u64,
    /// Requests forwarded to the inner transport
    pub misses: u64,
}

/// Transport decorator with a response cache
pub struct CachedTransport<T> {
    inner: T,
    expire_after: Option<Duration>,
    entries: Mutex<HashMap<String, CacheEntry>>,
    stats: Mutex<CacheStats>,
    /// Cache file, when entries outlive the process
    path: Option<PathBuf>,
    /// Serializes writes to the cache file
    save_lock: tokio::sync::Mutex<()>,
}

impl<T: Transport> CachedTransport<T> {
    /// Wrap `inner` with an in-memory cache; `expire_after = None` keeps
    /// entries for the whole run
    pub fn new(inner: T, expire_after: Option<Duration>) -> Self {
        Self {
            inner,
            expire_after,
            entries: Mutex::new(HashMap::new()),
            stats: Mutex::new(CacheStats::default()),
            path: None,
            save_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Wrap `inner` with a cache backed by the file at `path`
    ///
    /// Fresh entries already in the file are served immediately. A missing
    /// file starts an empty cache.
    pub fn persistent(
        inner: T,
        expire_after: Option<Duration>,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut cache = Self::new(inner, expire_after);

        if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| {
                Error::config(format!("Failed to read cache file {}: {e}", path.display()))
            })?;
            let mut entries = parse_entries(&contents).map_err(|e| {
                Error::config(format!("Invalid cache file {}: {e}", path.display()))
            })?;
            entries.retain(|_, entry| cache.is_fresh(entry));
            debug!(path = %path.display(), entries = entries.len(), "Cache loaded");
            cache.entries = Mutex::new(entries);
        }

        cache.path = Some(path);
        Ok(cache)
    }

    /// Current hit/miss counters
    pub fn stats(&self) -> CacheStats {
        self.stats.lock().map(|s| *s).unwrap_or_default()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        self.expire_after.map_or(true, |ttl| {
            let age = Utc::now().signed_duration_since(entry.created_at);
            chrono::Duration::from_std(ttl).map_or(true, |ttl| age <= ttl)
        })
    }

    fn lookup(&self, key: &str) -> Option<ApiResponse> {
        let mut entries = self.entries.lock().ok()?;
        entries.retain(|_, entry| self.is_fresh(entry));
        entries.get(key).map(|entry| entry.response.clone())
    }

    fn store(&self, key: String, response: ApiResponse) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key,
                CacheEntry {
                    response,
                    created_at: Utc::now(),
                },
            );
        }
    }

    fn count(&self, hit: bool) {
        if let Ok(mut stats) = self.stats.lock() {
            if hit {
                stats.hits += 1;
            } else {
                stats.misses += 1;
            }
        }
    }

    /// Write every entry to the cache file
    pub async fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let _guard = self.save_lock.lock().await;
        let contents = {
            let entries = self
                .entries
                .lock()
                .map_err(|_| Error::Other("cache entry table poisoned".to_string()))?;
            serde_json::to_string(&*entries)?
        };

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, path).await?;

        debug!(path = %path.display(), "Cache saved");
        Ok(())
    }
}

#[async_trait]
impl<T: Transport> Transport for CachedTransport<T> {
    async fn get(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let key = request.signature();

        if let Some(response) = self.lookup(&key) {
            debug!(request = %key, "Cache hit");
            self.count(true);
            return Ok(response);
        }

        self.count(false);
        let response = self.inner.get(request).await?;
        self.store(key, response.clone());

        // A cache that cannot be written only costs future hits
        if let Err(e) = self.save().await {
            warn!(error = %e, "Failed to persist response cache");
        }
        Ok(response)
    }
}

impl<T> std::fmt::Debug for CachedTransport<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedTransport")
            .field("expire_after", &self.expire_after)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn parse_entries(contents: &str) -> serde_json::Result<HashMap<String, CacheEntry>> {
    if contents.trim().is_empty() {
        return Ok(HashMap::new());
    }
    serde_json::from_str(contents)
}
