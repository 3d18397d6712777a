//! # SWKit Cache
//!
//! Versioned request/response cache store for the SWKit worker runtime.
//!
//! ## Features
//!
//! - **CacheStorage**: named stores, at most one per cache version
//! - **Cache**: request-identity (method + URL) keyed response captures
//! - **Activation sweep**: `purge_except` deletes every stale store
//! - **All-or-nothing install**: build a detached `Cache`, commit it whole
//!
//! ## Architecture
//!
//! ```text
//! CacheStorage
//!     └── Cache ("pwa-notify-v1")
//!             └── CacheKey { method, url } → CacheEntry
//! ```

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use swkit_common::{OptionExt, Result};
use tracing::debug;

// ==================== Cache Key ====================

/// Request identity: URL plus method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Request method (uppercase).
    pub method: String,

    /// Request URL.
    pub url: String,
}

impl CacheKey {
    /// Create a key for a request.
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
        }
    }

    /// Create a GET key, the only method the interception policy caches.
    pub fn get(url: &str) -> Self {
        Self::new("GET", url)
    }
}

// ==================== Cache Entry ====================

/// A cached request/response pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Request URL.
    pub url: String,

    /// Request method.
    pub method: String,

    /// Response status.
    pub status: u16,

    /// Response headers.
    pub headers: HashMap<String, String>,

    /// Response body.
    pub body: Vec<u8>,

    /// Cached at timestamp (ms since epoch).
    pub cached_at: u64,
}

impl CacheEntry {
    /// Capture a response for a GET request.
    pub fn capture(
        url: &str,
        status: u16,
        headers: HashMap<String, String>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            url: url.to_string(),
            method: "GET".to_string(),
            status,
            headers,
            body,
            cached_at: now_millis(),
        }
    }

    /// The request identity this entry is stored under.
    pub fn key(&self) -> CacheKey {
        CacheKey::new(&self.method, &self.url)
    }
}

// ==================== Cache ====================

/// A single named cache store.
#[derive(Debug, Default)]
pub struct Cache {
    /// Cache name.
    pub name: String,

    /// Cached entries.
    entries: HashMap<CacheKey, CacheEntry>,
}

impl Cache {
    /// Create a new cache.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: HashMap::new(),
        }
    }

    /// Match a request by identity.
    pub fn match_request(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Match a GET request by URL.
    pub fn match_url(&self, url: &str) -> Option<&CacheEntry> {
        self.entries.get(&CacheKey::get(url))
    }

    /// Store an entry, overwriting any prior entry for the same identity.
    /// Overwrites are last-write-wins and always safe.
    pub fn put(&mut self, entry: CacheEntry) {
        self.entries.insert(entry.key(), entry);
    }

    /// Delete an entry.
    pub fn delete(&mut self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Get all keys.
    pub fn keys(&self) -> Vec<&CacheKey> {
        self.entries.keys().collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ==================== Cache Storage ====================

/// Cache storage: the set of named stores.
#[derive(Debug, Default)]
pub struct CacheStorage {
    caches: HashMap<String, Cache>,
}

impl CacheStorage {
    /// Create new cache storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store (creates if absent).
    pub fn open(&mut self, name: &str) -> &mut Cache {
        self.caches
            .entry(name.to_string())
            .or_insert_with(|| Cache::new(name))
    }

    /// Get a store, erroring if absent.
    pub fn get(&self, name: &str) -> Result<&Cache> {
        self.caches.get(name).ok_or_not_found(name)
    }

    /// Commit a fully built store, replacing any prior store of the same
    /// name. Install builds its store detached and commits it here only
    /// once every asset fetch succeeded.
    pub fn commit(&mut self, cache: Cache) {
        debug!(name = %cache.name, entries = cache.len(), "committing cache store");
        self.caches.insert(cache.name.clone(), cache);
    }

    /// Check if a store exists.
    pub fn has(&self, name: &str) -> bool {
        self.caches.contains_key(name)
    }

    /// Delete a store.
    pub fn delete(&mut self, name: &str) -> bool {
        self.caches.remove(name).is_some()
    }

    /// Get all store names.
    pub fn keys(&self) -> Vec<&str> {
        self.caches.keys().map(|s| s.as_str()).collect()
    }

    /// Delete every store except the named one, returning the deleted
    /// names. Used by the activation sweep.
    pub fn purge_except(&mut self, keep: &str) -> Vec<String> {
        let stale: Vec<String> = self
            .caches
            .keys()
            .filter(|name| name.as_str() != keep)
            .cloned()
            .collect();
        for name in &stale {
            self.caches.remove(name);
            debug!(name = %name, "deleted stale cache store");
        }
        stale
    }
}

// ==================== Helpers ====================

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str) -> CacheEntry {
        CacheEntry::capture(url, 200, HashMap::new(), b"body".to_vec())
    }

    #[test]
    fn test_cache_put_and_match() {
        let mut cache = Cache::new("pwa-notify-v1");
        cache.put(entry("https://example.com/icon-192.png"));

        assert!(cache.match_url("https://example.com/icon-192.png").is_some());
        assert!(cache.match_url("https://example.com/other.png").is_none());
    }

    #[test]
    fn test_cache_key_includes_method() {
        let mut cache = Cache::new("pwa-notify-v1");
        cache.put(entry("https://example.com/"));

        assert!(cache
            .match_request(&CacheKey::new("get", "https://example.com/"))
            .is_some());
        assert!(cache
            .match_request(&CacheKey::new("POST", "https://example.com/"))
            .is_none());
    }

    #[test]
    fn test_cache_put_overwrites() {
        let mut cache = Cache::new("pwa-notify-v1");
        cache.put(entry("https://example.com/"));

        let mut updated = entry("https://example.com/");
        updated.body = b"fresh".to_vec();
        cache.put(updated);

        assert_eq!(cache.len(), 1);
        let matched = cache.match_url("https://example.com/").unwrap();
        assert_eq!(matched.body, b"fresh");
    }

    #[test]
    fn test_cache_delete() {
        let mut cache = Cache::new("pwa-notify-v1");
        cache.put(entry("https://example.com/favicon.ico"));

        assert!(cache.delete(&CacheKey::get("https://example.com/favicon.ico")));
        assert!(cache.match_url("https://example.com/favicon.ico").is_none());
        assert!(!cache.delete(&CacheKey::get("https://example.com/favicon.ico")));
    }

    #[test]
    fn test_storage_open_and_delete() {
        let mut storage = CacheStorage::new();

        assert!(!storage.has("pwa-notify-v1"));
        storage.open("pwa-notify-v1");
        assert!(storage.has("pwa-notify-v1"));

        assert!(storage.delete("pwa-notify-v1"));
        assert!(!storage.has("pwa-notify-v1"));
    }

    #[test]
    fn test_storage_commit_replaces() {
        let mut storage = CacheStorage::new();
        storage.open("pwa-notify-v1").put(entry("https://example.com/old"));

        let mut fresh = Cache::new("pwa-notify-v1");
        fresh.put(entry("https://example.com/new"));
        storage.commit(fresh);

        let store = storage.get("pwa-notify-v1").unwrap();
        assert!(store.match_url("https://example.com/old").is_none());
        assert!(store.match_url("https://example.com/new").is_some());
    }

    #[test]
    fn test_storage_purge_except() {
        let mut storage = CacheStorage::new();
        storage.open("pwa-notify-v1");
        storage.open("pwa-notify-v0");
        storage.open("some-other-cache");

        let mut deleted = storage.purge_except("pwa-notify-v1");
        deleted.sort();
        assert_eq!(deleted, vec!["pwa-notify-v0", "some-other-cache"]);

        assert_eq!(storage.keys(), vec!["pwa-notify-v1"]);
    }

    #[test]
    fn test_storage_get_missing() {
        let storage = CacheStorage::new();
        assert!(storage.get("pwa-notify-v1").is_err());
    }
}
