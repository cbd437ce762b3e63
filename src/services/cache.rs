//! Response caching with TTL
//!
//! Remote responses are cached under a fixed key schema so repeated report
//! views don't hit the API. Storage is behind [`CacheStore`]; the default
//! store keeps one JSON file per key under `~/.vxf-reports/cache`.

use crate::types::{Result, VxfError};
use directories::BaseDirs;
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Namespace prepended to every key written by this crate
pub const KEY_NAMESPACE: &str = "vxf_";

/// Default time-to-live for cached responses (one hour)
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Cache key schema
pub mod keys {
    /// Single list-endpoint page
    pub fn page(page: u32, limit: u32) -> String {
        format!("transactions_{}_{}", page, limit)
    }

    /// Whole pagination run
    pub fn all_transactions(limit: u32, max_pages: u32) -> String {
        format!("all_transactions_{}_{}", limit, max_pages)
    }

    /// Aggregate endpoint for a date range
    pub fn daily(start: &str, end: &str) -> String {
        format!("daily_{}_{}", start, end)
    }
}

/// Key-value store with per-entry expiry
pub trait CacheStore {
    /// Fetch a live entry; expired entries read as `None`
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<()>;
    /// Remove every entry whose key starts with `prefix`, returning how many
    fn delete_by_prefix(&self, prefix: &str) -> Result<usize>;
}

/// In-process entry with expiration time
struct MemoryEntry {
    value: Value,
    expires_at: Instant,
}

/// Process-local store
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, MemoryEntry>>> {
        self.entries
            .lock()
            .map_err(|_| VxfError::Cache("memory store lock poisoned".into()))
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.lock()?;
        Ok(entries
            .get(key)
            .filter(|entry| Instant::now() < entry.expires_at)
            .map(|entry| entry.value.clone()))
    }

    fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<()> {
        self.lock()?.insert(
            key.to_string(),
            MemoryEntry {
                value: value.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    fn delete_by_prefix(&self, prefix: &str) -> Result<usize> {
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before - entries.len())
    }
}

/// On-disk representation of a cached value
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheFile {
    pub key: String,
    /// Unix timestamp after which the entry is stale
    pub expires_at: i64,
    pub value: Value,
}

/// Store keeping one `{key}.json` file per entry
pub struct FileStore {
    cache_dir: PathBuf,
}

impl FileStore {
    /// Create a store in the default cache directory (~/.vxf-reports/cache)
    pub fn new() -> Result<Self> {
        let base_dirs = BaseDirs::new()
            .ok_or_else(|| VxfError::Cache("Cannot determine home directory".into()))?;
        let cache_dir = base_dirs.home_dir().join(".vxf-reports").join("cache");
        Self::with_cache_dir(cache_dir)
    }

    /// Create a store in a custom cache directory
    pub fn with_cache_dir(cache_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get the file path for a key
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }

    fn lock_file(&self) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.cache_dir.join(".lock"))?;
        Ok(file)
    }
}

impl CacheStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let lock = self.lock_file()?;
        FileExt::lock_shared(&lock)?;
        let content = fs::read_to_string(&path);
        let _ = FileExt::unlock(&lock);

        let content = match content {
            Ok(c) => c,
            Err(_) => return Ok(None),
        };

        let entry: CacheFile = match serde_json::from_str(&content) {
            Ok(e) => e,
            Err(_) => {
                // Corrupted entry reads as a miss
                return Ok(None);
            }
        };

        if entry.expires_at <= chrono::Utc::now().timestamp() {
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<()> {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let entry = CacheFile {
            key: key.to_string(),
            expires_at: chrono::Utc::now().timestamp().saturating_add(ttl_secs),
            value: value.clone(),
        };
        let content = serde_json::to_string(&entry)
            .map_err(|e| VxfError::Cache(format!("Serialization failed: {}", e)))?;

        fs::create_dir_all(&self.cache_dir)?;
        let lock = self.lock_file()?;
        FileExt::lock_exclusive(&lock)?;
        let written = fs::write(self.entry_path(key), content);
        let _ = FileExt::unlock(&lock);
        written?;
        Ok(())
    }

    fn delete_by_prefix(&self, prefix: &str) -> Result<usize> {
        if !self.cache_dir.exists() {
            return Ok(0);
        }

        let lock = self.lock_file()?;
        FileExt::lock_exclusive(&lock)?;
        let outcome = self.remove_matching(prefix);
        let _ = FileExt::unlock(&lock);
        outcome
    }
}

impl FileStore {
    fn remove_matching(&self, prefix: &str) -> Result<usize> {
        let mut removed = 0;
        for dir_entry in fs::read_dir(&self.cache_dir)? {
            let path = dir_entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(key) = name.strip_suffix(".json") else {
                continue;
            };
            if !key.starts_with(prefix) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                // Another process got there first
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }
}

/// Get-or-compute wrapper around a [`CacheStore`]
pub struct CacheGateway {
    store: Box<dyn CacheStore>,
    namespace: String,
}

impl CacheGateway {
    pub fn new(store: Box<dyn CacheStore>) -> Self {
        Self {
            store,
            namespace: KEY_NAMESPACE.to_string(),
        }
    }

    /// Key as written to the store
    pub fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    /// Return the cached value for `key`, or compute and cache it.
    ///
    /// With `force` the cache is bypassed on read but still refreshed.
    /// A failed computation is propagated and never stored.
    pub fn get_or_compute<T, F>(&self, key: &str, ttl: Duration, force: bool, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        let full_key = self.namespaced(key);

        if !force {
            if let Some(hit) = self.lookup::<T>(&full_key) {
                tracing::debug!(key = %full_key, "cache hit");
                return Ok(hit);
            }
            tracing::debug!(key = %full_key, "cache miss");
        }

        let value = compute()?;

        match serde_json::to_value(&value) {
            Ok(encoded) => {
                if let Err(e) = self.store.set(&full_key, &encoded, ttl) {
                    tracing::warn!(key = %full_key, error = %e, "failed to store cache entry");
                }
            }
            Err(e) => {
                tracing::warn!(key = %full_key, error = %e, "failed to encode cache entry");
            }
        }

        Ok(value)
    }

    /// Delete every entry of this system whose key starts with `prefix`
    pub fn purge(&self, prefix: &str) -> Result<usize> {
        let removed = self.store.delete_by_prefix(&self.namespaced(prefix))?;
        tracing::info!(prefix, removed, "cache purged");
        Ok(removed)
    }

    fn lookup<T: DeserializeOwned>(&self, full_key: &str) -> Option<T> {
        let value = match self.store.get(full_key) {
            Ok(Some(v)) => v,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %full_key, error = %e, "cache read failed");
                return None;
            }
        };
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(key = %full_key, error = %e, "discarding undecodable cache entry");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Lets a test keep a handle on the store it hands to the gateway
    struct Shared(Arc<MemoryStore>);

    impl CacheStore for Shared {
        fn get(&self, key: &str) -> Result<Option<Value>> {
            self.0.get(key)
        }
        fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<()> {
            self.0.set(key, value, ttl)
        }
        fn delete_by_prefix(&self, prefix: &str) -> Result<usize> {
            self.0.delete_by_prefix(prefix)
        }
    }

    fn memory_gateway() -> (CacheGateway, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (CacheGateway::new(Box::new(Shared(store.clone()))), store)
    }

    fn create_file_store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::with_cache_dir(temp_dir.path().to_path_buf()).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_key_schema() {
        assert_eq!(keys::page(3, 250), "transactions_3_250");
        assert_eq!(keys::all_transactions(250, 20), "all_transactions_250_20");
        assert_eq!(
            keys::daily("2024-01-01", "2024-01-07"),
            "daily_2024-01-01_2024-01-07"
        );
    }

    #[test]
    fn test_warm_cache_skips_compute() {
        let (gateway, _) = memory_gateway();
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok(json!({"n": 1}))
        };

        let first: Value = gateway.get_or_compute("k", DEFAULT_TTL, false, compute).unwrap();
        let second: Value = gateway
            .get_or_compute("k", DEFAULT_TTL, false, || {
                calls.set(calls.get() + 1);
                Ok(json!({"n": 2}))
            })
            .unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_force_recomputes_and_refreshes() {
        let (gateway, _) = memory_gateway();
        let _: u32 = gateway.get_or_compute("k", DEFAULT_TTL, false, || Ok(1)).unwrap();

        let forced: u32 = gateway.get_or_compute("k", DEFAULT_TTL, true, || Ok(2)).unwrap();
        assert_eq!(forced, 2);

        // Forced value replaced the cached one
        let cached: u32 = gateway
            .get_or_compute("k", DEFAULT_TTL, false, || panic!("should be cached"))
            .unwrap();
        assert_eq!(cached, 2);
    }

    #[test]
    fn test_failed_compute_is_not_cached() {
        let (gateway, store) = memory_gateway();

        let result: Result<u32> = gateway.get_or_compute("k", DEFAULT_TTL, false, || {
            Err(VxfError::Transport("down".into()))
        });
        assert!(result.is_err());
        assert!(store.is_empty());

        let recovered: u32 = gateway.get_or_compute("k", DEFAULT_TTL, false, || Ok(7)).unwrap();
        assert_eq!(recovered, 7);
    }

    #[test]
    fn test_entries_are_namespaced() {
        let (gateway, store) = memory_gateway();
        let _: u32 = gateway
            .get_or_compute("daily_a_b", DEFAULT_TTL, false, || Ok(1))
            .unwrap();

        assert!(store.get("vxf_daily_a_b").unwrap().is_some());
        assert!(store.get("daily_a_b").unwrap().is_none());
    }

    #[test]
    fn test_expired_entry_recomputes() {
        let (gateway, _) = memory_gateway();
        let _: u32 = gateway.get_or_compute("k", Duration::ZERO, false, || Ok(1)).unwrap();

        let again: u32 = gateway.get_or_compute("k", DEFAULT_TTL, false, || Ok(2)).unwrap();
        assert_eq!(again, 2);
    }

    #[test]
    fn test_undecodable_hit_is_a_miss() {
        let (gateway, store) = memory_gateway();
        store
            .set("vxf_k", &json!("not a number"), DEFAULT_TTL)
            .unwrap();

        let value: u32 = gateway.get_or_compute("k", DEFAULT_TTL, false, || Ok(5)).unwrap();
        assert_eq!(value, 5);
    }

    #[test]
    fn test_purge_only_touches_own_namespace() {
        let (gateway, store) = memory_gateway();
        store.set("other_app_key", &json!(1), DEFAULT_TTL).unwrap();
        let _: u32 = gateway
            .get_or_compute(&keys::page(1, 250), DEFAULT_TTL, false, || Ok(1))
            .unwrap();
        let _: u32 = gateway
            .get_or_compute(&keys::daily("a", "b"), DEFAULT_TTL, false, || Ok(1))
            .unwrap();

        let removed = gateway.purge("").unwrap();

        assert_eq!(removed, 2);
        assert_eq!(store.len(), 1);
        assert!(store.get("other_app_key").unwrap().is_some());
    }

    #[test]
    fn test_purge_sub_prefix() {
        let (gateway, store) = memory_gateway();
        for page in 1..=3 {
            let _: u32 = gateway
                .get_or_compute(&keys::page(page, 250), DEFAULT_TTL, false, || Ok(page))
                .unwrap();
        }
        let _: u32 = gateway
            .get_or_compute(&keys::daily("a", "b"), DEFAULT_TTL, false, || Ok(0))
            .unwrap();

        assert_eq!(gateway.purge("transactions_").unwrap(), 3);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_file_store_roundtrip() {
        let (store, _temp) = create_file_store();
        store
            .set("vxf_daily_x_y", &json!({"data": {"net_profit": 1}}), DEFAULT_TTL)
            .unwrap();

        assert!(store.entry_path("vxf_daily_x_y").exists());
        assert_eq!(
            store.get("vxf_daily_x_y").unwrap(),
            Some(json!({"data": {"net_profit": 1}}))
        );
        assert_eq!(store.get("vxf_missing").unwrap(), None);
    }

    #[test]
    fn test_file_store_expired_entry_is_miss() {
        let (store, _temp) = create_file_store();
        store.set("vxf_k", &json!(1), Duration::ZERO).unwrap();

        assert_eq!(store.get("vxf_k").unwrap(), None);
    }

    #[test]
    fn test_file_store_corrupted_entry_is_miss() {
        let (store, _temp) = create_file_store();
        fs::write(store.entry_path("vxf_k"), "not valid json {{{").unwrap();

        assert_eq!(store.get("vxf_k").unwrap(), None);
    }

    #[test]
    fn test_file_store_delete_by_prefix() {
        let (store, temp) = create_file_store();
        store.set("vxf_transactions_1_250", &json!(1), DEFAULT_TTL).unwrap();
        store.set("vxf_daily_a_b", &json!(2), DEFAULT_TTL).unwrap();
        store.set("other_key", &json!(3), DEFAULT_TTL).unwrap();

        let removed = store.delete_by_prefix("vxf_").unwrap();

        assert_eq!(removed, 2);
        assert!(!store.entry_path("vxf_daily_a_b").exists());
        assert!(store.entry_path("other_key").exists());
        // Lock file is left alone
        assert!(temp.path().join(".lock").exists());
    }

    #[test]
    fn test_gateway_over_file_store() {
        let (store, _temp) = create_file_store();
        let gateway = CacheGateway::new(Box::new(store));

        let first: Vec<u32> = gateway
            .get_or_compute(&keys::all_transactions(250, 20), DEFAULT_TTL, false, || {
                Ok(vec![1, 2, 3])
            })
            .unwrap();
        let second: Vec<u32> = gateway
            .get_or_compute(&keys::all_transactions(250, 20), DEFAULT_TTL, false, || {
                panic!("should be cached")
            })
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(gateway.purge("").unwrap(), 1);
    }
}
