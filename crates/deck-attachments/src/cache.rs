//! Namespaced key/value cache
//!
//! Mirrors a distributed memcache-style cache: lookups never fail, a missing
//! or expired entry is simply absent.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

/// Cache trait
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get a value; `None` if absent or expired
    async fn get(&self, key: &str) -> Option<Value>;

    /// Store a value, optionally expiring after `ttl`
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> bool;

    /// Remove one key
    async fn remove(&self, key: &str) -> bool;

    /// Remove every key starting with `prefix`
    async fn clear(&self, prefix: &str) -> bool;
}

struct CacheEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |at| at <= Instant::now())
    }
}

/// In-process cache scoped to a namespace
pub struct MemoryCache {
    namespace: String,
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: DashMap::new(),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let key = self.key(key);
        let expired = match self.entries.get(&key) {
            Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(&key);
        }
        None
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> bool {
        self.entries.insert(
            self.key(key),
            CacheEntry {
                value,
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        true
    }

    async fn remove(&self, key: &str) -> bool {
        self.entries.remove(&self.key(key)).is_some()
    }

    async fn clear(&self, prefix: &str) -> bool {
        let prefix = self.key(prefix);
        self.entries.retain(|key, _| !key.starts_with(&prefix));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_remove() {
        let cache = MemoryCache::new("deck-card-attachments-");
        assert!(cache.get("card-1").await.is_none());

        cache.set("card-1", json!(3), None).await;
        assert_eq!(cache.get("card-1").await, Some(json!(3)));

        assert!(cache.remove("card-1").await);
        assert!(cache.get("card-1").await.is_none());
        assert!(!cache.remove("card-1").await);
    }

    #[tokio::test]
    async fn test_zero_is_present() {
        let cache = MemoryCache::new("ns-");
        cache.set("card-5", json!(0), None).await;
        assert_eq!(cache.get("card-5").await, Some(json!(0)));
    }

    #[tokio::test]
    async fn test_remove_is_exact() {
        let cache = MemoryCache::new("ns-");
        cache.set("card-1", json!(1), None).await;
        cache.set("card-10", json!(10), None).await;

        cache.remove("card-1").await;
        assert_eq!(cache.get("card-10").await, Some(json!(10)));
    }

    #[tokio::test]
    async fn test_clear_prefix() {
        let cache = MemoryCache::new("ns-");
        cache.set("card-1", json!(1), None).await;
        cache.set("card-10", json!(10), None).await;
        cache.set("board-1", json!(2), None).await;

        cache.clear("card-").await;
        assert!(cache.get("card-1").await.is_none());
        assert!(cache.get("card-10").await.is_none());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_empty_prefix_empties_namespace() {
        let cache = MemoryCache::new("a-");
        cache.set("x", json!(1), None).await;
        cache.clear("").await;
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_expiry() {
        let cache = MemoryCache::new("ns-");
        cache.set("card-1", json!(1), Some(Duration::ZERO)).await;
        assert!(cache.get("card-1").await.is_none());
        assert!(cache.is_empty());
    }
}
