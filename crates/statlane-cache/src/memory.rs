//! In-process cache backed by DashMap for lock-free concurrent access.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::Cache;

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(value: &str, ttl_seconds: u64) -> Self {
        Self {
            value: value.to_string(),
            expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
        }
    }

    fn expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Lock-free in-memory [`Cache`] for single-node deployments and tests.
///
/// Expired entries are dropped lazily on access; call [`purge_expired`]
/// from a background task to reclaim memory under churn.
///
/// [`purge_expired`]: MemoryCache::purge_expired
#[derive(Default)]
pub struct MemoryCache {
    store: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove expired entries, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let before = self.store.len();
        self.store.retain(|_, entry| !entry.expired());
        before - self.store.len()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        match self.store.get(key) {
            Some(entry) if !entry.expired() => Ok(Some(entry.value.clone())),
            Some(entry) => {
                drop(entry);
                self.store.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> anyhow::Result<()> {
        self.store
            .insert(key.to_string(), CacheEntry::new(value, ttl_seconds));
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl_seconds: u64) -> anyhow::Result<bool> {
        // The entry API holds the shard lock across the check-and-insert,
        // which is what makes first-wins semantics hold under races.
        match self.store.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().expired() {
                    occupied.insert(CacheEntry::new(value, ttl_seconds));
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry::new(value, ttl_seconds));
                Ok(true)
            }
        }
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn get_returns_what_was_set() {
        let cache = MemoryCache::new();
        cache.set_ex("k", "v", 60).await.ok();
        assert_eq!(cache.get("k").await.ok().flatten().as_deref(), Some("v"));
        assert_eq!(cache.exists("k").await.ok(), Some(true));
        assert_eq!(cache.get("missing").await.ok().flatten(), None);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = MemoryCache::new();
        cache.set_ex("k", "v", 0).await.ok();
        assert_eq!(cache.get("k").await.ok().flatten(), None);
        assert_eq!(cache.exists("k").await.ok(), Some(false));
    }

    #[tokio::test]
    async fn set_nx_respects_existing_keys() {
        let cache = MemoryCache::new();
        assert_eq!(cache.set_nx("k", "first", 60).await.ok(), Some(true));
        assert_eq!(cache.set_nx("k", "second", 60).await.ok(), Some(false));
        assert_eq!(
            cache.get("k").await.ok().flatten().as_deref(),
            Some("first")
        );
    }

    #[tokio::test]
    async fn set_nx_reclaims_expired_keys() {
        let cache = MemoryCache::new();
        cache.set_ex("k", "old", 0).await.ok();
        assert_eq!(cache.set_nx("k", "new", 60).await.ok(), Some(true));
        assert_eq!(cache.get("k").await.ok().flatten().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn concurrent_set_nx_has_exactly_one_winner() {
        let cache = Arc::new(MemoryCache::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache
                    .set_nx("session:1", &format!("writer-{i}"), 60)
                    .await
                    .unwrap_or(false)
            }));
        }
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap_or(false) {
                winners += 1;
            }
        }
        assert_eq!(winners, 1, "exactly one concurrent set_nx may win");
    }

    #[tokio::test]
    async fn purge_drops_only_expired_entries() {
        let cache = MemoryCache::new();
        cache.set_ex("stale", "v", 0).await.ok();
        cache.set_ex("fresh", "v", 60).await.ok();
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }
}
