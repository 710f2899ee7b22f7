use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

/// Key-value store with TTL semantics. The orchestrator never lets a broken
/// cache fail a search: every error here degrades to miss behavior.
#[async_trait]
pub trait RecipeCache: Send + Sync {
    /// Returns the live (non-expired) value for `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    async fn is_healthy(&self) -> bool;
}

/// In-process cache backed by a concurrent map. Entries carry an absolute
/// deadline and are dropped lazily on the next read past it. Last writer
/// wins on a key, which is fine for derived search results.
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
}

struct CacheEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl MemoryCache {
    pub fn new() -> MemoryCache {
        MemoryCache {
            entries: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecipeCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > Instant::now() {
                return Ok(Some(entry.value.clone()));
            }
            drop(entry);
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_returns_what_was_set() -> Result<()> {
        let cache = MemoryCache::new();
        cache
            .set("k", b"hello".to_vec(), Duration::from_secs(60))
            .await?;

        let got = cache.get("k").await?;
        assert_eq!(got, Some(b"hello".to_vec()));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_key_is_none() -> Result<()> {
        let cache = MemoryCache::new();
        assert!(cache.get("nope").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss_and_evicted() -> Result<()> {
        let cache = MemoryCache::new();
        cache
            .set("k", b"v".to_vec(), Duration::from_millis(10))
            .await?;

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(cache.get("k").await?.is_none());
        assert!(cache.is_empty(), "expired entry should be evicted on read");
        Ok(())
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() -> Result<()> {
        let cache = MemoryCache::new();
        cache
            .set("k", b"old".to_vec(), Duration::from_secs(60))
            .await?;
        cache
            .set("k", b"new".to_vec(), Duration::from_secs(60))
            .await?;

        assert_eq!(cache.get("k").await?, Some(b"new".to_vec()));
        assert_eq!(cache.len(), 1);
        Ok(())
    }
}
