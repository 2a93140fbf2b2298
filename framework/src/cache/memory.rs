use super::CacheStore;
use crate::error::FrameworkError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::Instant;

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Minimum time between full sweeps of expired entries
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Entries {
    map: HashMap<String, Entry>,
    swept_at: Instant,
}

/// In-process cache with optional per-key expiry
///
/// Expired keys are dropped on access, and `set` sweeps the whole map at
/// most once per `SWEEP_INTERVAL`.
#[derive(Clone)]
pub struct MemoryCache {
    entries: Arc<RwLock<Entries>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Entries {
                map: HashMap::new(),
                swept_at: Instant::now(),
            })),
        }
    }

    /// Number of stored entries, including expired ones not yet dropped
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Entries>, FrameworkError> {
        self.entries
            .write()
            .map_err(|_| FrameworkError::cache("memory cache lock poisoned"))
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, FrameworkError> {
        let now = Instant::now();
        let mut entries = self.write()?;
        match entries.map.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.map.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), FrameworkError> {
        let now = Instant::now();
        let entry = Entry {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| now + ttl),
        };

        let mut entries = self.write()?;
        if now.duration_since(entries.swept_at) >= SWEEP_INTERVAL {
            entries.map.retain(|_, entry| entry.is_live(now));
            entries.swept_at = now;
        }
        entries.map.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, FrameworkError> {
        let now = Instant::now();
        Ok(self
            .write()?
            .map
            .remove(key)
            .is_some_and(|entry| entry.is_live(now)))
    }

    async fn ping(&self) -> Result<(), FrameworkError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("missing").await.unwrap(), None);

        cache.set("greeting", "hello", None).await.unwrap();
        assert_eq!(cache.get("greeting").await.unwrap(), Some("hello".into()));

        cache.set("greeting", "hi", None).await.unwrap();
        assert_eq!(cache.get("greeting").await.unwrap(), Some("hi".into()));

        assert!(cache.delete("greeting").await.unwrap());
        assert!(!cache.delete("greeting").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let cache = MemoryCache::new();
        cache
            .set("session", "abc", Some(Duration::from_secs(5)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(cache.exists("session").await.unwrap());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!cache.exists("session").await.unwrap());
        assert!(!cache.delete("session").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_sweeps_expired_entries() {
        let cache = MemoryCache::new();
        for i in 0..100 {
            cache
                .set(&format!("session:{}", i), "abc", Some(Duration::from_secs(1)))
                .await
                .unwrap();
        }
        cache.set("pinned", "v", None).await.unwrap();
        assert_eq!(cache.len(), 101);

        // Expired but not yet swept
        tokio::time::advance(Duration::from_secs(2)).await;
        cache.set("early", "v", None).await.unwrap();
        assert_eq!(cache.len(), 102);

        tokio::time::advance(SWEEP_INTERVAL).await;
        cache.set("late", "v", None).await.unwrap();
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get("pinned").await.unwrap(), Some("v".into()));
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let cache = MemoryCache::new();
        let other = cache.clone();
        cache.set("k", "v", None).await.unwrap();
        assert_eq!(other.get("k").await.unwrap(), Some("v".into()));
    }
}
