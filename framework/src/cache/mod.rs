//! Cache clients
//!
//! `CacheStore` is what the application stores after running the factory
//! given to `Application::install_redis`. `RedisCache` talks to Redis through
//! a reconnecting connection manager; `MemoryCache` keeps everything in
//! process.
//!
//! ```rust,ignore
//! use ignition::cache::{self, CacheConfig};
//!
//! match CacheConfig::from_env() {
//!     Some(config) => app.install_redis(debug, cache::installer(config)),
//!     None => app.install_redis(debug, || async { Ok(MemoryCache::new()) }),
//! }
//! ```

mod memory;
mod redis;

pub use self::memory::MemoryCache;
pub use self::redis::{CacheConfig, RedisCache};

use crate::error::FrameworkError;
use crate::BoxFuture;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Key/value cache operations the application relies on
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, FrameworkError>;

    /// Store `value`, expiring after `ttl` when given
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>)
        -> Result<(), FrameworkError>;

    /// Remove `key`; `true` when something was removed
    async fn delete(&self, key: &str) -> Result<bool, FrameworkError>;

    async fn exists(&self, key: &str) -> Result<bool, FrameworkError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn ping(&self) -> Result<(), FrameworkError>;

    /// Backend name used in logs and health output
    fn backend(&self) -> &'static str;
}

/// Factory that connects a `RedisCache` when invoked
pub fn installer(
    config: CacheConfig,
) -> impl FnOnce() -> BoxFuture<Result<RedisCache, FrameworkError>> + Send + 'static {
    move || -> BoxFuture<Result<RedisCache, FrameworkError>> {
        Box::pin(async move { RedisCache::connect(&config).await })
    }
}

/// Wrap a store so every command is logged at debug level
pub fn traced(inner: Arc<dyn CacheStore>) -> Arc<dyn CacheStore> {
    Arc::new(Traced { inner })
}

struct Traced {
    inner: Arc<dyn CacheStore>,
}

#[async_trait]
impl CacheStore for Traced {
    async fn get(&self, key: &str) -> Result<Option<String>, FrameworkError> {
        let started = Instant::now();
        let result = self.inner.get(key).await;
        tracing::debug!(backend = self.inner.backend(), key, hit = ?result.as_ref().map(Option::is_some), elapsed = ?started.elapsed(), "cache get");
        result
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), FrameworkError> {
        let started = Instant::now();
        let result = self.inner.set(key, value, ttl).await;
        tracing::debug!(backend = self.inner.backend(), key, ?ttl, ok = result.is_ok(), elapsed = ?started.elapsed(), "cache set");
        result
    }

    async fn delete(&self, key: &str) -> Result<bool, FrameworkError> {
        let started = Instant::now();
        let result = self.inner.delete(key).await;
        tracing::debug!(backend = self.inner.backend(), key, removed = ?result, elapsed = ?started.elapsed(), "cache delete");
        result
    }

    async fn exists(&self, key: &str) -> Result<bool, FrameworkError> {
        self.inner.exists(key).await
    }

    async fn ping(&self) -> Result<(), FrameworkError> {
        self.inner.ping().await
    }

    fn backend(&self) -> &'static str {
        self.inner.backend()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_traced_delegates() {
        let store = traced(Arc::new(MemoryCache::new()));
        store.set("k", "v", None).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        assert!(store.exists("k").await.unwrap());
        assert!(store.delete("k").await.unwrap());
        assert!(!store.exists("k").await.unwrap());
        assert_eq!(store.backend(), "memory");
    }
}
