//! Cache manager that dispatches to the configured backend.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::cache::iter::EntryIterator;
use crate::cache::memory::MemoryTagCache;
use crate::cache::noop::NoOpCache;
use crate::cache::redis::RedisTagCache;
use crate::cache::traits::{IterableCache, StoreStatus};
use crate::cache::ttl::Lifetime;
use crate::cache::CacheError;
use crate::config::settings::{CacheBackend, CacheConfig};

/// Global cache manager instance.
static CACHE: OnceCell<CacheManager> = OnceCell::const_new();

/// Initialize the global cache manager.
///
/// This should be called once during application startup.
/// Subsequent calls will return the existing instance.
pub async fn init_cache(config: CacheConfig) -> Result<&'static CacheManager, CacheError> {
    CACHE
        .get_or_try_init(|| async { CacheManager::new(config).await })
        .await
}

/// Get the global cache manager.
///
/// Returns `None` if the cache has not been initialized.
pub fn get_cache() -> Option<&'static CacheManager> {
    CACHE.get()
}

/// Get the global cache manager or fail with `CacheError::NotInitialized`.
pub fn require_cache() -> Result<&'static CacheManager, CacheError> {
    get_cache().ok_or(CacheError::NotInitialized)
}

/// Cache manager that provides access to the configured cache backend.
#[derive(Clone)]
pub struct CacheManager {
    backend: Arc<dyn IterableCache>,
    config: CacheConfig,
}

impl CacheManager {
    /// Create a new cache manager with the given configuration.
    ///
    /// If caching is disabled, a NoOpCache is used.
    pub async fn new(config: CacheConfig) -> Result<Self, CacheError> {
        let backend: Arc<dyn IterableCache> = if !config.enabled {
            Arc::new(NoOpCache::new())
        } else {
            match config.backend {
                CacheBackend::Memory => Arc::new(MemoryTagCache::new(&config)),
                CacheBackend::Redis => Arc::new(RedisTagCache::new(&config).await?),
            }
        };

        tracing::debug!(
            enabled = config.enabled,
            backend = ?config.backend,
            cache_name = %config.cache_name,
            "Cache manager ready"
        );

        Ok(Self { backend, config })
    }

    /// Wrap an already constructed backend.
    pub fn with_backend(backend: Arc<dyn IterableCache>, config: CacheConfig) -> Self {
        Self { backend, config }
    }

    /// Get a reference to the cache backend.
    pub fn backend(&self) -> &Arc<dyn IterableCache> {
        &self.backend
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Check if caching is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Iterate the recorded entries with the configured stale-slot policy.
    pub fn entries(&self) -> EntryIterator<'_, dyn IterableCache> {
        EntryIterator::new(self.backend.as_ref(), self.config.stale_slots)
    }

    // ========================================================================
    // TaggableCache proxy methods
    // ========================================================================

    pub async fn get(&self, identifier: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.backend.get(identifier).await
    }

    pub async fn has(&self, identifier: &str) -> Result<bool, CacheError> {
        self.backend.has(identifier).await
    }

    pub async fn set(
        &self,
        identifier: &str,
        payload: Vec<u8>,
        tags: &[&str],
        lifetime: Option<Lifetime>,
    ) -> Result<(), CacheError> {
        self.backend.set(identifier, payload, tags, lifetime).await
    }

    pub async fn remove(&self, identifier: &str) -> Result<bool, CacheError> {
        self.backend.remove(identifier).await
    }

    pub async fn flush(&self) -> Result<(), CacheError> {
        self.backend.flush().await
    }

    pub async fn flush_by_tag(&self, tag: &str) -> Result<u64, CacheError> {
        self.backend.flush_by_tag(tag).await
    }

    pub async fn flush_by_tags(&self, tags: &[&str]) -> Result<u64, CacheError> {
        self.backend.flush_by_tags(tags).await
    }

    pub async fn find_identifiers_by_tag(&self, tag: &str) -> Result<Vec<String>, CacheError> {
        self.backend.find_identifiers_by_tag(tag).await
    }

    pub async fn find_identifiers_by_tags(&self, tags: &[&str]) -> Result<Vec<String>, CacheError> {
        self.backend.find_identifiers_by_tags(tags).await
    }

    pub async fn status(&self) -> StoreStatus {
        self.backend.status().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> CacheConfig {
        CacheConfig {
            enabled: true,
            backend: CacheBackend::Memory,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_disabled_cache_uses_noop() {
        let manager = CacheManager::new(CacheConfig::default()).await.unwrap();
        assert!(!manager.is_enabled());
        manager.set("e1", b"v".to_vec(), &[], None).await.unwrap();
        assert_eq!(manager.get("e1").await.unwrap(), None);
        assert_eq!(manager.status().await.backend, "disabled");
    }

    #[tokio::test]
    async fn test_memory_backend_through_manager() {
        let manager = CacheManager::new(memory_config()).await.unwrap();
        manager
            .set("e1", b"v".to_vec(), &["a"], Some(Lifetime::Unlimited))
            .await
            .unwrap();
        manager.set("e2", b"v".to_vec(), &["b"], None).await.unwrap();

        assert!(manager.has("e1").await.unwrap());
        assert_eq!(manager.find_identifiers_by_tags(&["a", "b"]).await.unwrap().len(), 2);
        assert_eq!(
            manager.entries().collect_identifiers().await.unwrap(),
            vec!["e1", "e2"]
        );
        assert_eq!(manager.flush_by_tags(&["a", "b"]).await.unwrap(), 2);
        assert!(manager.entries().collect_identifiers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_global_cache_initializes_once() {
        let first = init_cache(memory_config()).await.unwrap();
        let second = init_cache(CacheConfig::default()).await.unwrap();
        assert!(std::ptr::eq(first, second));
        assert!(get_cache().is_some());
        assert!(require_cache().is_ok());
    }
}
