//! NoOp cache implementation.
//!
//! Used when caching is disabled. Writes are discarded and reads miss.

use async_trait::async_trait;

use crate::cache::traits::{IterableCache, StoreStatus, TaggableCache};
use crate::cache::ttl::Lifetime;
use crate::cache::CacheError;

/// A no-operation cache that doesn't store anything.
///
/// Used when `cache.enabled = false` in configuration.
pub struct NoOpCache;

impl NoOpCache {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoOpCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaggableCache for NoOpCache {
    async fn get(&self, _identifier: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    async fn has(&self, _identifier: &str) -> Result<bool, CacheError> {
        Ok(false)
    }

    async fn set(
        &self,
        _identifier: &str,
        _payload: Vec<u8>,
        _tags: &[&str],
        _lifetime: Option<Lifetime>,
    ) -> Result<(), CacheError> {
        Ok(())
    }

    async fn remove(&self, _identifier: &str) -> Result<bool, CacheError> {
        Ok(true)
    }

    async fn flush(&self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn flush_by_tag(&self, _tag: &str) -> Result<u64, CacheError> {
        Ok(0)
    }

    async fn find_identifiers_by_tag(&self, _tag: &str) -> Result<Vec<String>, CacheError> {
        Ok(Vec::new())
    }

    async fn find_identifiers_by_tags(&self, _tags: &[&str]) -> Result<Vec<String>, CacheError> {
        Ok(Vec::new())
    }

    async fn status(&self) -> StoreStatus {
        StoreStatus {
            backend: "disabled",
            version: None,
            connected: true,
            supported: true,
        }
    }
}

#[async_trait]
impl IterableCache for NoOpCache {
    async fn identifier_at(&self, _index: u64) -> Result<Option<String>, CacheError> {
        Ok(None)
    }
}
