//! Cache capability traits.

use async_trait::async_trait;
use serde::Serialize;

use crate::cache::CacheError;
use crate::cache::ttl::Lifetime;

/// Health snapshot of a cache backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    pub backend: &'static str,
    pub version: Option<String>,
    pub connected: bool,
    pub supported: bool,
}

/// Tag-indexed cache operations.
///
/// All cache backends implement this trait to provide a unified interface.
#[async_trait]
pub trait TaggableCache: Send + Sync {
    /// Get the payload stored under `identifier`.
    async fn get(&self, identifier: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Check whether an entry exists.
    async fn has(&self, identifier: &str) -> Result<bool, CacheError>;

    /// Store a payload, attaching `tags` in addition to any tags the entry
    /// already carries. `None` uses the backend's default lifetime;
    /// `Lifetime::Seconds(0)` means unlimited and lifetimes above
    /// `Lifetime::MAX_SECONDS` fail with `InvalidLifetime` before any write.
    ///
    /// Only the tag keys named in this call, and the entry's tag set when
    /// `tags` is non-empty, have their expiry extended. Tags attached by an
    /// earlier `set` keep their old expiry, so after `set(e, [a], 60s)` and
    /// `set(e, [b], 1h)` the index key of `a` can expire before `e` does.
    /// Pass every tag again to keep all of them alive.
    async fn set(
        &self,
        identifier: &str,
        payload: Vec<u8>,
        tags: &[&str],
        lifetime: Option<Lifetime>,
    ) -> Result<(), CacheError>;

    /// Remove an entry and detach it from its tags.
    ///
    /// Returns `true` once the removal committed, whether or not the entry existed.
    async fn remove(&self, identifier: &str) -> Result<bool, CacheError>;

    /// Remove everything stored by this cache instance.
    async fn flush(&self) -> Result<(), CacheError>;

    /// Remove every entry tagged with `tag` and return how many there were.
    ///
    /// Other tags of the removed entries may keep pointing at them.
    async fn flush_by_tag(&self, tag: &str) -> Result<u64, CacheError>;

    /// Flush several tags, returning the total number of removed entries.
    async fn flush_by_tags(&self, tags: &[&str]) -> Result<u64, CacheError> {
        let mut flushed = 0;
        for tag in tags {
            flushed += self.flush_by_tag(tag).await?;
        }
        Ok(flushed)
    }

    /// Identifiers of the entries tagged with `tag`, in no particular order.
    async fn find_identifiers_by_tag(&self, tag: &str) -> Result<Vec<String>, CacheError>;

    /// Union of the identifiers tagged with any of `tags`.
    async fn find_identifiers_by_tags(&self, tags: &[&str]) -> Result<Vec<String>, CacheError>;

    /// Report backend health; never fails for an unreachable store.
    async fn status(&self) -> StoreStatus;
}

/// Backends that keep an ordered list of inserted identifiers.
#[async_trait]
pub trait IterableCache: TaggableCache {
    /// The identifier recorded at `index` of the entry list, if any.
    async fn identifier_at(&self, index: u64) -> Result<Option<String>, CacheError>;
}
