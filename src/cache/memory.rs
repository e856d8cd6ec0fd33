//! In-process tagged cache.
//!
//! Keeps the same key layout and protocol as the Redis backend inside a small
//! keyspace guarded by one mutex, so every write is atomic with respect to
//! other callers of the same instance.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::time::{Duration, Instant};

use crate::cache::codec::{PayloadCodec, codec_for_level};
use crate::cache::keys::{KeyNamespace, validate_identifier};
use crate::cache::traits::{IterableCache, StoreStatus, TaggableCache};
use crate::cache::ttl::{Expiry, Lifetime, RemainingTtl, reconcile};
use crate::cache::CacheError;
use crate::config::settings::CacheConfig;

enum StoredValue {
    Bytes(Vec<u8>),
    Set(HashSet<String>),
    List(Vec<String>),
}

struct Slot {
    value: StoredValue,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Deadline `seconds` from now; `None` if it lies beyond what `Instant` can hold.
fn deadline(seconds: u64) -> Option<Instant> {
    Instant::now().checked_add(Duration::from_secs(seconds))
}

/// Minimal keyspace with per-key expiry.
#[derive(Default)]
struct Keyspace {
    slots: HashMap<String, Slot>,
}

impl Keyspace {
    fn live(&mut self, key: &str) -> Option<&mut Slot> {
        let now = Instant::now();
        if self.slots.get(key).is_some_and(|slot| slot.is_expired(now)) {
            self.slots.remove(key);
        }
        self.slots.get_mut(key)
    }

    fn exists(&mut self, key: &str) -> bool {
        self.live(key).is_some()
    }

    fn ttl(&mut self, key: &str) -> RemainingTtl {
        match self.live(key) {
            None => RemainingTtl::Missing,
            Some(Slot {
                expires_at: None, ..
            }) => RemainingTtl::Persistent,
            Some(Slot {
                expires_at: Some(at),
                ..
            }) => {
                let remaining = at.saturating_duration_since(Instant::now());
                RemainingTtl::Seconds(((remaining.as_millis() + 500) / 1000) as u64)
            }
        }
    }

    fn get_bytes(&mut self, key: &str) -> Option<Vec<u8>> {
        match self.live(key) {
            Some(Slot {
                value: StoredValue::Bytes(bytes),
                ..
            }) => Some(bytes.clone()),
            _ => None,
        }
    }

    fn set_bytes(&mut self, key: &str, bytes: Vec<u8>, lifetime: Lifetime) {
        let expires_at = lifetime.as_secs().and_then(deadline);
        self.slots.insert(
            key.to_string(),
            Slot {
                value: StoredValue::Bytes(bytes),
                expires_at,
            },
        );
    }

    fn members(&mut self, key: &str) -> Vec<String> {
        match self.live(key) {
            Some(Slot {
                value: StoredValue::Set(members),
                ..
            }) => members.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    fn sadd(&mut self, key: &str, member: &str) {
        let is_set = matches!(
            self.live(key),
            Some(Slot {
                value: StoredValue::Set(_),
                ..
            })
        );
        if !is_set {
            self.slots.insert(
                key.to_string(),
                Slot {
                    value: StoredValue::Set(HashSet::new()),
                    expires_at: None,
                },
            );
        }
        if let Some(Slot {
            value: StoredValue::Set(members),
            ..
        }) = self.slots.get_mut(key)
        {
            members.insert(member.to_string());
        }
    }

    /// Remove a set member, dropping the key once the set is empty.
    fn srem(&mut self, key: &str, member: &str) {
        let now_empty = match self.live(key) {
            Some(Slot {
                value: StoredValue::Set(members),
                ..
            }) => {
                members.remove(member);
                members.is_empty()
            }
            _ => false,
        };
        if now_empty {
            self.slots.remove(key);
        }
    }

    fn rpush(&mut self, key: &str, item: &str) {
        if let Some(Slot {
            value: StoredValue::List(items),
            ..
        }) = self.live(key)
        {
            items.push(item.to_string());
            return;
        }
        self.slots.insert(
            key.to_string(),
            Slot {
                value: StoredValue::List(vec![item.to_string()]),
                expires_at: None,
            },
        );
    }

    fn lindex(&mut self, key: &str, index: u64) -> Option<String> {
        match self.live(key) {
            Some(Slot {
                value: StoredValue::List(items),
                ..
            }) => usize::try_from(index)
                .ok()
                .and_then(|index| items.get(index).cloned()),
            _ => None,
        }
    }

    fn apply_expiry(&mut self, key: &str, expiry: Expiry) {
        if let Some(slot) = self.live(key) {
            slot.expires_at = match expiry {
                Expiry::Persistent => None,
                Expiry::Seconds(seconds) => deadline(seconds),
            };
        }
    }

    fn del(&mut self, key: &str) -> bool {
        self.slots.remove(key).is_some()
    }

    fn del_prefixed(&mut self, prefix: &str) -> usize {
        let before = self.slots.len();
        self.slots.retain(|key, _| !key.starts_with(prefix));
        before - self.slots.len()
    }
}

/// In-memory implementation of the tagged cache protocol.
pub struct MemoryTagCache {
    store: Mutex<Keyspace>,
    keys: KeyNamespace,
    default_lifetime: Lifetime,
    codec: Arc<dyn PayloadCodec>,
}

impl MemoryTagCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            store: Mutex::new(Keyspace::default()),
            keys: KeyNamespace::new(&config.key_prefix, &config.cache_name),
            default_lifetime: Lifetime::from_secs(config.default_lifetime),
            codec: codec_for_level(config.compression_level),
        }
    }

    pub fn keys(&self) -> &KeyNamespace {
        &self.keys
    }

    fn lock(&self) -> Result<MutexGuard<'_, Keyspace>, CacheError> {
        self.store
            .lock()
            .map_err(|e| CacheError::Operation(e.to_string()))
    }

    /// Remaining lifetime of a tag index key.
    pub fn tag_ttl(&self, tag: &str) -> Result<RemainingTtl, CacheError> {
        Ok(self.lock()?.ttl(&self.keys.tag_key(tag)))
    }

    /// Tags currently recorded for an entry.
    pub fn entry_tags(&self, identifier: &str) -> Result<Vec<String>, CacheError> {
        Ok(self.lock()?.members(&self.keys.entry_tags_key(identifier)))
    }
}

#[async_trait]
impl TaggableCache for MemoryTagCache {
    async fn get(&self, identifier: &str) -> Result<Option<Vec<u8>>, CacheError> {
        validate_identifier("entry identifier", identifier)?;
        let stored = self.lock()?.get_bytes(&self.keys.entry_key(identifier));
        stored.map(|bytes| self.codec.decode(&bytes)).transpose()
    }

    async fn has(&self, identifier: &str) -> Result<bool, CacheError> {
        validate_identifier("entry identifier", identifier)?;
        Ok(self.lock()?.exists(&self.keys.entry_key(identifier)))
    }

    async fn set(
        &self,
        identifier: &str,
        payload: Vec<u8>,
        tags: &[&str],
        lifetime: Option<Lifetime>,
    ) -> Result<(), CacheError> {
        validate_identifier("entry identifier", identifier)?;
        for tag in tags {
            validate_identifier("tag", tag)?;
        }

        let lifetime = lifetime.unwrap_or(self.default_lifetime).checked()?;
        let stored = self.codec.encode(&payload)?;
        let entry_key = self.keys.entry_key(identifier);
        let entry_tags_key = self.keys.entry_tags_key(identifier);

        let mut store = self.lock()?;
        let is_new = !store.exists(&entry_key);
        let entry_tags_expiry = reconcile(store.ttl(&entry_tags_key), lifetime);
        let tag_expiries: Vec<Expiry> = tags
            .iter()
            .map(|tag| reconcile(store.ttl(&self.keys.tag_key(tag)), lifetime))
            .collect();

        store.set_bytes(&entry_key, stored, lifetime);
        for (tag, expiry) in tags.iter().zip(tag_expiries) {
            let tag_key = self.keys.tag_key(tag);
            store.sadd(&tag_key, identifier);
            store.apply_expiry(&tag_key, expiry);
            store.sadd(&entry_tags_key, tag);
        }
        if !tags.is_empty() {
            store.apply_expiry(&entry_tags_key, entry_tags_expiry);
        }
        if is_new {
            store.rpush(&self.keys.entry_list_key(), identifier);
        }

        tracing::debug!(identifier, tags = tags.len(), lifetime = ?lifetime, "Stored cache entry");
        Ok(())
    }

    async fn remove(&self, identifier: &str) -> Result<bool, CacheError> {
        validate_identifier("entry identifier", identifier)?;
        let entry_tags_key = self.keys.entry_tags_key(identifier);

        let mut store = self.lock()?;
        let tags = store.members(&entry_tags_key);
        store.del(&self.keys.entry_key(identifier));
        for tag in &tags {
            store.srem(&self.keys.tag_key(tag), identifier);
        }
        store.del(&entry_tags_key);

        tracing::debug!(identifier, "Removed cache entry");
        Ok(true)
    }

    async fn flush(&self) -> Result<(), CacheError> {
        let deleted = self.lock()?.del_prefixed(self.keys.prefix());
        tracing::info!(prefix = self.keys.prefix(), deleted, "Flushed cache");
        Ok(())
    }

    async fn flush_by_tag(&self, tag: &str) -> Result<u64, CacheError> {
        validate_identifier("tag", tag)?;
        let tag_key = self.keys.tag_key(tag);

        let mut store = self.lock()?;
        let entries = store.members(&tag_key);
        for identifier in &entries {
            store.del(&self.keys.entry_key(identifier));
            store.del(&self.keys.entry_tags_key(identifier));
        }
        store.del(&tag_key);

        tracing::info!(tag, flushed = entries.len(), "Flushed cache entries by tag");
        Ok(entries.len() as u64)
    }

    async fn find_identifiers_by_tag(&self, tag: &str) -> Result<Vec<String>, CacheError> {
        validate_identifier("tag", tag)?;
        Ok(self.lock()?.members(&self.keys.tag_key(tag)))
    }

    async fn find_identifiers_by_tags(&self, tags: &[&str]) -> Result<Vec<String>, CacheError> {
        for tag in tags {
            validate_identifier("tag", tag)?;
        }
        let mut store = self.lock()?;
        let mut union = HashSet::new();
        for tag in tags {
            union.extend(store.members(&self.keys.tag_key(tag)));
        }
        Ok(union.into_iter().collect())
    }

    async fn status(&self) -> StoreStatus {
        StoreStatus {
            backend: "memory",
            version: None,
            connected: true,
            supported: true,
        }
    }
}

#[async_trait]
impl IterableCache for MemoryTagCache {
    async fn identifier_at(&self, index: u64) -> Result<Option<String>, CacheError> {
        Ok(self.lock()?.lindex(&self.keys.entry_list_key(), index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> MemoryTagCache {
        MemoryTagCache::new(&CacheConfig::default())
    }

    fn sorted(mut identifiers: Vec<String>) -> Vec<String> {
        identifiers.sort();
        identifiers
    }

    #[tokio::test]
    async fn test_set_get_round_trip() {
        let cache = cache();
        cache.set("e1", b"value".to_vec(), &[], None).await.unwrap();
        assert_eq!(cache.get("e1").await.unwrap(), Some(b"value".to_vec()));
        assert!(cache.has("e1").await.unwrap());
        assert_eq!(cache.get("missing").await.unwrap(), None);
        assert!(!cache.has("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_round_trip_through_compression() {
        let config = CacheConfig {
            compression_level: 9,
            ..Default::default()
        };
        let cache = MemoryTagCache::new(&config);
        let payload = b"compress me ".repeat(100);
        cache.set("e1", payload.clone(), &["a"], None).await.unwrap();
        assert_eq!(cache.get("e1").await.unwrap(), Some(payload));
    }

    #[tokio::test]
    async fn test_tags_are_indexed_both_ways() {
        let cache = cache();
        cache.set("e1", b"v".to_vec(), &["a", "b"], None).await.unwrap();
        assert_eq!(cache.find_identifiers_by_tag("a").await.unwrap(), vec!["e1"]);
        assert_eq!(cache.find_identifiers_by_tag("b").await.unwrap(), vec!["e1"]);
        assert_eq!(sorted(cache.entry_tags("e1").unwrap()), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_set_adds_to_previous_tags() {
        let cache = cache();
        cache.set("e1", b"v1".to_vec(), &["a"], None).await.unwrap();
        cache.set("e1", b"v2".to_vec(), &["b"], None).await.unwrap();
        assert_eq!(cache.get("e1").await.unwrap(), Some(b"v2".to_vec()));
        assert_eq!(cache.find_identifiers_by_tag("a").await.unwrap(), vec!["e1"]);
        assert_eq!(sorted(cache.entry_tags("e1").unwrap()), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_remove_detaches_tags() {
        let cache = cache();
        cache.set("e1", b"v".to_vec(), &["a", "b"], None).await.unwrap();
        cache.set("e2", b"v".to_vec(), &["b"], None).await.unwrap();

        assert!(cache.remove("e1").await.unwrap());
        assert_eq!(cache.get("e1").await.unwrap(), None);
        assert!(cache.find_identifiers_by_tag("a").await.unwrap().is_empty());
        assert_eq!(cache.find_identifiers_by_tag("b").await.unwrap(), vec!["e2"]);
        assert!(cache.entry_tags("e1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let cache = cache();
        cache.set("e1", b"v".to_vec(), &["a"], None).await.unwrap();
        assert!(cache.remove("e1").await.unwrap());
        assert!(cache.remove("e1").await.unwrap());
        assert!(cache.remove("never-set").await.unwrap());
    }

    #[tokio::test]
    async fn test_flush_by_tag_scenario() {
        let cache = cache();
        cache.set("e1", b"v".to_vec(), &["a", "b"], None).await.unwrap();
        cache.set("e2", b"v".to_vec(), &["b"], None).await.unwrap();

        assert_eq!(cache.flush_by_tag("a").await.unwrap(), 1);
        assert_eq!(cache.get("e1").await.unwrap(), None);
        assert!(cache.find_identifiers_by_tag("a").await.unwrap().is_empty());

        let in_b = cache.find_identifiers_by_tag("b").await.unwrap();
        assert!(in_b.contains(&"e2".to_string()));
        for identifier in in_b.iter().filter(|id| *id != "e2") {
            assert_eq!(cache.get(identifier).await.unwrap(), None);
        }
        assert_eq!(cache.get("e2").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_flush_by_unknown_tag_returns_zero() {
        let cache = cache();
        assert_eq!(cache.flush_by_tag("nothing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_flush_by_tags_sums_counts() {
        let cache = cache();
        cache.set("e1", b"v".to_vec(), &["a"], None).await.unwrap();
        cache.set("e2", b"v".to_vec(), &["b"], None).await.unwrap();
        cache.set("e3", b"v".to_vec(), &["c"], None).await.unwrap();
        assert_eq!(cache.flush_by_tags(&["a", "b"]).await.unwrap(), 2);
        assert!(cache.has("e3").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_identifiers_by_tags_is_a_union() {
        let cache = cache();
        cache.set("e1", b"v".to_vec(), &["a", "b"], None).await.unwrap();
        cache.set("e2", b"v".to_vec(), &["b"], None).await.unwrap();
        cache.set("e3", b"v".to_vec(), &["c"], None).await.unwrap();
        let found = sorted(cache.find_identifiers_by_tags(&["a", "b"]).await.unwrap());
        assert_eq!(found, vec!["e1", "e2"]);
        assert!(cache.find_identifiers_by_tags(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_flush_removes_everything() {
        let cache = cache();
        cache.set("e1", b"v".to_vec(), &["a"], None).await.unwrap();
        cache.set("e2", b"v".to_vec(), &["b"], None).await.unwrap();
        cache.flush().await.unwrap();
        assert_eq!(cache.get("e1").await.unwrap(), None);
        assert_eq!(cache.get("e2").await.unwrap(), None);
        assert!(cache.find_identifiers_by_tag("a").await.unwrap().is_empty());
        assert!(cache.find_identifiers_by_tag("b").await.unwrap().is_empty());
        assert_eq!(cache.identifier_at(0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_identifiers_are_rejected() {
        let cache = cache();
        let err = cache.set("", b"v".to_vec(), &[], None).await.unwrap_err();
        assert!(matches!(err, CacheError::InvalidIdentifier { .. }));
        let err = cache.set("e1", b"v".to_vec(), &["bad tag"], None).await.unwrap_err();
        assert!(matches!(err, CacheError::InvalidIdentifier { kind: "tag", .. }));
        assert!(!cache.has("e1").await.unwrap());
    }

    #[tokio::test]
    async fn test_oversized_lifetime_is_rejected_without_poisoning() {
        let cache = cache();
        let err = cache
            .set("e1", b"v".to_vec(), &["t"], Some(Lifetime::Seconds(u64::MAX)))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::InvalidLifetime { .. }));
        assert!(!cache.has("e1").await.unwrap());
        assert!(cache.find_identifiers_by_tag("t").await.unwrap().is_empty());

        cache.set("e1", b"v".to_vec(), &["t"], None).await.unwrap();
        assert_eq!(cache.get("e1").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_seconds_is_unlimited() {
        let cache = cache();
        cache
            .set("e1", b"v".to_vec(), &["t"], Some(Lifetime::Seconds(0)))
            .await
            .unwrap();
        assert_eq!(cache.tag_ttl("t").unwrap(), RemainingTtl::Persistent);

        tokio::time::advance(Duration::from_secs(86_400)).await;
        assert_eq!(cache.get("e1").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(cache.find_identifiers_by_tag("t").await.unwrap(), vec!["e1"]);
    }

    #[tokio::test]
    async fn test_longest_lifetime_is_accepted() {
        let cache = cache();
        cache
            .set("e1", b"v".to_vec(), &["t"], Some(Lifetime::Seconds(Lifetime::MAX_SECONDS)))
            .await
            .unwrap();
        assert!(cache.has("e1").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires() {
        let cache = cache();
        cache
            .set("e1", b"v".to_vec(), &["t"], Some(Lifetime::Seconds(10)))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.get("e1").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tag_index_outlives_longest_entry() {
        let cache = cache();
        cache
            .set("e1", b"v".to_vec(), &["t"], Some(Lifetime::Seconds(3600)))
            .await
            .unwrap();
        cache
            .set("e2", b"v".to_vec(), &["t"], Some(Lifetime::Seconds(60)))
            .await
            .unwrap();
        assert_eq!(cache.tag_ttl("t").unwrap(), RemainingTtl::Seconds(3600));

        tokio::time::advance(Duration::from_secs(120)).await;
        assert_eq!(cache.find_identifiers_by_tag("t").await.unwrap().len(), 2);
        assert_eq!(cache.get("e1").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlimited_entry_makes_tag_sticky() {
        let cache = cache();
        cache
            .set("e1", b"v".to_vec(), &["t"], Some(Lifetime::Seconds(3600)))
            .await
            .unwrap();
        cache
            .set("e2", b"v".to_vec(), &["t"], Some(Lifetime::Unlimited))
            .await
            .unwrap();
        assert_eq!(cache.tag_ttl("t").unwrap(), RemainingTtl::Persistent);

        cache
            .set("e3", b"v".to_vec(), &["t"], Some(Lifetime::Seconds(5)))
            .await
            .unwrap();
        assert_eq!(cache.tag_ttl("t").unwrap(), RemainingTtl::Persistent);

        tokio::time::advance(Duration::from_secs(7200)).await;
        assert_eq!(cache.get("e1").await.unwrap(), None);
        assert_eq!(cache.get("e2").await.unwrap(), Some(b"v".to_vec()));
        assert!(
            cache
                .find_identifiers_by_tag("t")
                .await
                .unwrap()
                .contains(&"e2".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_earlier_tags_keep_their_own_expiry() {
        let cache = cache();
        cache
            .set("e1", b"v".to_vec(), &["a"], Some(Lifetime::Seconds(60)))
            .await
            .unwrap();
        cache
            .set("e1", b"v".to_vec(), &["b"], Some(Lifetime::Seconds(3600)))
            .await
            .unwrap();
        assert_eq!(cache.tag_ttl("a").unwrap(), RemainingTtl::Seconds(60));

        tokio::time::advance(Duration::from_secs(120)).await;
        assert!(cache.has("e1").await.unwrap());
        assert!(cache.find_identifiers_by_tag("a").await.unwrap().is_empty());
        assert_eq!(cache.find_identifiers_by_tag("b").await.unwrap(), vec!["e1"]);
        assert_eq!(sorted(cache.entry_tags("e1").unwrap()), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_entry_list_records_first_insert_only() {
        let cache = cache();
        cache.set("e1", b"v".to_vec(), &[], None).await.unwrap();
        cache.set("e1", b"v2".to_vec(), &[], None).await.unwrap();
        cache.set("e2", b"v".to_vec(), &[], None).await.unwrap();
        assert_eq!(cache.identifier_at(0).await.unwrap().as_deref(), Some("e1"));
        assert_eq!(cache.identifier_at(1).await.unwrap().as_deref(), Some("e2"));
        assert_eq!(cache.identifier_at(2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_status() {
        let status = cache().status().await;
        assert_eq!(status.backend, "memory");
        assert!(status.connected);
    }
}
