//! Redis tagged cache using a bb8 connection pool.
//!
//! Writes and removals are optimistic `WATCH`/`MULTI`/`EXEC` transactions
//! retried under a `RetryPolicy`, and bulk deletes run as server-side Lua
//! scripts, so no other client ever observes an entry without its tag edges.

use std::sync::Arc;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, FromRedisValue, Pipeline};
use tokio::sync::OnceCell;

use crate::cache::codec::{PayloadCodec, codec_for_level};
use crate::cache::keys::{KeyNamespace, validate_identifier};
use crate::cache::retry::RetryPolicy;
use crate::cache::scripts::{FLUSH_BY_TAG_SCRIPT, FLUSH_SCRIPT};
use crate::cache::traits::{IterableCache, StoreStatus, TaggableCache};
use crate::cache::ttl::{Expiry, Lifetime, RemainingTtl, reconcile};
use crate::cache::CacheError;
use crate::config::settings::{CacheConfig, RedisCacheConfig};

type RedisPool = Pool<Client>;

/// Oldest server with `SET ... EX`, `EVAL` and `WATCH`/`MULTI` semantics we rely on.
const MINIMUM_VERSION: (u32, u32, u32) = (2, 6, 12);

/// Server version as reported by `INFO server`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StoreVersion {
    raw: String,
    parsed: Option<(u32, u32, u32)>,
}

impl StoreVersion {
    fn from_info(info: &str) -> Self {
        let raw = info
            .lines()
            .find_map(|line| line.trim().strip_prefix("redis_version:"))
            .unwrap_or("unknown")
            .to_string();
        let parsed = parse_version(&raw);
        Self { raw, parsed }
    }

    fn is_supported(&self) -> bool {
        self.parsed.is_some_and(|version| version >= MINIMUM_VERSION)
    }
}

fn parse_version(raw: &str) -> Option<(u32, u32, u32)> {
    let mut parts = raw.split('.').map(|part| part.parse::<u32>().ok());
    let major = parts.next()??;
    let minor = parts.next().flatten().unwrap_or(0);
    let patch = parts.next().flatten().unwrap_or(0);
    Some((major, minor, patch))
}

fn apply_expiry(pipe: &mut Pipeline, key: &str, expiry: Expiry) {
    match expiry {
        Expiry::Persistent => {
            pipe.persist(key).ignore();
        }
        Expiry::Seconds(seconds) => {
            pipe.expire(key, i64::try_from(seconds).unwrap_or(i64::MAX)).ignore();
        }
    }
}

/// Tag-indexed cache stored in a single Redis instance.
pub struct RedisTagCache {
    pool: RedisPool,
    keys: KeyNamespace,
    default_lifetime: Lifetime,
    codec: Arc<dyn PayloadCodec>,
    retry: RetryPolicy,
    version: OnceCell<StoreVersion>,
}

impl RedisTagCache {
    pub async fn new(config: &CacheConfig) -> Result<Self, CacheError> {
        let redis = &config.redis;
        let client = Client::open(connection_url(redis).as_str())
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(redis.pool_size)
            .connection_timeout(std::time::Duration::from_secs(redis.connection_timeout))
            .build(client)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            keys: KeyNamespace::new(&config.key_prefix, &config.cache_name),
            default_lifetime: Lifetime::from_secs(config.default_lifetime),
            codec: codec_for_level(config.compression_level),
            retry: RetryPolicy::from(&config.remove_retry),
            version: OnceCell::new(),
        })
    }

    /// Replace the payload codec.
    pub fn with_codec(mut self, codec: Arc<dyn PayloadCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Replace the retry policy used by `set` and `remove`.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn keys(&self) -> &KeyNamespace {
        &self.keys
    }

    async fn get_conn(&self) -> Result<PooledConnection<'_, Client>, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))
    }

    /// Read the server version once and keep it for the lifetime of this cache.
    async fn store_version(&self) -> Result<&StoreVersion, CacheError> {
        self.version
            .get_or_try_init(|| async {
                let mut conn = self.get_conn().await?;
                let conn_ref: &mut MultiplexedConnection = &mut conn;
                let info: String = redis::cmd("INFO").arg("server").query_async(conn_ref).await?;
                let version = StoreVersion::from_info(&info);
                tracing::debug!(version = %version.raw, "Detected Redis server version");
                Ok::<_, CacheError>(version)
            })
            .await
    }

    /// Fail with `UnsupportedStoreVersion` if the server is too old.
    pub async fn verify_store_version(&self) -> Result<(), CacheError> {
        let version = self.store_version().await?;
        if version.is_supported() {
            Ok(())
        } else {
            let (major, minor, patch) = MINIMUM_VERSION;
            Err(CacheError::UnsupportedStoreVersion {
                found: version.raw.clone(),
                required: format!("{}.{}.{}", major, minor, patch),
            })
        }
    }

    /// Replace a failed write's error with `UnsupportedStoreVersion` when
    /// the server turns out to be too old for the commands we send.
    async fn explain_write_failure(&self, error: CacheError) -> CacheError {
        if !matches!(error, CacheError::Operation(_)) {
            return error;
        }
        match self.verify_store_version().await {
            Err(unsupported @ CacheError::UnsupportedStoreVersion { .. }) => unsupported,
            _ => error,
        }
    }

    /// One optimistic write attempt. `Ok(false)` means a watched key changed
    /// between the reads and EXEC.
    async fn try_set(
        &self,
        conn: &mut MultiplexedConnection,
        write: &EntryWrite<'_>,
    ) -> Result<bool, CacheError> {
        let mut watch = redis::cmd("WATCH");
        watch.arg(&write.entry_key).arg(&write.entry_tags_key);
        for tag_key in &write.tag_keys {
            watch.arg(tag_key);
        }
        watch.query_async::<()>(&mut *conn).await?;

        // Expiries of shared keys depend on what is already there.
        let mut reads = redis::pipe();
        reads.exists(&write.entry_key).ttl(&write.entry_tags_key);
        for tag_key in &write.tag_keys {
            reads.ttl(tag_key);
        }
        let replies: Vec<i64> = match reads.query_async(&mut *conn).await {
            Ok(replies) => replies,
            Err(error) => {
                let _ = redis::cmd("UNWATCH").query_async::<()>(&mut *conn).await;
                return Err(error.into());
            }
        };

        let pipe = write.transaction(&self.keys, replies);
        let reply: redis::Value = pipe.query_async(&mut *conn).await?;
        exec_committed(reply)
    }

    /// One optimistic removal attempt. `Ok(false)` means the watched tag set
    /// changed and the transaction was discarded.
    async fn try_remove(
        &self,
        conn: &mut MultiplexedConnection,
        identifier: &str,
    ) -> Result<bool, CacheError> {
        let entry_tags_key = self.keys.entry_tags_key(identifier);

        redis::cmd("WATCH")
            .arg(&entry_tags_key)
            .query_async::<()>(&mut *conn)
            .await?;

        let tags: Vec<String> = match conn.smembers(&entry_tags_key).await {
            Ok(tags) => tags,
            Err(error) => {
                let _ = redis::cmd("UNWATCH").query_async::<()>(&mut *conn).await;
                return Err(error.into());
            }
        };

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.del(self.keys.entry_key(identifier)).ignore();
        for tag in &tags {
            pipe.srem(self.keys.tag_key(tag), identifier).ignore();
        }
        pipe.del(&entry_tags_key).ignore();

        let reply: redis::Value = pipe.query_async(&mut *conn).await?;
        exec_committed(reply)
    }
}

/// A nil EXEC reply means a watched key changed and nothing was applied.
fn exec_committed(reply: redis::Value) -> Result<bool, CacheError> {
    Option::<()>::from_redis_value(reply)
        .map(|committed| committed.is_some())
        .map_err(|e| CacheError::Operation(e.to_string()))
}

/// Everything one `set` writes, computed before the first attempt.
struct EntryWrite<'a> {
    identifier: &'a str,
    stored: Vec<u8>,
    tags: &'a [&'a str],
    lifetime: Lifetime,
    entry_key: String,
    entry_tags_key: String,
    tag_keys: Vec<String>,
}

impl EntryWrite<'_> {
    /// The MULTI/EXEC batch, given the `EXISTS` and `TTL` replies read under WATCH.
    fn transaction(&self, keys: &KeyNamespace, replies: Vec<i64>) -> Pipeline {
        let mut replies = replies.into_iter();
        let is_new = replies.next().unwrap_or(0) == 0;
        let entry_tags_expiry = reconcile(
            RemainingTtl::from_reply(replies.next().unwrap_or(-2)),
            self.lifetime,
        );

        let mut pipe = redis::pipe();
        pipe.atomic();

        let mut set_entry = redis::cmd("SET");
        set_entry.arg(&self.entry_key).arg(&self.stored);
        if let Some(seconds) = self.lifetime.as_secs() {
            set_entry.arg("EX").arg(seconds);
        }
        pipe.add_command(set_entry).ignore();

        for (tag, tag_key) in self.tags.iter().zip(&self.tag_keys) {
            let tag_expiry = reconcile(
                RemainingTtl::from_reply(replies.next().unwrap_or(-2)),
                self.lifetime,
            );
            pipe.sadd(tag_key, self.identifier).ignore();
            apply_expiry(&mut pipe, tag_key, tag_expiry);
            pipe.sadd(&self.entry_tags_key, *tag).ignore();
        }
        if !self.tags.is_empty() {
            apply_expiry(&mut pipe, &self.entry_tags_key, entry_tags_expiry);
        }
        if is_new {
            pipe.rpush(keys.entry_list_key(), self.identifier).ignore();
        }
        pipe
    }
}

/// Build the connection URL, switching to `rediss://` when TLS is enabled.
fn connection_url(config: &RedisCacheConfig) -> String {
    match config.url.strip_prefix("redis://") {
        Some(rest) if config.tls_enabled => format!("rediss://{}", rest),
        _ => config.url.clone(),
    }
}

#[async_trait]
impl TaggableCache for RedisTagCache {
    async fn get(&self, identifier: &str) -> Result<Option<Vec<u8>>, CacheError> {
        validate_identifier("entry identifier", identifier)?;
        let mut conn = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let stored: Option<Vec<u8>> = conn_ref.get(self.keys.entry_key(identifier)).await?;
        stored.map(|bytes| self.codec.decode(&bytes)).transpose()
    }

    async fn has(&self, identifier: &str) -> Result<bool, CacheError> {
        validate_identifier("entry identifier", identifier)?;
        let mut conn = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        Ok(conn_ref.exists(self.keys.entry_key(identifier)).await?)
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
        let write = EntryWrite {
            identifier,
            stored: self.codec.encode(&payload)?,
            tags,
            lifetime,
            entry_key: self.keys.entry_key(identifier),
            entry_tags_key: self.keys.entry_tags_key(identifier),
            tag_keys: tags.iter().map(|tag| self.keys.tag_key(tag)).collect(),
        };

        let write = &write;
        let outcome = self
            .retry
            .run("set", identifier, || async move {
                let mut conn = self.get_conn().await?;
                let committed = self.try_set(&mut conn, write).await?;
                Ok::<_, CacheError>(committed.then_some(()))
            })
            .await;
        if let Err(error) = outcome {
            return Err(self.explain_write_failure(error).await);
        }

        tracing::debug!(
            identifier,
            tags = tags.len(),
            lifetime = ?lifetime,
            "Stored cache entry"
        );
        Ok(())
    }

    async fn remove(&self, identifier: &str) -> Result<bool, CacheError> {
        validate_identifier("entry identifier", identifier)?;

        self.retry
            .run("remove", identifier, || async move {
                let mut conn = self.get_conn().await?;
                let committed = self.try_remove(&mut conn, identifier).await?;
                Ok::<_, CacheError>(committed.then_some(()))
            })
            .await?;

        tracing::debug!(identifier, "Removed cache entry");
        Ok(true)
    }

    async fn flush(&self) -> Result<(), CacheError> {
        let mut conn = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let deleted: u64 = FLUSH_SCRIPT
            .arg(self.keys.flush_pattern())
            .invoke_async(conn_ref)
            .await?;

        tracing::info!(prefix = self.keys.prefix(), deleted, "Flushed cache");
        Ok(())
    }

    async fn flush_by_tag(&self, tag: &str) -> Result<u64, CacheError> {
        validate_identifier("tag", tag)?;
        let mut conn = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let flushed: u64 = FLUSH_BY_TAG_SCRIPT
            .key(self.keys.tag_key(tag))
            .arg(self.keys.prefix())
            .invoke_async(conn_ref)
            .await?;

        tracing::info!(tag, flushed, "Flushed cache entries by tag");
        Ok(flushed)
    }

    async fn find_identifiers_by_tag(&self, tag: &str) -> Result<Vec<String>, CacheError> {
        validate_identifier("tag", tag)?;
        let mut conn = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        Ok(conn_ref.smembers(self.keys.tag_key(tag)).await?)
    }

    async fn find_identifiers_by_tags(&self, tags: &[&str]) -> Result<Vec<String>, CacheError> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        for tag in tags {
            validate_identifier("tag", tag)?;
        }
        let tag_keys: Vec<String> = tags.iter().map(|tag| self.keys.tag_key(tag)).collect();
        let mut conn = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        Ok(conn_ref.sunion(tag_keys).await?)
    }

    async fn status(&self) -> StoreStatus {
        match self.store_version().await {
            Ok(version) => StoreStatus {
                backend: "redis",
                version: Some(version.raw.clone()),
                connected: true,
                supported: version.is_supported(),
            },
            Err(error) => {
                tracing::warn!(error = %error, "Redis status check failed");
                StoreStatus {
                    backend: "redis",
                    version: None,
                    connected: false,
                    supported: false,
                }
            }
        }
    }
}

#[async_trait]
impl IterableCache for RedisTagCache {
    async fn identifier_at(&self, index: u64) -> Result<Option<String>, CacheError> {
        let mut conn = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        Ok(conn_ref
            .lindex(self.keys.entry_list_key(), index as isize)
            .await?)
    }
}
