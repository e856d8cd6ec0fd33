//! Tag-indexed cache with lifetime-aware tag bookkeeping.
//!
//! Entries are stored under a namespaced identifier and may carry any number
//! of tags. Every tag keeps a set of the entries that use it, and every entry
//! keeps a set of its own tags, so both directions can be queried and a whole
//! tag can be flushed at once. Tag sets never expire before the longest-lived
//! entry they reference.
//!
//! Backends:
//! - Redis (shared, atomic writes through MULTI/EXEC, optimistic removal)
//! - Memory (in-process, same protocol, used by tests and the CLI)
//!
//! # Configuration
//!
//! Configure caching in your TOML config file:
//!
//! ```toml
//! [cache]
//! enabled = true
//! backend = "redis"  # or "memory"
//! key_prefix = "fusion"
//! cache_name = "default"
//! default_lifetime = 3600
//! compression_level = 0
//! stale_slots = "skip"  # or "stop"
//!
//! [cache.remove_retry]
//! max_attempts = 100  # 0 retries forever
//! base_delay_ms = 1
//! backoff_multiplier = 2.0
//! max_delay_ms = 50
//!
//! [cache.redis]
//! url = "redis://127.0.0.1:6379"
//! pool_size = 4
//! connection_timeout = 5
//! tls_enabled = false
//! ```
//!
//! # Usage
//!
//! Use the `tag_cached!` macro to define cached functions:
//!
//! ```ignore
//! tag_cached! {
//!     name = "room",
//!     tags = ["rooms"],
//!     key = |room_id: &str| room_id.to_string(),
//!     async fn get_cached_room(cache: &CacheManager, room_id: &str) -> AppResult<Room> {
//!         provider.get_room(room_id).await
//!     }
//! }
//! ```

mod codec;
mod error;
mod iter;
mod keys;
#[macro_use]
mod macros;
mod manager;
mod memory;
mod noop;
mod redis;
mod retry;
mod scripts;
mod traits;
mod ttl;

pub use codec::{PayloadCodec, PlainCodec, ZlibCodec, codec_for_level};
pub use error::CacheError;
pub use iter::{EntryIterator, StaleSlotPolicy};
pub use keys::{KeyNamespace, validate_identifier};
pub use manager::{CacheManager, get_cache, init_cache, require_cache};
pub use memory::MemoryTagCache;
pub use noop::NoOpCache;
pub use self::redis::RedisTagCache;
pub use retry::RetryPolicy;
pub use traits::{IterableCache, StoreStatus, TaggableCache};
pub use ttl::{Expiry, Lifetime, RemainingTtl, reconcile};

// Re-export config types
pub use crate::config::settings::{
    CacheBackend, CacheConfig, RedisCacheConfig, RemoveRetryConfig,
};
