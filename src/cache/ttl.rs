//! Lifetimes and expiry reconciliation for shared index keys.

use serde::{Deserialize, Serialize};

use crate::cache::CacheError;

/// Requested lifetime of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifetime {
    /// Never expires.
    Unlimited,
    /// Expires after the given number of seconds.
    Seconds(u64),
}

impl Lifetime {
    /// Longest finite lifetime a backend accepts, one hundred years.
    ///
    /// Far below the point where Redis rejects an expiry or an `Instant`
    /// deadline overflows.
    pub const MAX_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

    /// Build a lifetime from seconds, where `0` means unlimited.
    pub fn from_secs(seconds: u64) -> Self {
        if seconds == 0 {
            Lifetime::Unlimited
        } else {
            Lifetime::Seconds(seconds)
        }
    }

    pub fn as_secs(&self) -> Option<u64> {
        match self {
            Lifetime::Unlimited => None,
            Lifetime::Seconds(seconds) => Some(*seconds),
        }
    }

    /// Normalize a requested lifetime before any write.
    ///
    /// `Seconds(0)` is unlimited, as with `from_secs`. Lifetimes above
    /// `MAX_SECONDS` fail with `InvalidLifetime`.
    pub fn checked(self) -> Result<Self, CacheError> {
        match self {
            Lifetime::Seconds(0) => Ok(Lifetime::Unlimited),
            Lifetime::Seconds(seconds) if seconds > Self::MAX_SECONDS => {
                Err(CacheError::InvalidLifetime {
                    seconds,
                    max: Self::MAX_SECONDS,
                })
            }
            lifetime => Ok(lifetime),
        }
    }
}

/// Remaining time to live of a key as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemainingTtl {
    /// The key does not exist.
    Missing,
    /// The key exists without an expiry.
    Persistent,
    /// The key expires in the given number of seconds.
    Seconds(u64),
}

impl RemainingTtl {
    /// Decode a Redis `TTL` reply (`-2` missing, `-1` persistent).
    pub fn from_reply(reply: i64) -> Self {
        match reply {
            -1 => RemainingTtl::Persistent,
            n if n < 0 => RemainingTtl::Missing,
            n => RemainingTtl::Seconds(n as u64),
        }
    }
}

/// Expiry to apply to a key as part of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Clear any expiry on the key.
    Persistent,
    /// Expire the key after the given number of seconds.
    Seconds(u64),
}

/// Compute the expiry of a shared index key.
///
/// Persistence is sticky: once an index key has no expiry it keeps none,
/// because other entries may rely on it. Otherwise the index must outlive the
/// longest-lived entry referencing it.
pub fn reconcile(current: RemainingTtl, requested: Lifetime) -> Expiry {
    match (current, requested) {
        (RemainingTtl::Persistent, _) | (_, Lifetime::Unlimited) => Expiry::Persistent,
        (RemainingTtl::Missing, Lifetime::Seconds(requested)) => Expiry::Seconds(requested),
        (RemainingTtl::Seconds(current), Lifetime::Seconds(requested)) => {
            Expiry::Seconds(current.max(requested))
        }
    }
}
