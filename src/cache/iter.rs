//! Cursor iteration over the identifiers a cache has recorded.
//!
//! The entry list is append-only and never reflects removals or expiry, so
//! every slot is checked against the live entry before it is reported.

use serde::{Deserialize, Serialize};

use crate::cache::CacheError;
use crate::cache::traits::IterableCache;

/// What to do when the slot under the cursor names an entry that is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StaleSlotPolicy {
    /// Move on to the next live slot.
    #[default]
    Skip,
    /// Treat the stale slot as the end of the list.
    Stop,
}

/// Cursor over the entry list of an [`IterableCache`].
///
/// ```ignore
/// let mut entries = EntryIterator::new(&cache, StaleSlotPolicy::Skip);
/// entries.rewind();
/// while entries.valid().await? {
///     let identifier = entries.key().await?;
///     let payload = entries.current().await?;
///     entries.next();
/// }
/// ```
pub struct EntryIterator<'a, C: IterableCache + ?Sized> {
    cache: &'a C,
    cursor: u64,
    policy: StaleSlotPolicy,
}

impl<'a, C: IterableCache + ?Sized> EntryIterator<'a, C> {
    pub fn new(cache: &'a C, policy: StaleSlotPolicy) -> Self {
        Self {
            cache,
            cursor: 0,
            policy,
        }
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Identifier under the cursor, or `None` once the iterator is exhausted.
    ///
    /// With [`StaleSlotPolicy::Skip`] the cursor advances past stale slots.
    pub async fn key(&mut self) -> Result<Option<String>, CacheError> {
        loop {
            let Some(identifier) = self.cache.identifier_at(self.cursor).await? else {
                return Ok(None);
            };
            if self.cache.has(&identifier).await? {
                return Ok(Some(identifier));
            }
            match self.policy {
                StaleSlotPolicy::Stop => return Ok(None),
                StaleSlotPolicy::Skip => {
                    tracing::trace!(cursor = self.cursor, identifier = %identifier, "Skipping stale entry slot");
                    self.cursor += 1;
                }
            }
        }
    }

    pub async fn valid(&mut self) -> Result<bool, CacheError> {
        Ok(self.key().await?.is_some())
    }

    /// Payload of the entry under the cursor.
    pub async fn current(&mut self) -> Result<Option<Vec<u8>>, CacheError> {
        match self.key().await? {
            Some(identifier) => self.cache.get(&identifier).await,
            None => Ok(None),
        }
    }

    pub fn next(&mut self) {
        self.cursor += 1;
    }

    /// Drain the remaining live identifiers.
    pub async fn collect_identifiers(&mut self) -> Result<Vec<String>, CacheError> {
        let mut identifiers = Vec::new();
        while let Some(identifier) = self.key().await? {
            identifiers.push(identifier);
            self.next();
        }
        Ok(identifiers)
    }
}
