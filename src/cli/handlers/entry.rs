//! Entry command handler
//!
//! Handles `set`, `get`, `has`, `remove` and `list`.

use std::io::Write;

use crate::cache::{CacheManager, Lifetime};
use crate::error::{AppError, AppResult};

/// Handler for commands addressing single entries
pub struct EntryCommandHandler<'a> {
    cache: &'a CacheManager,
}

impl<'a> EntryCommandHandler<'a> {
    pub fn new(cache: &'a CacheManager) -> Self {
        Self { cache }
    }

    /// Store `value` under `identifier`
    ///
    /// `lifetime` of 0 stores the entry without expiry, `None` uses the
    /// configured default.
    pub async fn set(
        &self,
        out: &mut impl Write,
        identifier: &str,
        value: &str,
        tags: &[String],
        lifetime: Option<u64>,
    ) -> AppResult<()> {
        let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
        self.cache
            .set(
                identifier,
                value.as_bytes().to_vec(),
                &tags,
                lifetime.map(Lifetime::from_secs),
            )
            .await?;

        writeln!(out, "stored {}", identifier)?;
        Ok(())
    }

    /// Print the payload, lossily decoded as UTF-8
    ///
    /// # Errors
    /// Returns `AppError::NotFound` when nothing is stored under `identifier`.
    pub async fn get(&self, out: &mut impl Write, identifier: &str) -> AppResult<()> {
        let payload = self
            .cache
            .get(identifier)
            .await?
            .ok_or_else(|| AppError::not_found("entry", "identifier", identifier))?;

        writeln!(out, "{}", String::from_utf8_lossy(&payload))?;
        Ok(())
    }

    pub async fn has(&self, out: &mut impl Write, identifier: &str) -> AppResult<()> {
        let exists = self.cache.has(identifier).await?;
        writeln!(out, "{}", exists)?;
        Ok(())
    }

    pub async fn remove(&self, out: &mut impl Write, identifier: &str) -> AppResult<()> {
        self.cache.remove(identifier).await?;
        writeln!(out, "removed {}", identifier)?;
        Ok(())
    }

    /// Walk the entry list, skipping or stopping at stale slots as configured
    pub async fn list(&self, out: &mut impl Write, with_values: bool) -> AppResult<()> {
        let mut entries = self.cache.entries();
        let mut listed = 0u64;

        while let Some(identifier) = entries.key().await? {
            if with_values {
                let payload = entries.current().await?.unwrap_or_default();
                writeln!(out, "{}\t{}", identifier, String::from_utf8_lossy(&payload))?;
            } else {
                writeln!(out, "{}", identifier)?;
            }
            listed += 1;
            entries.next();
        }

        tracing::debug!(listed, "Listed cache entries");
        Ok(())
    }
}
