//! Tag command handler
//!
//! Handles `flush`, `flush-tag` and `find`.

use std::io::Write;

use crate::cache::CacheManager;
use crate::error::AppResult;

/// Handler for commands addressing tags or the whole cache
pub struct TagCommandHandler<'a> {
    cache: &'a CacheManager,
}

impl<'a> TagCommandHandler<'a> {
    pub fn new(cache: &'a CacheManager) -> Self {
        Self { cache }
    }

    pub async fn flush(&self, out: &mut impl Write) -> AppResult<()> {
        self.cache.flush().await?;
        writeln!(out, "flushed cache '{}'", self.cache.config().cache_name)?;
        Ok(())
    }

    /// Flush every entry carrying any of `tags` and print how many went
    pub async fn flush_tags(&self, out: &mut impl Write, tags: &[String]) -> AppResult<()> {
        let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
        let flushed = self.cache.flush_by_tags(&tags).await?;
        writeln!(out, "flushed {} entries", flushed)?;
        Ok(())
    }

    /// Print the union of identifiers carrying any of `tags`, sorted
    pub async fn find(&self, out: &mut impl Write, tags: &[String]) -> AppResult<()> {
        let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
        let mut identifiers = self.cache.find_identifiers_by_tags(&tags).await?;
        identifiers.sort_unstable();

        for identifier in identifiers {
            writeln!(out, "{}", identifier)?;
        }
        Ok(())
    }
}
