//! Status command handler

use std::io::Write;

use crate::cache::CacheManager;
use crate::error::AppResult;

/// Handler for the status command
pub struct StatusCommandHandler<'a> {
    cache: &'a CacheManager,
}

impl<'a> StatusCommandHandler<'a> {
    pub fn new(cache: &'a CacheManager) -> Self {
        Self { cache }
    }

    /// Print backend, version and connectivity
    pub async fn execute(&self, out: &mut impl Write, json: bool) -> AppResult<()> {
        let status = self.cache.status().await;

        if json {
            let rendered = serde_json::to_string_pretty(&status).map_err(anyhow::Error::from)?;
            writeln!(out, "{}", rendered)?;
            return Ok(());
        }

        writeln!(out, "backend:   {}", status.backend)?;
        writeln!(out, "cache:     {}", self.cache.config().cache_name)?;
        writeln!(
            out,
            "version:   {}",
            status.version.as_deref().unwrap_or("n/a")
        )?;
        writeln!(out, "connected: {}", status.connected)?;
        writeln!(out, "supported: {}", status.supported)?;
        Ok(())
    }
}
