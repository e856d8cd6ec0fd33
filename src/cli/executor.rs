//! Command executor for dispatching CLI commands
//!
//! This module provides the main entry point for executing CLI commands
//! after parsing and configuration loading.

use std::io::Write;

use super::handlers::{EntryCommandHandler, StatusCommandHandler, TagCommandHandler};
use super::parser::{Cli, Commands};
use crate::cache::CacheManager;
use crate::config::settings::{CacheBackend, CacheConfig, Settings};
use crate::error::{AppError, AppResult};

/// Execute a CLI command with the given settings, printing to stdout
pub async fn execute_command(cli: &Cli, settings: Settings) -> AppResult<()> {
    let mut out = std::io::stdout();
    execute_command_to(cli, settings, &mut out).await?;
    out.flush()?;
    Ok(())
}

/// Execute a CLI command, writing its output to `out`
///
/// # Errors
/// Returns validation failures, cache errors and output errors
pub async fn execute_command_to(
    cli: &Cli,
    settings: Settings,
    out: &mut impl Write,
) -> AppResult<()> {
    validate_command_args(cli, &settings)?;

    let cache = CacheManager::new(settings.cache).await?;
    let command = cli.resolved_command();
    tracing::debug!(command = ?command, backend = cache.config().backend.as_str(), "Executing command");

    match command {
        Commands::Set {
            identifier,
            value,
            tags,
            lifetime,
        } => {
            EntryCommandHandler::new(&cache)
                .set(out, &identifier, &value, &tags, lifetime)
                .await
        }
        Commands::Get { identifier } => EntryCommandHandler::new(&cache).get(out, &identifier).await,
        Commands::Has { identifier } => EntryCommandHandler::new(&cache).has(out, &identifier).await,
        Commands::Remove { identifier } => {
            EntryCommandHandler::new(&cache).remove(out, &identifier).await
        }
        Commands::List { values } => EntryCommandHandler::new(&cache).list(out, values).await,
        Commands::Flush => TagCommandHandler::new(&cache).flush(out).await,
        Commands::FlushTag { tags } => TagCommandHandler::new(&cache).flush_tags(out, &tags).await,
        Commands::Find { tags } => TagCommandHandler::new(&cache).find(out, &tags).await,
        Commands::Status { json } => StatusCommandHandler::new(&cache).execute(out, json).await,
    }
}

/// Validate command arguments against the loaded configuration
fn validate_command_args(cli: &Cli, settings: &Settings) -> AppResult<()> {
    cli.validate()
        .map_err(|msg| AppError::validation("cli_arguments", msg))?;

    if let Some(warning) = write_warning(&cli.resolved_command(), &settings.cache) {
        tracing::warn!("{}", warning);
    }

    Ok(())
}

/// Warning for a write that will not outlive this process.
fn write_warning(command: &Commands, cache: &CacheConfig) -> Option<&'static str> {
    let writes = matches!(
        command,
        Commands::Set { .. } | Commands::Remove { .. } | Commands::Flush | Commands::FlushTag { .. }
    );
    if !writes {
        None
    } else if !cache.enabled {
        Some("Caching is disabled, the command has no effect. Use --backend to pick one.")
    } else if cache.backend == CacheBackend::Memory {
        Some("The memory backend lives only as long as this process. Use --backend redis to keep entries.")
    } else {
        None
    }
}
