//! CLI argument parsing with clap
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, arguments, and their documentation.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::settings::CacheBackend;

/// Inspect and manage a tag-indexed cache
#[derive(Parser, Debug)]
#[command(name = "fusion-cache")]
#[command(about = "Inspect and manage a tag-indexed cache")]
#[command(long_about = "
fusion-cache stores payloads under identifiers, attaches tags to them and
keeps a tag index with lifetimes that never fall short of the entries they
reference. Entries can be looked up by identifier or by tag and flushed one
tag at a time.

EXAMPLES:
    # Store a value tagged with two tags for ten minutes
    fusion-cache set user_42 '{\"name\":\"ada\"}' --tag users --tag team_7 --lifetime 600

    # Read it back
    fusion-cache get user_42

    # Every identifier carrying either tag
    fusion-cache find users team_7

    # Drop everything tagged with users
    fusion-cache flush-tag users

    # Walk the entry list of a Redis backed cache
    fusion-cache --backend redis list

    # Check store connectivity and version
    fusion-cache status --json
")]
#[command(version = crate::clap_long_version())]
pub struct Cli {
    /// Subcommand to execute (defaults to `status`)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    ///
    /// Use a single TOML file instead of the layered `config/` directory.
    /// The file must exist and be readable.
    ///
    /// Example: --config /etc/fusion-cache/production.toml
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection
    ///
    /// Selects which `{environment}.toml` layer is loaded.
    ///
    /// Available values: development (dev), staging (stage), production (prod), test
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Cache backend override
    ///
    /// Forces the backend and enables the cache regardless of configuration.
    #[arg(short, long, value_enum)]
    pub backend: Option<Backend>,

    /// Enable verbose logging
    ///
    /// Raises log output to debug level.
    /// Cannot be used with --quiet.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-error log output
    ///
    /// Cannot be used with --verbose.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Store a value under an identifier
    ///
    /// Tags are additive: tags from earlier writes stay attached.
    ///
    /// Examples:
    ///   fusion-cache set page_home '<html>' --tag pages
    ///   fusion-cache set token_1 abc --lifetime 0   # never expires
    Set {
        /// Entry identifier
        #[arg(value_parser = super::validation::validate_identifier_arg)]
        identifier: String,

        /// Value to store, taken verbatim as UTF-8 bytes
        value: String,

        /// Tag to attach, may be repeated
        #[arg(short, long = "tag", value_name = "TAG", value_parser = super::validation::validate_tag_arg)]
        tags: Vec<String>,

        /// Lifetime in seconds, 0 keeps the entry forever
        ///
        /// Defaults to `cache.default_lifetime` from configuration.
        #[arg(short, long, value_name = "SECONDS")]
        lifetime: Option<u64>,
    },

    /// Print the value stored under an identifier
    Get {
        #[arg(value_parser = super::validation::validate_identifier_arg)]
        identifier: String,
    },

    /// Report whether an identifier is stored
    Has {
        #[arg(value_parser = super::validation::validate_identifier_arg)]
        identifier: String,
    },

    /// Remove an entry and detach it from its tags
    Remove {
        #[arg(value_parser = super::validation::validate_identifier_arg)]
        identifier: String,
    },

    /// Remove every key of this cache
    Flush,

    /// Remove every entry carrying any of the given tags
    FlushTag {
        #[arg(required = true, value_parser = super::validation::validate_tag_arg)]
        tags: Vec<String>,
    },

    /// List the identifiers carrying any of the given tags
    Find {
        #[arg(required = true, value_parser = super::validation::validate_tag_arg)]
        tags: Vec<String>,
    },

    /// Walk the entry list in insertion order
    List {
        /// Print payloads next to identifiers
        #[arg(long)]
        values: bool,
    },

    /// Show backend, store version and connectivity
    Status {
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Environment options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
    #[value(name = "test")]
    Test,
}

/// Backend options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    #[value(name = "memory")]
    Memory,
    #[value(name = "redis")]
    Redis,
}

impl Cli {
    /// The command to run, `status` when none was given.
    pub fn resolved_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or(Commands::Status { json: false })
    }

    /// Validate argument combinations clap cannot express
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use --verbose and --quiet together".to_string());
        }

        if let Some(Commands::Set { tags, .. }) = &self.command {
            let mut seen = std::collections::HashSet::new();
            if let Some(duplicate) = tags.iter().find(|tag| !seen.insert(tag.as_str())) {
                return Err(format!("Tag '{}' was given more than once", duplicate));
            }
        }

        Ok(())
    }
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Staging => crate::config::Environment::Staging,
            Environment::Production => crate::config::Environment::Production,
            Environment::Test => crate::config::Environment::Test,
        }
    }
}

impl From<Backend> for CacheBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Memory => CacheBackend::Memory,
            Backend::Redis => CacheBackend::Redis,
        }
    }
}
