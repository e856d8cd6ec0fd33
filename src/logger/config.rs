//! Resolved logger configuration.
//!
//! Settings from TOML are strings and flags; this module turns them into the
//! shape `init_logger` consumes. A disabled output is `None`, the level is a
//! parsed `tracing::Level`, and terminal detection happens once here.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::Level;

use super::error::LoggerError;

/// Everything needed to install the global subscriber.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub level: Level,
    pub console: Option<ConsoleOutput>,
    pub file: Option<FileOutput>,
}

impl LoggerConfig {
    /// Build a configuration; at least one output must be present.
    pub fn new(
        level: Level,
        console: Option<ConsoleOutput>,
        file: Option<FileOutput>,
    ) -> Result<Self, LoggerError> {
        if console.is_none() && file.is_none() {
            return Err(LoggerError::config(
                "At least one output (console or file) must be enabled",
            ));
        }

        Ok(Self {
            level,
            console,
            file,
        })
    }

    /// Filter directive handed to `EnvFilter` when `RUST_LOG` is unset.
    pub fn filter_directive(&self) -> String {
        self.level.as_str().to_lowercase()
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            console: Some(ConsoleOutput::default()),
            file: None,
        }
    }
}

/// Parse a case-insensitive level name.
pub fn parse_level(level: &str) -> Result<Level, LoggerError> {
    Level::from_str(level.trim()).map_err(|_| {
        LoggerError::config(format!(
            "Invalid log level '{}'. Valid levels are: trace, debug, info, warn, error",
            level
        ))
    })
}

/// Console output on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleOutput {
    pub ansi: bool,
}

impl ConsoleOutput {
    /// Colors are used only when asked for and stderr is a terminal.
    pub fn detect(colored: bool) -> Self {
        Self {
            ansi: colored && std::io::stderr().is_terminal(),
        }
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::detect(true)
    }
}

/// Output to a single log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutput {
    pub path: PathBuf,
    pub append: bool,
    pub format: LogFormat,
}

impl FileOutput {
    pub fn new(path: impl Into<PathBuf>, append: bool, format: LogFormat) -> Result<Self, LoggerError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(LoggerError::config("Log file path cannot be empty"));
        }
        Ok(Self {
            path,
            append,
            format,
        })
    }
}

/// Line format of the file output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(LogFormat::Full),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(LoggerError::config(format!(
                "Invalid log format '{}'. Valid formats are: full, compact, json",
                s
            ))),
        }
    }
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Full => "full",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        }
    }
}
