use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;

/// Application-wide error type returned by command handlers.
///
/// Library errors convert into it with `?`, and the CLI maps each variant to
/// an exit code.
#[derive(Error, Debug)]
pub enum AppError {
    /// Entry or tag lookup that found nothing
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: String,
        field: String,
        value: String,
    },

    /// Invalid command input
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Cache backend failure
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Configuration error with key information
    #[error("Configuration error: {key}")]
    Configuration {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn not_found(entity: impl Into<String>, field: impl Into<String>, value: impl Into<String>) -> Self {
        AppError::NotFound {
            entity: entity.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::NotFound { .. } => 1,
            AppError::Validation { .. } => 2,
            AppError::Configuration { .. } => 3,
            AppError::Cache(e) if e.is_connectivity() => 4,
            AppError::Cache(_) => 5,
            AppError::Internal { .. } => 70,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        let key = error.field().unwrap_or("config").to_string();
        AppError::Configuration {
            key,
            source: error.into(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        AppError::Internal {
            source: error.into(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;
