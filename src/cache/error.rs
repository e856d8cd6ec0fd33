//! Cache error types.

use redis::RedisError;
use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache operation failed: {0}")]
    Operation(String),

    #[error("Cache connection failed: {0}")]
    Connection(String),

    #[error("Redis server version {found} is not supported, at least {required} is required")]
    UnsupportedStoreVersion { found: String, required: String },

    #[error("Gave up on entry '{identifier}' after {attempts} conflicting transactions")]
    ContentionExceeded { identifier: String, attempts: u32 },

    #[error("Lifetime of {seconds}s exceeds the maximum of {max}s")]
    InvalidLifetime { seconds: u64, max: u64 },

    #[error("Invalid {kind} '{value}'")]
    InvalidIdentifier { kind: &'static str, value: String },

    #[error("Payload codec error: {0}")]
    Codec(String),

    #[error("Cache not initialized")]
    NotInitialized,
}

impl From<RedisError> for CacheError {
    fn from(error: RedisError) -> Self {
        if error.is_io_error()
            || error.is_connection_refusal()
            || error.is_connection_dropped()
            || error.is_timeout()
        {
            CacheError::Connection(error.to_string())
        } else {
            CacheError::Operation(error.to_string())
        }
    }
}

impl CacheError {
    /// Whether the error means the store could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, CacheError::Connection(_))
    }
}
