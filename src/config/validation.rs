//! Range and format checks run after loading.
//!
//! Every failure names the dotted setting it concerns.

use crate::cache::{Lifetime, validate_identifier};
use crate::config::error::ConfigError;
use crate::config::settings::{
    CacheBackend, CacheConfig, LoggerSettings, RedisCacheConfig, RemoveRetryConfig, Settings,
};

/// Accepted Redis URL schemes
const VALID_REDIS_SCHEMES: &[&str] = &["redis://", "rediss://", "redis+unix://", "unix://"];

/// Highest zlib compression level
const MAX_COMPRESSION_LEVEL: u32 = 9;

impl LoggerSettings {
    /// Check the level, the file output and that some output is enabled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.clone().into_logger_config().map(|_| ())
    }
}

impl RedisCacheConfig {
    /// Validate Redis connection settings
    ///
    /// # Validation Rules
    /// - URL must use a redis scheme
    /// - Pool size must be greater than 0
    /// - Connection timeout must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_REDIS_SCHEMES
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
        {
            return Err(ConfigError::ValidationError {
                field: "cache.redis.url".to_string(),
                message: format!(
                    "Invalid Redis URL '{}'. Expected one of: {}",
                    self.url,
                    VALID_REDIS_SCHEMES.join(", ")
                ),
            });
        }

        if self.pool_size == 0 {
            return Err(ConfigError::validation(
                "cache.redis.pool_size",
                "Pool size must be greater than 0.",
            ));
        }

        if self.connection_timeout == 0 {
            return Err(ConfigError::validation(
                "cache.redis.connection_timeout",
                "Connection timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl RemoveRetryConfig {
    /// Validate removal backoff
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::validation(
                "cache.remove_retry.backoff_multiplier",
                "Backoff multiplier must be a finite number of at least 1.0.",
            ));
        }

        if self.max_delay_ms < self.base_delay_ms {
            return Err(ConfigError::ValidationError {
                field: "cache.remove_retry.max_delay_ms".to_string(),
                message: format!(
                    "Max delay ({}ms) cannot be shorter than base delay ({}ms).",
                    self.max_delay_ms, self.base_delay_ms
                ),
            });
        }

        Ok(())
    }
}

impl CacheConfig {
    /// Validate cache configuration
    ///
    /// # Validation Rules
    /// - Key prefix and cache name must be valid identifiers
    /// - Compression level must be between 0 and 9
    /// - Default lifetime must not exceed `Lifetime::MAX_SECONDS`
    /// - Removal backoff must grow and be capped above its base
    /// - Redis settings are checked only when the Redis backend is selected
    pub fn validate(&self) -> Result<(), ConfigError> {
        if validate_identifier("key prefix", &self.key_prefix).is_err() {
            return Err(ConfigError::ValidationError {
                field: "cache.key_prefix".to_string(),
                message: format!(
                    "Invalid key prefix '{}'. Use 1-250 characters from a-z, A-Z, 0-9, _, %, -, &.",
                    self.key_prefix
                ),
            });
        }

        if validate_identifier("cache name", &self.cache_name).is_err() {
            return Err(ConfigError::ValidationError {
                field: "cache.cache_name".to_string(),
                message: format!(
                    "Invalid cache name '{}'. Use 1-250 characters from a-z, A-Z, 0-9, _, %, -, &.",
                    self.cache_name
                ),
            });
        }

        if self.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(ConfigError::ValidationError {
                field: "cache.compression_level".to_string(),
                message: format!(
                    "Compression level {} is out of range. Valid levels are 0 to {}.",
                    self.compression_level, MAX_COMPRESSION_LEVEL
                ),
            });
        }

        if self.default_lifetime > Lifetime::MAX_SECONDS {
            return Err(ConfigError::ValidationError {
                field: "cache.default_lifetime".to_string(),
                message: format!(
                    "Default lifetime {}s exceeds the maximum of {}s. Use 0 for no expiry.",
                    self.default_lifetime,
                    Lifetime::MAX_SECONDS
                ),
            });
        }

        self.remove_retry.validate()?;

        if self.backend == CacheBackend::Redis {
            self.redis.validate()?;
        }

        Ok(())
    }
}

impl Settings {
    /// Validate all configuration settings
    ///
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logger.validate()?;
        self.cache.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::{ConsoleSettings, FileSettings};

    fn field_of(err: ConfigError) -> String {
        match err {
            ConfigError::ValidationError { field, .. } => field,
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    // ========================================================================
    // LoggerSettings validation tests
    // ========================================================================

    #[test]
    fn test_logger_settings_valid() {
        assert!(LoggerSettings::default().validate().is_ok());
    }

    #[test]
    fn test_logger_settings_invalid_level() {
        let settings = LoggerSettings {
            level: "verbose".to_string(),
            ..Default::default()
        };
        assert_eq!(field_of(settings.validate().unwrap_err()), "logger.level");
    }

    #[test]
    fn test_logger_settings_file_enabled_empty_path() {
        let settings = LoggerSettings {
            file: FileSettings {
                enabled: true,
                path: "  ".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(field_of(settings.validate().unwrap_err()), "logger.file.path");
    }

    #[test]
    fn test_logger_settings_file_disabled_empty_path_ok() {
        let settings = LoggerSettings {
            file: FileSettings {
                enabled: false,
                path: String::new(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_logger_settings_invalid_format() {
        let settings = LoggerSettings {
            file: FileSettings {
                format: "xml".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(field_of(settings.validate().unwrap_err()), "logger.file.format");
    }

    #[test]
    fn test_logger_settings_need_an_output() {
        let settings = LoggerSettings {
            console: ConsoleSettings {
                enabled: false,
                colored: false,
            },
            ..Default::default()
        };
        assert_eq!(field_of(settings.validate().unwrap_err()), "logger");
    }

    // ========================================================================
    // CacheConfig validation tests
    // ========================================================================

    #[test]
    fn test_cache_config_valid() {
        assert!(CacheConfig::default().validate().is_ok());
    }

    #[test]
    fn test_cache_config_rejects_endless_default_lifetime() {
        let config = CacheConfig {
            default_lifetime: u64::MAX,
            ..Default::default()
        };
        assert_eq!(field_of(config.validate().unwrap_err()), "cache.default_lifetime");

        let config = CacheConfig {
            default_lifetime: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cache_config_rejects_bad_namespace() {
        let config = CacheConfig {
            key_prefix: "has:colon".to_string(),
            ..Default::default()
        };
        assert_eq!(field_of(config.validate().unwrap_err()), "cache.key_prefix");

        let config = CacheConfig {
            cache_name: String::new(),
            ..Default::default()
        };
        assert_eq!(field_of(config.validate().unwrap_err()), "cache.cache_name");
    }

    #[test]
    fn test_cache_config_compression_level_range() {
        for level in 0..=9 {
            let config = CacheConfig {
                compression_level: level,
                ..Default::default()
            };
            assert!(config.validate().is_ok(), "level {} should be valid", level);
        }

        let config = CacheConfig {
            compression_level: 10,
            ..Default::default()
        };
        assert_eq!(field_of(config.validate().unwrap_err()), "cache.compression_level");
    }

    #[test]
    fn test_remove_retry_validation() {
        let config = RemoveRetryConfig {
            backoff_multiplier: 0.5,
            ..Default::default()
        };
        assert_eq!(
            field_of(config.validate().unwrap_err()),
            "cache.remove_retry.backoff_multiplier"
        );

        let config = RemoveRetryConfig {
            base_delay_ms: 100,
            max_delay_ms: 10,
            ..Default::default()
        };
        assert_eq!(
            field_of(config.validate().unwrap_err()),
            "cache.remove_retry.max_delay_ms"
        );
    }

    #[test]
    fn test_redis_settings_only_checked_for_redis_backend() {
        let redis = RedisCacheConfig {
            url: "http://localhost".to_string(),
            ..Default::default()
        };

        let config = CacheConfig {
            backend: CacheBackend::Memory,
            redis: redis.clone(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = CacheConfig {
            backend: CacheBackend::Redis,
            redis,
            ..Default::default()
        };
        assert_eq!(field_of(config.validate().unwrap_err()), "cache.redis.url");
    }

    #[test]
    fn test_redis_settings_rules() {
        for url in ["redis://localhost:6379", "rediss://host:6380/2", "unix:///tmp/redis.sock"] {
            let config = RedisCacheConfig {
                url: url.to_string(),
                ..Default::default()
            };
            assert!(config.validate().is_ok(), "{} should be valid", url);
        }

        let config = RedisCacheConfig {
            pool_size: 0,
            ..Default::default()
        };
        assert_eq!(field_of(config.validate().unwrap_err()), "cache.redis.pool_size");

        let config = RedisCacheConfig {
            connection_timeout: 0,
            ..Default::default()
        };
        assert_eq!(
            field_of(config.validate().unwrap_err()),
            "cache.redis.connection_timeout"
        );
    }

    // ========================================================================
    // Settings validation tests
    // ========================================================================

    #[test]
    fn test_settings_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_settings_invalid_cache() {
        let settings = Settings {
            cache: CacheConfig {
                compression_level: 42,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
