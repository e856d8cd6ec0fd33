//! Typed settings loaded from TOML layers and `FUSION_*` overrides.
//!
//! Every section is `#[serde(default)]`, so a configuration file only needs
//! the keys it changes.

use serde::{Deserialize, Serialize};

use crate::cache::StaleSlotPolicy;
use crate::config::error::ConfigError;
use crate::logger::{ConsoleOutput, FileOutput, LogFormat, LoggerConfig, parse_level};

/// `[application]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    pub name: String,
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "fusion-cache".to_string(),
            version: crate::pkg_version().to_string(),
        }
    }
}

/// `[logger.console]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    pub enabled: bool,
    /// Colors are still dropped when stderr is not a terminal
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            colored: true,
        }
    }
}

impl ConsoleSettings {
    pub fn into_console_output(self) -> Option<ConsoleOutput> {
        self.enabled.then(|| ConsoleOutput::detect(self.colored))
    }
}

/// `[logger.file]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub enabled: bool,
    pub path: String,
    /// Truncate the file on startup when false
    pub append: bool,
    /// One of `full`, `compact`, `json`
    pub format: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "logs/fusion-cache.log".to_string(),
            append: true,
            format: LogFormat::Json.as_str().to_string(),
        }
    }
}

impl FileSettings {
    /// `None` when file output is off; the format is checked either way.
    pub fn into_file_output(self) -> Result<Option<FileOutput>, ConfigError> {
        let format = self
            .format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: e.to_string(),
            })?;

        if !self.enabled {
            return Ok(None);
        }

        FileOutput::new(self.path.trim(), self.append, format)
            .map(Some)
            .map_err(|e| ConfigError::ValidationError {
                field: "logger.file.path".to_string(),
                message: e.to_string(),
            })
    }
}

/// `[logger]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerSettings {
    /// One of `trace`, `debug`, `info`, `warn`, `error`
    pub level: String,
    pub console: ConsoleSettings,
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Resolve into the configuration `init_logger` takes.
    ///
    /// This is also the validation of the `[logger]` section.
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let level = parse_level(&self.level).map_err(|e| ConfigError::ValidationError {
            field: "logger.level".to_string(),
            message: e.to_string(),
        })?;
        let console = self.console.into_console_output();
        let file = self.file.into_file_output()?;

        LoggerConfig::new(level, console, file).map_err(|e| ConfigError::ValidationError {
            field: "logger".to_string(),
            message: e.to_string(),
        })
    }
}

/// Store behind the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// In-process keyspace, lost on exit
    #[default]
    Memory,
    Redis,
}

impl CacheBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheBackend::Memory => "memory",
            CacheBackend::Redis => "redis",
        }
    }
}

/// `[cache.remove_retry]`: backoff between optimistic removal attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoveRetryConfig {
    /// 0 retries until the removal commits
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RemoveRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            base_delay_ms: 1,
            backoff_multiplier: 2.0,
            max_delay_ms: 50,
        }
    }
}

/// `[cache.redis]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisCacheConfig {
    /// `redis://`, `rediss://` or a unix socket URL
    pub url: String,
    pub pool_size: u32,
    /// Seconds to wait for a pooled connection
    pub connection_timeout: u64,
    /// Upgrade a `redis://` URL to `rediss://`
    pub tls_enabled: bool,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 4,
            connection_timeout: 5,
            tls_enabled: false,
        }
    }
}

/// `[cache]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Disabled caches accept every call and store nothing
    pub enabled: bool,
    pub backend: CacheBackend,
    /// First segment of every key
    pub key_prefix: String,
    /// Second segment of every key, separates caches sharing one store
    pub cache_name: String,
    /// Seconds used when `set` gets no lifetime, 0 means unlimited
    pub default_lifetime: u64,
    /// zlib level for payloads, 0 stores them as-is
    pub compression_level: u32,
    pub stale_slots: StaleSlotPolicy,
    pub remove_retry: RemoveRetryConfig,
    pub redis: RedisCacheConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: CacheBackend::Memory,
            key_prefix: "fusion".to_string(),
            cache_name: "default".to_string(),
            default_lifetime: 3600,
            compression_level: 0,
            stale_slots: StaleSlotPolicy::Skip,
            remove_retry: RemoveRetryConfig::default(),
            redis: RedisCacheConfig::default(),
        }
    }
}

/// Root of the configuration tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub application: ApplicationConfig,
    pub logger: LoggerSettings,
    pub cache: CacheConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ========================================================================
    // Arbitrary implementations for property-based testing
    // ========================================================================

    fn arb_application_config() -> impl Strategy<Value = ApplicationConfig> {
        (
            "[a-z][a-z0-9-]{0,20}",
            "[0-9]{1,2}\\.[0-9]{1,2}\\.[0-9]{1,2}",
        )
            .prop_map(|(name, version)| ApplicationConfig { name, version })
    }

    fn arb_logger_settings() -> impl Strategy<Value = LoggerSettings> {
        (
            prop_oneof![
                Just("trace".to_string()),
                Just("debug".to_string()),
                Just("info".to_string()),
                Just("warn".to_string()),
                Just("error".to_string()),
            ],
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
            "logs/[a-z]{1,10}\\.log",
            prop_oneof![
                Just("full".to_string()),
                Just("compact".to_string()),
                Just("json".to_string()),
            ],
        )
            .prop_map(
                |(level, console_enabled, colored, file_enabled, path, format)| LoggerSettings {
                    level,
                    console: ConsoleSettings {
                        enabled: console_enabled,
                        colored,
                    },
                    file: FileSettings {
                        enabled: file_enabled,
                        path,
                        append: true,
                        format,
                    },
                },
            )
    }

    fn arb_remove_retry() -> impl Strategy<Value = RemoveRetryConfig> {
        (0u32..=500u32, 1u64..=20u64, 1.0f64..=3.0f64, 20u64..=500u64).prop_map(
            |(max_attempts, base_delay_ms, backoff_multiplier, max_delay_ms)| RemoveRetryConfig {
                max_attempts,
                base_delay_ms,
                backoff_multiplier,
                max_delay_ms,
            },
        )
    }

    fn arb_redis_config() -> impl Strategy<Value = RedisCacheConfig> {
        (
            "redis://[a-z]{1,10}:[0-9]{4}",
            1u32..=32u32,
            1u64..=60u64,
            any::<bool>(),
        )
            .prop_map(|(url, pool_size, connection_timeout, tls_enabled)| RedisCacheConfig {
                url,
                pool_size,
                connection_timeout,
                tls_enabled,
            })
    }

    fn arb_cache_config() -> impl Strategy<Value = CacheConfig> {
        (
            any::<bool>(),
            prop_oneof![Just(CacheBackend::Memory), Just(CacheBackend::Redis)],
            "[a-z]{1,10}",
            "[a-z0-9_]{1,20}",
            0u64..=86_400u64,
            0u32..=9u32,
            prop_oneof![Just(StaleSlotPolicy::Skip), Just(StaleSlotPolicy::Stop)],
            arb_remove_retry(),
            arb_redis_config(),
        )
            .prop_map(
                |(
                    enabled,
                    backend,
                    key_prefix,
                    cache_name,
                    default_lifetime,
                    compression_level,
                    stale_slots,
                    remove_retry,
                    redis,
                )| CacheConfig {
                    enabled,
                    backend,
                    key_prefix,
                    cache_name,
                    default_lifetime,
                    compression_level,
                    stale_slots,
                    remove_retry,
                    redis,
                },
            )
    }

    fn arb_settings() -> impl Strategy<Value = Settings> {
        (
            arb_application_config(),
            arb_logger_settings(),
            arb_cache_config(),
        )
            .prop_map(|(application, logger, cache)| Settings {
                application,
                logger,
                cache,
            })
    }

    // ========================================================================
    // Property-based tests
    // ========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Serializing any Settings to TOML and reading it back yields the same value.
        #[test]
        fn prop_settings_round_trip_serialization(settings in arb_settings()) {
            let toml_str = toml::to_string(&settings)
                .expect("Settings should serialize to TOML");

            let deserialized: Settings = toml::from_str(&toml_str)
                .expect("TOML should deserialize back to Settings");

            prop_assert_eq!(settings, deserialized);
        }
    }

    // ========================================================================
    // Unit tests
    // ========================================================================

    #[test]
    fn test_application_config_defaults() {
        let config = ApplicationConfig::default();
        assert_eq!(config.name, "fusion-cache");
        assert_eq!(config.version, crate::pkg_version());
    }

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.backend, CacheBackend::Memory);
        assert_eq!(config.key_prefix, "fusion");
        assert_eq!(config.cache_name, "default");
        assert_eq!(config.default_lifetime, 3600);
        assert_eq!(config.compression_level, 0);
        assert_eq!(config.stale_slots, StaleSlotPolicy::Skip);
        assert_eq!(config.redis.url, "redis://127.0.0.1:6379");
        assert_eq!(config.redis.pool_size, 4);
    }

    #[test]
    fn test_remove_retry_defaults() {
        let config = RemoveRetryConfig::default();
        assert_eq!(config.max_attempts, 100);
        assert_eq!(config.base_delay_ms, 1);
        assert_eq!(config.backoff_multiplier, 2.0);
        assert_eq!(config.max_delay_ms, 50);
    }

    #[test]
    fn test_partial_cache_section_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [cache]
            enabled = true
            backend = "redis"
            stale_slots = "stop"

            [cache.redis]
            url = "redis://cache:6379"
            "#,
        )
        .unwrap();

        assert!(settings.cache.enabled);
        assert_eq!(settings.cache.backend, CacheBackend::Redis);
        assert_eq!(settings.cache.stale_slots, StaleSlotPolicy::Stop);
        assert_eq!(settings.cache.redis.url, "redis://cache:6379");
        assert_eq!(settings.cache.redis.pool_size, 4);
        assert_eq!(settings.cache.remove_retry, RemoveRetryConfig::default());
        assert_eq!(settings.logger, LoggerSettings::default());
    }

    #[test]
    fn test_console_settings_defaults() {
        let settings = ConsoleSettings::default();
        assert!(settings.enabled);
        assert!(settings.colored);
    }

    #[test]
    fn test_file_settings_defaults() {
        let settings = FileSettings::default();
        assert!(!settings.enabled);
        assert_eq!(settings.path, "logs/fusion-cache.log");
        assert!(settings.append);
        assert_eq!(settings.format, "json");
    }

    #[test]
    fn test_into_logger_config() {
        let settings = LoggerSettings {
            level: "debug".to_string(),
            console: ConsoleSettings {
                enabled: true,
                colored: false,
            },
            file: FileSettings {
                format: "compact".to_string(),
                ..Default::default()
            },
        };

        let config = settings.into_logger_config().unwrap();
        assert_eq!(config.level, tracing::Level::DEBUG);
        assert_eq!(config.console, Some(ConsoleOutput { ansi: false }));
        assert!(config.file.is_none());
    }

    #[test]
    fn test_into_logger_config_with_file_output() {
        let settings = LoggerSettings {
            file: FileSettings {
                enabled: true,
                path: "logs/cli.log".to_string(),
                append: false,
                format: "json".to_string(),
            },
            ..Default::default()
        };

        let file = settings.into_logger_config().unwrap().file.unwrap();
        assert_eq!(file.path, std::path::PathBuf::from("logs/cli.log"));
        assert!(!file.append);
        assert_eq!(file.format, LogFormat::Json);
    }

    #[test]
    fn test_into_logger_config_rejects_unknown_format() {
        let settings = LoggerSettings {
            file: FileSettings {
                format: "xml".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        let err = settings.into_logger_config().unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { field, .. } if field == "logger.file.format")
        );
    }

    #[test]
    fn test_backend_as_str() {
        assert_eq!(CacheBackend::Memory.as_str(), "memory");
        assert_eq!(CacheBackend::Redis.as_str(), "redis");
    }
}
