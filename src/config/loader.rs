//! Layered configuration loading.
//!
//! File layers are resolved into an explicit plan first, then fed to the
//! `config` crate together with `FUSION_*` environment overrides.

use std::path::PathBuf;

use config::{Config, File, FileFormat};

use crate::config::environment::Environment;
use crate::config::error::ConfigError;
use crate::config::settings::Settings;

const CONFIG_DIR_VAR: &str = "FUSION_CONFIG_DIR";
const CONFIG_FILE_VAR: &str = "FUSION_CONFIG_FILE";
const DEFAULT_CONFIG_DIR: &str = "config";

/// `FUSION_CACHE__REDIS__URL` sets `cache.redis.url`.
const OVERRIDE_PREFIX: &str = "FUSION";
const OVERRIDE_SEPARATOR: &str = "__";

/// Where file-based settings come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `default.toml`, then `{environment}.toml`, then `local.toml` from one directory.
    Layered(PathBuf),
    /// One file standing in for every layer.
    SingleFile(PathBuf),
}

/// One file of the loading plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub path: PathBuf,
    pub required: bool,
}

impl Layer {
    fn required(path: PathBuf) -> Self {
        Self {
            path,
            required: true,
        }
    }

    fn optional(path: PathBuf) -> Self {
        Self {
            path,
            required: false,
        }
    }
}

impl ConfigSource {
    /// Resolve from `FUSION_CONFIG_DIR` and `FUSION_CONFIG_FILE`, which exclude each other.
    pub fn from_env() -> Result<Self, ConfigError> {
        match (
            std::env::var_os(CONFIG_DIR_VAR),
            std::env::var_os(CONFIG_FILE_VAR),
        ) {
            (Some(_), Some(_)) => Err(ConfigError::mutual_exclusivity(format!(
                "{} and {} cannot both be set; pick a directory of layers or a single file",
                CONFIG_DIR_VAR, CONFIG_FILE_VAR
            ))),
            (None, Some(file)) => Ok(Self::SingleFile(file.into())),
            (Some(dir), None) => Ok(Self::Layered(dir.into())),
            (None, None) => Ok(Self::Layered(PathBuf::from(DEFAULT_CONFIG_DIR))),
        }
    }

    /// Files to read, lowest priority first.
    pub fn layers(&self, environment: Environment) -> Vec<Layer> {
        match self {
            Self::SingleFile(path) => vec![Layer::required(path.clone())],
            Self::Layered(dir) => vec![
                Layer::required(dir.join("default.toml")),
                Layer::optional(dir.join(environment.layer_file())),
                Layer::optional(dir.join("local.toml")),
            ],
        }
    }
}

/// Loads and validates [`Settings`].
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    source: ConfigSource,
    environment: Environment,
}

impl ConfigLoader {
    /// Build a loader from `FUSION_CONFIG_DIR`, `FUSION_CONFIG_FILE` and `FUSION_APP_ENV`.
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self::with_source(
            ConfigSource::from_env()?,
            Environment::detect()?,
        ))
    }

    pub fn with_source(source: ConfigSource, environment: Environment) -> Self {
        Self {
            source,
            environment,
        }
    }

    /// Read a single file instead of the layered directory.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = ConfigSource::SingleFile(path.into());
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    /// Read every layer, apply environment overrides, then validate.
    ///
    /// # Errors
    ///
    /// `FileNotFound` for a missing required layer, `ParseError` when the
    /// merged values do not fit [`Settings`], or the first validation failure.
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let mut builder = Config::builder();

        for layer in self.source.layers(self.environment) {
            if layer.required && !layer.path.is_file() {
                return Err(ConfigError::file_not_found(format!(
                    "Required configuration file not found: {}",
                    layer.path.display()
                )));
            }
            tracing::debug!(path = %layer.path.display(), required = layer.required, "Adding configuration layer");
            builder = builder.add_source(
                File::new(&layer.path.to_string_lossy(), FileFormat::Toml).required(layer.required),
            );
        }

        let settings: Settings = builder
            .add_source(
                config::Environment::with_prefix(OVERRIDE_PREFIX)
                    .prefix_separator("_")
                    .separator(OVERRIDE_SEPARATOR)
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }
}
