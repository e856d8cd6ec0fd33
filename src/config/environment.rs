//! Deployment environment, selecting the `{name}.toml` configuration layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Staging,
    Production,
}

/// Accepted spellings, canonical name first for each environment.
const NAMES: &[(&str, Environment)] = &[
    ("development", Environment::Development),
    ("dev", Environment::Development),
    ("test", Environment::Test),
    ("staging", Environment::Staging),
    ("stage", Environment::Staging),
    ("production", Environment::Production),
    ("prod", Environment::Production),
];

impl Environment {
    /// Variable that selects the environment.
    pub const VARIABLE: &'static str = "FUSION_APP_ENV";

    /// Read `FUSION_APP_ENV`.
    ///
    /// An unset or empty variable means `Development`; anything unrecognized
    /// is an error so a typo never silently loads the wrong layer.
    pub fn detect() -> Result<Self, ConfigError> {
        match std::env::var(Self::VARIABLE) {
            Ok(value) if !value.trim().is_empty() => value.parse(),
            _ => Ok(Self::default()),
        }
    }

    pub fn name(&self) -> &'static str {
        NAMES
            .iter()
            .find(|(_, env)| env == self)
            .map(|(name, _)| *name)
            .unwrap_or("development")
    }

    /// File name of this environment's layer.
    pub fn layer_file(&self) -> String {
        format!("{}.toml", self.name())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(_, env)| *env)
            .ok_or_else(|| {
                ConfigError::EnvVarError(format!(
                    "{}='{}' is not one of development, test, staging, production",
                    Self::VARIABLE,
                    s
                ))
            })
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
