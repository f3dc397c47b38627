use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

/// Environment variable selecting the output format (`json` or `pretty`).
pub const LOG_FORMAT_ENV: &str = "KEEL_LOG_FORMAT";

/// Environment variable holding the `EnvFilter` directives.
pub const LOG_FILTER_ENV: &str = "RUST_LOG";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown log format '{0}' (expected 'json' or 'pretty')")]
    UnknownFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(ConfigError::UnknownFormat(other.to_string())),
        }
    }
}

/// Logging configuration.
///
/// Defaults to JSON at `info` without targets, matching production deployments.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directives, e.g. `info,keel_infra=debug`.
    pub filter: String,
    pub format: LogFormat,
    pub with_target: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Json,
            with_target: false,
        }
    }
}

impl ObservabilityConfig {
    /// Read `RUST_LOG` and `KEEL_LOG_FORMAT`; unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(filter) = lookup(LOG_FILTER_ENV).filter(|f| !f.trim().is_empty()) {
            config.filter = filter;
        }
        if let Some(format) = lookup(LOG_FORMAT_ENV) {
            config.format = format.parse()?;
        }
        Ok(config)
    }
}
