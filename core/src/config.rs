//! [`PortalConfig`]-related definitions.

use std::path::PathBuf;
use std::time::Duration;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use serde::Deserialize;
use smart_default::SmartDefault;

use crate::error::ApiError;
use crate::schedule::Weekday;

/// Client configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct PortalConfig {
    /// Base URL of the portal backend.
    #[default("http://127.0.0.1:8000".to_owned())]
    pub api_url: String,

    /// Upper bound for a whole request, connect to last body byte.
    #[default(Duration::from_secs(15))]
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// First column of the weekly schedule.
    #[default(Weekday::Saturday)]
    pub first_day_of_week: Weekday,

    /// Where the session is persisted. Front-ends pick a default when unset.
    pub token_file: Option<PathBuf>,

    /// Log configuration.
    pub log: Log,
}

impl PortalConfig {
    /// Creates a new [`PortalConfig`] by:
    /// - loading it from the provided `path` (if the file exists);
    /// - merging it with `PORTAL_*` environment variables (nested keys use
    ///   `__`, e.g. `PORTAL_LOG__LEVEL`);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn load(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("PORTAL")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    /// Checks values the deserializer cannot.
    pub fn validate(&self) -> Result<(), ApiError> {
        let url = self.api_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ApiError::InvalidArgument(format!(
                "api_url must be an absolute http(s) URL, got `{}`",
                self.api_url
            )));
        }
        if self.timeout.is_zero() {
            return Err(ApiError::InvalidArgument("timeout must be positive".to_string()));
        }
        Ok(())
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}
