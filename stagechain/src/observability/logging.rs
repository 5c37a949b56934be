//! `tracing-subscriber` setup for applications embedding stagechain.
//!
//! The library itself only emits `tracing` events: declarations and stage
//! steps at `debug`, interruptions at `warn`. Installing a subscriber is left
//! to the application; [`init_logging`] is a convenience for doing so.

use crate::errors::StagechainError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive, e.g. `"stagechain=debug"`.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter directive.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Parses the filter directive.
    ///
    /// # Errors
    ///
    /// Returns [`StagechainError::Logging`] for an invalid directive.
    pub fn env_filter(&self) -> Result<EnvFilter, StagechainError> {
        EnvFilter::try_new(&self.filter).map_err(|e| StagechainError::Logging(e.to_string()))
    }
}

/// Installs a global `tracing` subscriber.
///
/// # Errors
///
/// Returns [`StagechainError::Logging`] if the filter is invalid or a global
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), StagechainError> {
    let filter = config.env_filter()?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match config.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| StagechainError::Logging(e.to_string()))
}
