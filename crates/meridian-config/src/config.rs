//! Main configuration type.

use meridian_telemetry::logging::create_env_filter;
use meridian_telemetry::LogFormat;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, HostConfig, LoggingConfig, MetricsConfig, PipelineConfig};

/// Complete Meridian host configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use meridian_config::MeridianConfig;
///
/// let config = MeridianConfig::default();
/// assert_eq!(config.host.app_name, "meridian-app");
/// assert!(config.pipeline.properties.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct MeridianConfig {
    /// Host identity.
    #[serde(default)]
    pub host: HostConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Pipeline properties.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl MeridianConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `host.app_name` is empty
    /// - `logging.level` is not a valid filter directive
    /// - a pipeline property name is empty or contains whitespace or `.`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.app_name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "host.app_name",
                "must not be empty",
            ));
        }

        if self.logging.enabled {
            create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }

        for name in self.pipeline.properties.keys() {
            if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c == '.') {
                return Err(ConfigError::invalid_value(
                    "pipeline.properties",
                    format!("invalid property name `{name}`"),
                ));
            }
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// # Example
    ///
    /// ```
    /// use meridian_config::MeridianConfig;
    ///
    /// let config = MeridianConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.host.environment = "development".to_string();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.include_location = true;
        config
    }

    /// Create a production configuration preset.
    ///
    /// # Example
    ///
    /// ```
    /// use meridian_config::{LogFormat, MeridianConfig};
    ///
    /// let config = MeridianConfig::production();
    /// assert_eq!(config.logging.format, LogFormat::Json);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.host.environment = "production".to_string();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config
    }
}
