//! Wiring between configuration, telemetry and the builder.

use meridian_config::MeridianConfig;
use meridian_middleware::{keys, AppBuilder};
use meridian_telemetry::{LogConfig, MetricsConfig, TelemetryConfig, TelemetryResult};

/// Creates a builder whose property bag is seeded from `config`.
///
/// Seeds `host.AppName`, `host.Environment` and one
/// `host.Properties.<name>` entry per pipeline property, in file order.
///
/// # Example
///
/// ```
/// use meridian::{bootstrap, keys};
/// use meridian_config::MeridianConfig;
///
/// let mut config = MeridianConfig::default();
/// config.host.app_name = "orders".to_string();
///
/// let builder = bootstrap(&config);
/// assert_eq!(
///     builder.properties().get_as::<String>(keys::APP_NAME).as_deref(),
///     Some("orders")
/// );
/// ```
pub fn bootstrap(config: &MeridianConfig) -> AppBuilder {
    let builder = AppBuilder::new();
    let properties = builder.properties();

    properties.insert(keys::APP_NAME, config.host.app_name.clone());
    properties.insert(keys::ENVIRONMENT, config.host.environment.clone());
    for (name, value) in &config.pipeline.properties {
        properties.insert(
            format!("{}{name}", keys::HOST_PROPERTIES_PREFIX),
            value.clone(),
        );
    }

    tracing::debug!(
        app = %config.host.app_name,
        environment = %config.host.environment,
        properties = config.pipeline.properties.len(),
        "builder bootstrapped"
    );

    builder
}

/// Maps the telemetry sections of `config`.
pub fn telemetry_config(config: &MeridianConfig) -> TelemetryConfig {
    TelemetryConfig {
        logging: LogConfig {
            enabled: config.logging.enabled,
            level: config.logging.level.clone(),
            format: config.logging.format,
            file_line_info: config.logging.include_location,
            ..LogConfig::default()
        },
        metrics: MetricsConfig {
            enabled: config.metrics.enabled,
        },
    }
}

/// Installs logging and the metrics recorder described by `config`.
///
/// # Errors
///
/// Returns `TelemetryError` if a subscriber or recorder is already installed
/// or the log filter is invalid.
pub fn init_telemetry(config: &MeridianConfig) -> TelemetryResult<()> {
    meridian_telemetry::init_telemetry(&telemetry_config(config))
}
