//! Typed configuration for Meridian hosts.
//!
//! This crate loads the settings a host needs around the pipeline engine:
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Overview
//!
//! [`MeridianConfig`] contains:
//!
//! - [`HostConfig`] - Application name and environment, seeded into the
//!   property bag
//! - [`LoggingConfig`] / [`MetricsConfig`] - Telemetry settings
//! - [`PipelineConfig`] - Free-form properties seeded into the property bag
//!
//! # Example
//!
//! ```no_run
//! use meridian_config::ConfigLoader;
//!
//! # fn main() -> Result<(), meridian_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()
//!     .with_optional_file("meridian.toml")?
//!     .with_env_prefix("MERIDIAN")
//!     .load()?;
//!
//! println!("starting {}", config.host.app_name);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [host]
//! app_name = "orders"
//! environment = "production"
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [metrics]
//! enabled = true
//!
//! [pipeline.properties]
//! region = "eu-1"
//! ```
//!
//! # Environment Variable Overrides
//!
//! - `MERIDIAN__HOST__APP_NAME=orders`
//! - `MERIDIAN__LOGGING__LEVEL=debug`
//! - `MERIDIAN__METRICS__ENABLED=false`
//! - `MERIDIAN__PIPELINE__PROPERTIES__REGION=eu-1`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::MeridianConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use meridian_telemetry::LogFormat;
pub use schema::{HostConfig, LoggingConfig, MetricsConfig, PipelineConfig};
