//! Prometheus metrics for pipeline assembly.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `meridian_pipeline_builds_total` | Counter | `target` | Completed builds |
//! | `meridian_pipeline_build_duration_seconds` | Histogram | `target` | Time spent folding the stage list |
//! | `meridian_pipeline_stages` | Histogram | - | Stages folded per build |
//! | `meridian_stages_registered_total` | Counter | `shape` | Stages appended, by authoring shape |
//! | `meridian_conversions_total` | Counter | `hops` | Successful signature conversions |
//! | `meridian_conversion_failures_total` | Counter | - | Conversions that exhausted the search |
//!
//! Recording functions are cheap no-ops until a recorder is installed with
//! [`init_metrics`].

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Installs the Prometheus recorder.
///
/// The recorder only collects; expose [`render_metrics`] through whatever
/// endpoint the host provides.
///
/// # Errors
///
/// Returns `TelemetryError::MetricsInit` if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);

    register_metric_descriptions();

    Ok(())
}

/// Returns the global metrics handle if initialized.
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Renders metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(
        "meridian_pipeline_builds_total",
        "Total number of pipelines built"
    );
    describe_histogram!(
        "meridian_pipeline_build_duration_seconds",
        "Time spent folding a stage list into an entry point"
    );
    describe_histogram!("meridian_pipeline_stages", "Stages folded per build");
    describe_counter!(
        "meridian_stages_registered_total",
        "Total number of stages appended to builders"
    );
    describe_counter!(
        "meridian_conversions_total",
        "Total number of successful signature conversions"
    );
    describe_counter!(
        "meridian_conversion_failures_total",
        "Total number of conversions with no available path"
    );
}

/// Records a completed build.
///
/// # Arguments
///
/// * `target` - Kind of the requested convention (`callable` or `object`)
/// * `stages` - Number of stages folded
/// * `duration` - Time spent building
pub fn record_build(target: &'static str, stages: usize, duration: Duration) {
    counter!("meridian_pipeline_builds_total", "target" => target).increment(1);

    histogram!("meridian_pipeline_build_duration_seconds", "target" => target)
    .record(duration.as_secs_f64());

    histogram!("meridian_pipeline_stages").record(stages as f64);
}

/// Records a stage appended to a builder.
pub fn record_stage(shape: &'static str) {
    counter!("meridian_stages_registered_total", "shape" => shape).increment(1);
}

/// Records a successful conversion and the number of registry edges it used.
pub fn record_conversion(hops: u8) {
    counter!("meridian_conversions_total", "hops" => hops.to_string()).increment(1);
}

/// Records a conversion that exhausted its search.
pub fn record_conversion_failure() {
    counter!("meridian_conversion_failures_total").increment(1);
}
