//! Build metrics as seen through the Prometheus recorder.
//!
//! Kept in its own test binary: the recorder is process-global.

use meridian_middleware::{AppBuilder, DynApp};
use meridian_telemetry::{init_metrics, render_metrics, MetricsConfig};

#[test]
fn test_build_metrics_use_bounded_target_labels() {
    init_metrics(&MetricsConfig::default()).unwrap();

    let builder = AppBuilder::new();
    builder.build_app().unwrap();
    builder.build::<DynApp>().unwrap();

    let rendered = render_metrics().unwrap();
    assert!(rendered.contains(r#"meridian_pipeline_builds_total{target="callable"} 1"#));
    assert!(rendered.contains(r#"meridian_pipeline_builds_total{target="object"} 1"#));
    assert!(!rendered.contains("alloc::"));
    assert!(!rendered.contains("core::ops"));
}
