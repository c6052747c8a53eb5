//! Tracing subscriber and Prometheus exporter setup

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use talentforge_common::{
    config::ObservabilityConfig,
    errors::{AppError, Result},
    metrics::{register_metrics, LATENCY_BUCKETS},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

/// Serve Prometheus metrics on their own port; port 0 disables the exporter
pub fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    if config.metrics_port == 0 {
        info!("Metrics exporter disabled");
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(LATENCY_BUCKETS)
        .and_then(|builder| builder.install())
        .map_err(|e| AppError::Configuration {
            message: format!("Failed to start metrics exporter: {}", e),
        })?;

    register_metrics();
    info!(%addr, service = %config.service_name, "Metrics exporter listening");
    Ok(())
}
