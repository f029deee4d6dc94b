//! Prometheus metrics.

use crate::config::MetricsSettings;
use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Default exporter port.
pub const DEFAULT_METRICS_PORT: u16 = 9090;

/// Metrics configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,
    /// Address to bind the metrics exporter.
    pub listen_addr: SocketAddr,
}

impl MetricsConfig {
    /// Builds metrics configuration from config settings.
    ///
    /// Environment overrides are already folded into the settings by
    /// [`crate::StencilConfig::apply_env_overrides`].
    #[must_use]
    pub fn from_settings(settings: &MetricsSettings) -> Self {
        let port = settings.port.unwrap_or(DEFAULT_METRICS_PORT);
        Self {
            enabled: settings.enabled.unwrap_or(false),
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
        }
    }
}

/// Installs the Prometheus recorder.
///
/// With `expose`, an HTTP listener serves `/metrics` on the configured
/// address; it must be called from inside a tokio runtime.
///
/// # Errors
///
/// Returns an error if a global recorder is already installed or the
/// listener cannot be bound.
pub fn install_prometheus(
    config: &MetricsConfig,
    expose: bool,
) -> Result<Option<PrometheusHandle>> {
    if !config.enabled {
        return Ok(None);
    }

    let builder = PrometheusBuilder::new();
    if expose {
        let (recorder, exporter) = builder
            .with_http_listener(config.listen_addr)
            .build()
            .map_err(|e| Error::OperationFailed {
                operation: "metrics_exporter_build".to_string(),
                cause: e.to_string(),
            })?;
        let handle = recorder.handle();
        metrics::set_global_recorder(recorder).map_err(|e| Error::OperationFailed {
            operation: "metrics_recorder_install".to_string(),
            cause: e.to_string(),
        })?;
        tokio::spawn(async move {
            if let Err(e) = exporter.await {
                tracing::warn!(error = ?e, "Metrics exporter stopped");
            }
        });
        tracing::info!(addr = %config.listen_addr, "Prometheus exporter listening");
        return Ok(Some(handle));
    }

    builder
        .install_recorder()
        .map(Some)
        .map_err(|e| Error::OperationFailed {
            operation: "metrics_recorder_install".to_string(),
            cause: e.to_string(),
        })
}
