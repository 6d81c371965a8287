//! Login, gate and session counters.
//!
//! Every recorder is callable in every build. Without the `prometheus`
//! feature nothing is installed and the counters go nowhere.

#[cfg(feature = "prometheus")]
use std::sync::OnceLock;

#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::MetricsConfig;

#[cfg(feature = "prometheus")]
static EXPORTER: OnceLock<PrometheusHandle> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to install Prometheus recorder: {0}")]
    Install(String),

    #[error("Metrics recorder is already installed")]
    AlreadyInstalled,
}

pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Ok(());
    }

    #[cfg(feature = "prometheus")]
    {
        if EXPORTER.get().is_some() {
            return Err(MetricsError::AlreadyInstalled);
        }
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| MetricsError::Install(e.to_string()))?;
        EXPORTER
            .set(handle)
            .map_err(|_| MetricsError::AlreadyInstalled)?;
        tracing::debug!("Prometheus recorder installed");
    }

    #[cfg(not(feature = "prometheus"))]
    tracing::debug!("metrics.enabled is set but this build has no `prometheus` feature");

    Ok(())
}

/// Prometheus text exposition, or `None` when no recorder is installed.
pub fn render() -> Option<String> {
    #[cfg(feature = "prometheus")]
    {
        EXPORTER.get().map(PrometheusHandle::render)
    }
    #[cfg(not(feature = "prometheus"))]
    {
        None
    }
}

fn increment(name: &'static str, labels: &[(&'static str, &str)]) {
    #[cfg(feature = "prometheus")]
    {
        let labels: Vec<metrics::Label> = labels
            .iter()
            .map(|(key, value)| metrics::Label::new(*key, value.to_string()))
            .collect();
        metrics::counter!(name, labels).increment(1);
    }

    #[cfg(not(feature = "prometheus"))]
    let _ = (name, labels);
}

/// One SAML login attempt against `idp`.
///
/// `outcome` is one of `success`, `bad_assertion`, `invalid_response` or
/// `store_error`.
pub fn record_login(idp: &str, outcome: &str) {
    increment(
        "readgate_logins_total",
        &[("idp", idp), ("outcome", outcome)],
    );
}

pub fn record_gate_decision(decision: &str) {
    increment("readgate_gate_decisions_total", &[("decision", decision)]);
}

/// `operation` is `load`, `save` or `delete`; `result` is `hit`, `miss`,
/// `ok` or `error`.
pub fn record_session_operation(operation: &str, result: &str) {
    increment(
        "readgate_session_store_operations_total",
        &[("operation", operation), ("result", result)],
    );
}
