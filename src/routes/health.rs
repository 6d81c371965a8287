//! Health and metrics endpoints. Never gated.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{AppState, observability::metrics};

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// "healthy" or "unhealthy"
    pub status: &'static str,
    pub version: &'static str,
    /// Registered identity providers.
    pub idps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<ComponentStatus>,
}

#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub backend: &'static str,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub latency_ms: u64,
}

#[tracing::instrument(name = "health.check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.db {
        Some(db) => {
            let start = std::time::Instant::now();
            let result = db.ping().await;
            Some(ComponentStatus {
                backend: db.backend_name(),
                healthy: result.is_ok(),
                message: result.err().map(|e| e.to_string()),
                latency_ms: start.elapsed().as_millis() as u64,
            })
        }
        None => None,
    };

    let healthy = database.as_ref().is_none_or(|d| d.healthy);
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthStatus {
            status: if healthy { "healthy" } else { "unhealthy" },
            version: env!("CARGO_PKG_VERSION"),
            idps: state.registry.len(),
            database,
        }),
    )
}

/// Prometheus text exposition. 404 when metrics are disabled.
pub async fn metrics_handler() -> Response {
    match metrics::render() {
        Some(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
