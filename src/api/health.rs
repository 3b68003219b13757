//! Health check endpoints for Kubernetes probes

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tracing::error;

use super::service::ChainService;

/// Health response listing the handlers mounted in the served chain
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<ChainSummary>,
}

/// Health check status
#[derive(Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Serialize)]
pub struct ChainSummary {
    pub key: String,
    pub handlers: Vec<String>,
}

/// Health check with the chain topology.
///
/// Listing handler names waits for any running traversal of the shared
/// instance, so it runs on the blocking pool.
pub async fn health_check(State(service): State<ChainService>) -> impl IntoResponse {
    let chain = service.chain().clone();
    let summary = tokio::task::spawn_blocking(move || ChainSummary {
        key: chain.key().to_string(),
        handlers: chain.names(),
    })
    .await;

    let (status_code, status, chain) = match summary {
        Ok(summary) => (StatusCode::OK, HealthStatus::Healthy, Some(summary)),
        Err(err) => {
            error!(error = %err, "Failed to inspect chain");
            (StatusCode::SERVICE_UNAVAILABLE, HealthStatus::Unhealthy, None)
        }
    };

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        chain,
    };

    (status_code, Json(response))
}

/// Liveness check - simple check to verify the service is running
pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}
