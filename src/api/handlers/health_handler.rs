//! Banner and health check.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::api::AppState;

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: &'static str,
    pub services: BTreeMap<&'static str, ServiceStatus>,
}

/// Individual dependency status
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceStatus {
    #[schema(example = "healthy")]
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Root endpoint
pub async fn root() -> &'static str {
    "Helpora API is running"
}

/// Database and Redis connectivity
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "All dependencies reachable", body = HealthResponse),
        (status = 503, description = "At least one dependency is down", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let mut services = BTreeMap::new();
    for probe in state.probes.iter() {
        let status = match probe.check().await {
            Ok(()) => ServiceStatus {
                status: "healthy",
                error: None,
            },
            Err(e) => {
                tracing::warn!(dependency = probe.name(), error = %e, "Health probe failed");
                ServiceStatus {
                    status: "unhealthy",
                    error: Some(e),
                }
            }
        };
        services.insert(probe.name(), status);
    }

    let all_healthy = services.values().all(|s| s.error.is_none());

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" },
        services,
    };

    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
