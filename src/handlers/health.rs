// =============================================================================
// HEALTH CHECK & METRICS ENDPOINTS
// =============================================================================

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::models::{HealthResponse, ReadinessChecks, ReadinessResponse};
use crate::AppState;

/// Liveness check.
///
/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check: 503 unless both PostgreSQL and Redis answer.
///
/// GET /ready
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let database = state.db.health_check().await;
    let redis = state.cache.ping().await;

    let ready = database && redis;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            status: if ready { "ready" } else { "not_ready" }.to_string(),
            checks: ReadinessChecks { database, redis },
        }),
    )
}

/// Prometheus text exposition.
///
/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_names_the_package() {
        let Json(body) = health_check().await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.service, "gudang-ledger");
    }
}
