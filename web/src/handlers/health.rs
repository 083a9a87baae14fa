//! Health, readiness and metrics endpoints.
//!
//! Used by load balancers and monitoring systems.

use crate::error::AppError;
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

/// Liveness and readiness body.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthBody {
    /// `ok` or `ready`.
    pub status: String,
    /// Crate version.
    pub version: String,
}

/// Liveness probe. Does NOT check dependencies.
///
/// ```text
/// GET /health  ->  200 {"status": "ok", "version": "0.1.0"}
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness probe: 200 once the store answers, 503 otherwise.
///
/// # Errors
///
/// 503 with the probe's reason logged.
pub async fn readiness(State(state): State<AppState>) -> Result<Json<HealthBody>, AppError> {
    if let Err(reason) = state.readiness.check().await {
        tracing::warn!(%reason, "Readiness check failed");
        return Err(AppError::unavailable(format!("Store unavailable: {reason}")));
    }
    Ok(Json(HealthBody {
        status: "ready".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// Prometheus text exposition. 404 when no recorder is installed.
#[allow(clippy::unused_async)]
pub async fn metrics(State(state): State<AppState>) -> (StatusCode, String) {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_health_check() {
        let Json(body) = health_check().await;
        assert_eq!(body.status, "ok");
        assert!(!body.version.is_empty());
    }
}
