//! Health and metrics endpoints.

use crate::middleware::MetricsSnapshot;
use crate::router::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;
use tracing::error;

/// Health check endpoint. Pings the datastore.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let leads = Arc::clone(&state.leads);
    let ping = tokio::task::spawn_blocking(move || leads.health_check()).await;

    let failure = match ping {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(e) => Some(e.to_string()),
    };

    match failure {
        None => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "datastore": "ok",
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Some(detail) => {
            error!(error = %detail, "Datastore health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unhealthy",
                    "datastore": "unavailable",
                    "version": env!("CARGO_PKG_VERSION")
                })),
            )
        }
    }
}

pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
