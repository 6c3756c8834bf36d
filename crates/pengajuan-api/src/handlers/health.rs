//! Liveness check.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Process is up. Never calls the external services.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}
