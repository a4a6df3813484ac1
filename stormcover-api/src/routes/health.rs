use axum::Json;

use stormcover_shared::types::HealthResponse;

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy(
        "stormcover-api",
        env!("CARGO_PKG_VERSION"),
    ))
}
