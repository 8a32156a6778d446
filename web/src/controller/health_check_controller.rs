use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// GET /health
///
/// Liveness probe for deploy tooling; no authentication required.
pub(crate) async fn read() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
