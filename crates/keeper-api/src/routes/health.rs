//! Liveness probe.

use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// GET /health — 200 `OK` while the process is serving.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String, content_type = "text/plain")),
    tag = "health"
)]
pub(crate) async fn health() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], "OK")
}
