//! # keeper-api — Axum HTTP Service for the Keeper Media Proxy
//!
//! Authenticated callers obtain short-lived signed upload URLs; anyone can
//! stream stored media back.
//!
//! ## API Surface
//!
//! | Method | Path | Module | Auth |
//! |--------|------|--------|------|
//! | GET | `/health` | [`routes::health`] | none |
//! | GET | `/metrics` | this module | none |
//! | GET | `/openapi.json` | [`openapi`] | none |
//! | POST | `/api/uploads/presigned-url` | [`routes::uploads`] | bearer gate |
//! | GET | `/media/*object` | [`routes::media`] | none |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! SetRequestId → TraceLayer → PropagateRequestId → Metrics → CORS
//!     → CatchPanic → Timeout → [AuthMiddleware, uploads only] → Handler
//! ```
//!
//! Unknown paths answer 404 and known paths with the wrong method answer
//! 405, both with the usual `{"error": ...}` body.

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use std::any::Any;

use axum::error_handling::HandleErrorLayer;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{BoxError, Extension, Router};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Only the upload route sits behind the auth gate; health, metrics, the
/// OpenAPI document and media streaming are public.
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    // route_layer: the gate runs only when a route matched, so unknown
    // paths never reach token verification.
    let uploads = routes::uploads::router().route_layer(from_fn_with_state(
        state.clone(),
        auth::auth_middleware,
    ));

    let mut router = Router::new()
        .merge(routes::health::router())
        .merge(openapi::router())
        .merge(routes::media::router())
        .merge(uploads);

    if config.metrics_enabled {
        router = router.route("/metrics", get(prometheus_metrics));
    }

    let mut router = router
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state.clone())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(tower::timeout::TimeoutLayer::new(config.request_timeout)),
        )
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(build_cors(&config));

    if config.metrics_enabled {
        router = router
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(state.metrics.clone()));
    }

    router
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(middleware::tracing_layer::layer())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// CORS for the single configured front-end origin, with credentials.
///
/// Request headers are mirrored; a wildcard is not allowed together with
/// credentials.
pub fn build_cors(config: &AppConfig) -> CorsLayer {
    let origin = match HeaderValue::from_str(&config.front_end_url) {
        Ok(origin) => Some(origin),
        Err(e) => {
            // from_env already rejects this; a hand-built config may not.
            tracing::error!(origin = %config.front_end_url, error = %e, "invalid CORS origin, allowing none");
            None
        }
    };
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origin))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// GET /metrics — Prometheus text exposition.
async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    match state.metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => AppError::Internal(e).into_response(),
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

async fn handle_timeout_error(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!("request timed out");
        AppError::Timeout
    } else {
        AppError::Internal(format!("unhandled middleware error: {err}"))
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    };
    AppError::Internal(format!("handler panicked: {detail}")).into_response()
}
