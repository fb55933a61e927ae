//! # Media Streaming
//!
//! `GET /media/<object>` copies the stored bytes straight through to the
//! client. Nothing is buffered beyond the store's own chunking, and a
//! client disconnect drops the stream, which stops the read.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures::TryStreamExt;

use crate::error::AppError;
use crate::state::AppState;

/// `Content-Type` for objects stored without one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Media is immutable once uploaded; let caches keep it for a day.
pub const CACHE_CONTROL: &str = "public, max-age=86400";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/media/", get(missing_object))
        .route("/media/*object", get(serve_media))
}

/// `/media/` names no object; the wildcard route needs at least one byte.
async fn missing_object() -> AppError {
    AppError::NotFound("File not found".to_string())
}

/// GET /media/{object} — Stream a stored object.
#[utoipa::path(
    get,
    path = "/media/{object}",
    params(("object" = String, Path, description = "Object name, may contain '/'")),
    responses(
        (status = 200, description = "Object bytes", content_type = "application/octet-stream"),
        (status = 404, description = "No such object", body = crate::error::ErrorBody),
    ),
    tag = "media"
)]
async fn serve_media(
    State(state): State<AppState>,
    Path(object): Path<String>,
) -> Result<Response, AppError> {
    let reader = state.store.open_read_stream(&object).await.map_err(|err| {
        tracing::warn!(object = %object, error = %err, "could not open object");
        AppError::NotFound("File not found".to_string())
    })?;

    let content_type = reader
        .content_type
        .as_deref()
        .filter(|ct| !ct.is_empty())
        .and_then(|ct| match HeaderValue::from_str(ct) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(object = %object, content_type = %ct, "stored content type is not a valid header value");
                None
            }
        })
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    let stream_object = object.clone();
    let body = Body::from_stream(reader.body.inspect_err(move |err| {
        tracing::error!(object = %stream_object, error = %err, "media stream failed mid-response");
    }));

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, CACHE_CONTROL);
    if let Some(len) = reader.content_length {
        builder = builder.header(header::CONTENT_LENGTH, len);
    }

    builder
        .body(body)
        .map_err(|e| AppError::Internal(format!("failed to build media response: {e}")))
}
