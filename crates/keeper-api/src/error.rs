//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Every failure response body is exactly `{"error": "<message>"}`.
//!
//! Internal details are never returned: 5xx responses carry a fixed
//! message and the underlying cause goes to the log instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use keeper_auth::{AuthError, FailureClass};
use keeper_storage::StorageError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Message for every 500 response.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub error: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404). Carries the public message.
    #[error("{0}")]
    NotFound(String),

    /// Request body could not be parsed or failed validation (400).
    #[error("{0}")]
    BadRequest(String),

    /// Authentication failure (401). The public message comes from
    /// [`AuthError::public_message`]; the cause is logged.
    #[error("unauthorized: {0}")]
    Unauthorized(AuthError),

    /// Route exists but not for this method (405).
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// The request did not complete within the configured timeout (408).
    #[error("Request timeout")]
    Timeout,

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code for this error.
    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message placed in the response body.
    fn public_message(&self) -> String {
        match self {
            Self::Unauthorized(err) => err.public_message().to_string(),
            Self::Internal(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref detail) = self {
            tracing::error!(error = %detail, "internal server error");
        }
        (self.status(), json_error(&self.public_message())).into_response()
    }
}

/// `{"error": message}` as a JSON response body.
pub fn json_error(message: &str) -> Json<ErrorBody> {
    Json(ErrorBody {
        error: message.to_string(),
    })
}

/// Configuration-class failures (a broken verification key) are server
/// faults; everything else is the caller's.
impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err.class() {
            FailureClass::Configuration => Self::Internal(err.to_string()),
            FailureClass::RequestShape | FailureClass::Credential => Self::Unauthorized(err),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        if err.is_not_found() {
            Self::NotFound("File not found".to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}
