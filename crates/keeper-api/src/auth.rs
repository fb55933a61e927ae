//! # Authentication Gate
//!
//! Bearer token middleware binding the verified caller [`Identity`] into
//! request extensions.
//!
//! ## Flow
//!
//! ```text
//! Authorization header ─▶ parse_bearer ─▶ TokenVerifier::verify ─▶ extensions.insert(Identity)
//!          │                    │                   │
//!          ▼                    ▼                   ▼
//!     401 required        401 bad format       401 Invalid token
//! ```
//!
//! The extension slot is keyed by the [`Identity`] type itself, so no other
//! layer can collide with it, and `Identity` has no public constructor, so
//! the only way a value gets there is a successful verification.
//!
//! Handlers take [`Authenticated`]. If it is missing, the route was wired
//! without the gate; that is a server bug and answers 500, never anonymous
//! access.

use axum::extract::{Request, State};
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use keeper_auth::{parse_bearer, AuthError, FailureClass, Identity, TokenVerifier};

use crate::error::AppError;
use crate::state::AppState;

/// Verify the request's bearer token and bind the resulting identity.
///
/// Usable directly as well as through [`auth_middleware`]. On failure the
/// request is left without an identity.
///
/// # Errors
///
/// [`AuthError::MissingHeader`] or [`AuthError::MalformedHeader`] for a
/// badly shaped header; any verifier error otherwise.
pub fn verify_and_bind<B>(
    verifier: &TokenVerifier,
    request: &mut axum::http::Request<B>,
) -> Result<Identity, AuthError> {
    request.extensions_mut().remove::<Identity>();

    let header_value = match request.headers().get(header::AUTHORIZATION) {
        None => None,
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| AuthError::MalformedHeader("header is not visible ASCII"))?,
        ),
    };
    let token = parse_bearer(header_value)?;
    let identity = verifier.verify(token)?;

    request.extensions_mut().insert(identity.clone());
    Ok(identity)
}

/// Gate middleware. Install with `from_fn_with_state`.
///
/// Short-circuits with 401 (or 500 for a broken key) without running the
/// inner service. The detailed cause is logged and counted; the response
/// body only ever carries the public message.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match verify_and_bind(&state.verifier, &mut request) {
        Ok(identity) => {
            tracing::debug!(subject = %identity, "request authenticated");
            next.run(request).await
        }
        Err(err) => {
            state.metrics.record_auth_failure(err.reason());
            match err.class() {
                FailureClass::Configuration => {
                    tracing::error!(error = %err, "token verifier misconfigured");
                }
                FailureClass::Credential => {
                    tracing::warn!(reason = err.reason(), error = %err, "invalid token");
                }
                FailureClass::RequestShape => {
                    tracing::warn!(reason = err.reason(), "authentication failed");
                }
            }
            AppError::from(err).into_response()
        }
    }
}

/// The verified caller, extracted from request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated(pub Identity);

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(Authenticated)
            .ok_or_else(|| AppError::Internal("no verified identity bound to request".into()))
    }
}
