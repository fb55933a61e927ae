//! # Bearer Header Parsing
//!
//! Extracts the raw credential from an `Authorization` header value. This
//! runs before any cryptographic material is inspected, so its failures are
//! reported to the caller with specific messages.

use crate::error::AuthError;

/// Scheme prefix required on the `Authorization` header, including the
/// separating space.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Parse an `Authorization` header value into the raw token.
///
/// `None` and an empty value are both treated as a missing header. The value
/// must start with `Bearer ` (case-sensitive) followed by a non-empty token;
/// the token is returned as-is, without the prefix.
pub fn parse_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let value = match header {
        Some(v) if !v.is_empty() => v,
        _ => return Err(AuthError::MissingHeader),
    };

    let token = value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::MalformedHeader("expected Bearer scheme"))?;

    if token.is_empty() {
        return Err(AuthError::MalformedHeader("empty bearer token"));
    }
    if token.contains(BEARER_PREFIX) {
        return Err(AuthError::MalformedHeader("repeated Bearer scheme"));
    }

    Ok(token)
}
