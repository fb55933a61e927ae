//! # Custom Extractors & Validation
//!
//! Provides the [`Validate`] trait for request DTOs and helpers to extract
//! and validate JSON bodies in handlers. Body rejections are reported with a
//! fixed message; the serde detail is logged at debug.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Message for any request body that does not decode.
pub const INVALID_BODY_MESSAGE: &str = "Invalid request body";

/// Trait for request types that can validate their business rules
/// beyond what serde deserialization checks.
pub trait Validate {
    /// Validate business rules. Returns the caller-facing message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result.map(|Json(v)| v).map_err(|err| {
        tracing::debug!(rejection = %err.body_text(), "request body rejected");
        AppError::BadRequest(INVALID_BODY_MESSAGE.to_string())
    })
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::BadRequest)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(String);

    impl Validate for Named {
        fn validate(&self) -> Result<(), String> {
            if self.0.is_empty() {
                Err("name is required".into())
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn validated_json_passes_through_valid_values() {
        let value = extract_validated_json(Ok(Json(Named("a".into())))).unwrap();
        assert_eq!(value.0, "a");
    }

    #[test]
    fn validation_message_becomes_bad_request() {
        let err = extract_validated_json(Ok(Json(Named(String::new())))).err().unwrap();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "name is required"));
    }
}
