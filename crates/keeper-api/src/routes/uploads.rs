//! # Upload URL Issuance
//!
//! Hands the authenticated caller a short-lived signed `PUT` URL. The
//! object always lands under `avatars/<subject>/`, with the subject taken
//! from the verified token; nothing in the request body can choose another
//! caller's prefix.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use keeper_storage::StorageError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Authenticated;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Prefix for every uploaded object.
pub const OBJECT_PREFIX: &str = "avatars";

/// Upload URL request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    /// Client-side file name. Only its last path segment is used.
    #[serde(default)]
    pub file_name: Option<String>,
    /// MIME type the upload will be sent with.
    #[serde(default)]
    pub content_type: Option<String>,
}

impl Validate for UploadUrlRequest {
    fn validate(&self) -> Result<(), String> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        if !present(&self.file_name) || !present(&self.content_type) {
            return Err("fileName and contentType are required".to_string());
        }
        Ok(())
    }
}

/// Upload URL response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    /// Signed `PUT` URL. The upload must send the requested `Content-Type`.
    pub presigned_url: String,
    /// Object the URL writes to.
    pub object_name: String,
    /// When the URL stops being accepted.
    pub expires_at: DateTime<Utc>,
}

/// Build the uploads router. The caller applies the auth gate.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/uploads/presigned-url", post(issue_upload_url))
}

/// Last `/`-separated segment of `file_name`, ignoring trailing slashes.
///
/// `None` when that segment is empty, `.` or `..`.
pub fn base_name(file_name: &str) -> Option<&str> {
    let trimmed = file_name.trim_end_matches('/');
    let base = trimmed.rsplit('/').next().unwrap_or(trimmed);
    match base {
        "" | "." | ".." => None,
        b => Some(b),
    }
}

/// `avatars/<subject>/<base name>`.
///
/// `None` when the subject would not form exactly one path segment, so
/// one caller can never land inside another caller's prefix.
pub fn object_name_for(subject: &str, file_name: &str) -> Option<String> {
    if subject.contains('/') || matches!(subject, "" | "." | "..") {
        return None;
    }
    base_name(file_name).map(|base| format!("{OBJECT_PREFIX}/{subject}/{base}"))
}

/// POST /api/uploads/presigned-url — Issue a signed upload URL.
#[utoipa::path(
    post,
    path = "/api/uploads/presigned-url",
    request_body = UploadUrlRequest,
    responses(
        (status = 200, description = "Upload URL issued", body = UploadUrlResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = crate::error::ErrorBody),
        (status = 500, description = "Signing failed", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "uploads"
)]
async fn issue_upload_url(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    body: Result<Json<UploadUrlRequest>, JsonRejection>,
) -> Result<Json<UploadUrlResponse>, AppError> {
    let req = extract_validated_json(body)?;
    // Both fields are present after validation.
    let file_name = req.file_name.unwrap_or_default();
    let content_type = req.content_type.unwrap_or_default();

    let object_name = object_name_for(identity.subject(), &file_name).ok_or_else(|| {
        tracing::debug!(subject = %identity, file_name = %file_name, "unusable object name");
        AppError::BadRequest("Invalid fileName".to_string())
    })?;

    let upload = state
        .store
        .generate_upload_url(&object_name, &content_type)
        .await
        .map_err(|err| match err {
            StorageError::InvalidObjectName(reason) => {
                tracing::debug!(object = %object_name, %reason, "rejected object name");
                AppError::BadRequest("Invalid fileName".to_string())
            }
            other => {
                tracing::error!(object = %object_name, error = %other, "error generating signed URL");
                AppError::Internal(other.to_string())
            }
        })?;

    state.metrics.record_upload_url_issued();
    tracing::info!(
        subject = %identity,
        object = %object_name,
        content_type = %content_type,
        expires_at = %upload.expires_at,
        "upload URL issued"
    );

    Ok(Json(UploadUrlResponse {
        presigned_url: upload.url,
        object_name,
        expires_at: upload.expires_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_keeps_last_segment() {
        assert_eq!(base_name("me.png"), Some("me.png"));
        assert_eq!(base_name("photos/2024/me.png"), Some("me.png"));
        assert_eq!(base_name("../../etc/passwd"), Some("passwd"));
        assert_eq!(base_name("dir/"), Some("dir"));
        assert_eq!(base_name("a//"), Some("a"));
    }

    #[test]
    fn base_name_rejects_empty_and_dot_segments() {
        assert_eq!(base_name("/"), None);
        assert_eq!(base_name("///"), None);
        assert_eq!(base_name("."), None);
        assert_eq!(base_name("a/.."), None);
        assert_eq!(base_name("../"), None);
    }

    #[test]
    fn object_name_is_scoped_to_subject() {
        assert_eq!(
            object_name_for("alice", "../bob/me.png").as_deref(),
            Some("avatars/alice/me.png")
        );
        assert_eq!(object_name_for("alice", ".."), None);
    }

    #[test]
    fn subject_must_be_a_single_segment() {
        assert_eq!(object_name_for("bob/x", "me.png"), None);
        assert_eq!(object_name_for("/", "me.png"), None);
        assert_eq!(object_name_for("..", "me.png"), None);
        assert_eq!(object_name_for(".", "me.png"), None);
        assert_eq!(
            object_name_for("b.o b", "me.png").as_deref(),
            Some("avatars/b.o b/me.png")
        );
    }

    #[test]
    fn validation_requires_both_fields() {
        let req = |f: Option<&str>, c: Option<&str>| UploadUrlRequest {
            file_name: f.map(String::from),
            content_type: c.map(String::from),
        };
        assert!(req(Some("a.png"), Some("image/png")).validate().is_ok());
        assert!(req(None, Some("image/png")).validate().is_err());
        assert!(req(Some("a.png"), Some("")).validate().is_err());
        assert!(req(Some(""), None).validate().is_err());
    }

    #[test]
    fn extra_fields_are_ignored() {
        let req: UploadUrlRequest = serde_json::from_str(
            r#"{"fileName":"a.png","contentType":"image/png","userId":"bob"}"#,
        )
        .unwrap();
        assert_eq!(req.file_name.as_deref(), Some("a.png"));
    }

    #[test]
    fn response_uses_camel_case() {
        let resp = UploadUrlResponse {
            presigned_url: "https://x".into(),
            object_name: "avatars/a/b".into(),
            expires_at: Utc::now(),
        };
        let v = serde_json::to_value(&resp).unwrap();
        assert!(v.get("presignedUrl").is_some());
        assert!(v.get("objectName").is_some());
        assert!(v.get("expiresAt").is_some());
    }
}
