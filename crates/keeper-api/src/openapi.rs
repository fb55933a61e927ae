//! # OpenAPI Specification Assembly
//!
//! Collects the utoipa-documented routes into one OpenAPI document, served
//! unauthenticated at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Keeper Media API",
        version = "0.1.0",
        description = "Signed upload URLs for authenticated callers and pass-through media streaming.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        crate::routes::health::health,
        crate::routes::uploads::issue_upload_url,
        crate::routes::media::serve_media,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::routes::uploads::UploadUrlRequest,
        crate::routes::uploads::UploadUrlResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Liveness"),
        (name = "uploads", description = "Signed upload URLs (bearer token required)"),
        (name = "media", description = "Media streaming"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme (RSA-signed JWT).
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
