//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the service surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "DAM Asset Service",
        version = "0.1.0",
        description = "RESTful service for resolving URLs to DAM assets and renditions, \
            and for polling a per-root data version token that changes whenever \
            content under the root changes.",
        license(name = "Apache-2.0")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        crate::routes::assets::resolve_asset,
        crate::routes::dataversion::get_data_version,
        crate::routes::events::ingest_change_event,
    ),
    components(schemas(
        crate::routes::assets::AssetRenditionResponse,
        crate::routes::dataversion::DataVersionResponse,
        crate::routes::events::ChangeEventBody,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "assets", description = "Asset resolution"),
        (name = "dataversion", description = "Data version lookup"),
        (name = "events", description = "Change event intake"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(serve_openapi))
}

async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
