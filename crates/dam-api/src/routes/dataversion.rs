//! # Data Version API
//!
//! `GET /v1/dataversion/{root}` — current data version token for a
//! configured DAM root path.
//!
//! The token is opaque; clients compare it for equality to detect that
//! something under the root changed. The response always carries
//! non-caching headers so downstream caches re-validate on every poll.
//! Only exact configured roots are served; descendants and unknown paths
//! answer 404.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::AppState;

/// Data version response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataVersionResponse {
    /// Opaque version token for the requested root.
    pub data_version: String,
}

/// Build the data version router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/dataversion/*root", get(get_data_version))
}

/// GET /v1/dataversion/{root} — current token for a configured root.
#[utoipa::path(
    get,
    path = "/v1/dataversion/{root}",
    params(("root" = String, Path, description = "Configured DAM root path")),
    responses(
        (status = 200, description = "Current data version", body = DataVersionResponse),
        (status = 404, description = "Not a configured root path", body = crate::error::ErrorBody),
    ),
    tag = "dataversion"
)]
pub(crate) async fn get_data_version(
    State(state): State<AppState>,
    Path(root): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let root_path = format!("/{}", root.trim_start_matches('/'));

    let Some(data_version) = state.registry.data_version(&root_path) else {
        tracing::debug!(path = %root_path, "path not allowed to get data version");
        return Err(AppError::NotFound(format!(
            "{root_path} is not a configured DAM root"
        )));
    };

    Ok((
        [
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        Json(DataVersionResponse { data_version }),
    ))
}
