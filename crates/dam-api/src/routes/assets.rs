//! # Asset Resolution API
//!
//! `GET /v1/assets/{path...}` — resolve a DAM asset into one or more
//! rendition URLs with metadata.
//!
//! Constraints come either as suffix segments appended to the asset path
//! (`…/sample.jpg/mediaFormat=web,width=960/width=640.json`) or as repeated
//! `mediaFormat`/`width`/`height` query parameters; see
//! [`crate::request`]. The asset path ends at the first path segment
//! containing `=`.
//!
//! Resolution is delegated to the configured [`MediaResolver`] collaborator
//! on a blocking worker. Requests that resolve to nothing are skipped; if
//! nothing resolves at all the endpoint answers 404.

use axum::extract::{Path, RawQuery, State};
use axum::routing::get;
use axum::{Json, Router};
use dam_client::{MediaResolver, ResolvedMedia};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::request::parse_asset_requests;
use crate::state::AppState;

/// One resolved rendition. Unknown metadata is omitted from the JSON.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetRenditionResponse {
    /// Path of the resolved asset.
    pub asset_path: String,
    /// Delivery URL of the rendition.
    pub url: String,
    /// Rendition width; present only together with `height`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u64>,
    /// Rendition height; present only together with `width`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    /// Rendition file size in bytes, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Rendition file extension, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_extension: Option<String>,
    /// Rendition MIME type, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl From<ResolvedMedia> for AssetRenditionResponse {
    fn from(media: ResolvedMedia) -> Self {
        let dimensioned = media.width > 0 && media.height > 0;
        Self {
            asset_path: media.asset_path,
            url: media.url,
            width: dimensioned.then_some(media.width),
            height: dimensioned.then_some(media.height),
            file_size: (media.file_size > 0).then_some(media.file_size),
            file_extension: (!media.file_extension.is_empty()).then_some(media.file_extension),
            mime_type: (!media.mime_type.is_empty()).then_some(media.mime_type),
        }
    }
}

/// Build the asset resolution router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/assets/*path", get(resolve_asset))
}

/// GET /v1/assets/{path...} — resolve an asset to rendition metadata.
#[utoipa::path(
    get,
    path = "/v1/assets/{path}",
    params(
        ("path" = String, Path, description = "Asset path, optionally followed by rendition suffix segments"),
        ("mediaFormat" = Option<String>, Query, description = "Media format name (repeatable)"),
        ("width" = Option<u64>, Query, description = "Requested width (repeatable)"),
        ("height" = Option<u64>, Query, description = "Requested height (repeatable)"),
    ),
    responses(
        (status = 200, description = "Resolved renditions", body = [AssetRenditionResponse]),
        (status = 404, description = "Asset not governed or nothing resolved", body = crate::error::ErrorBody),
    ),
    tag = "assets"
)]
pub(crate) async fn resolve_asset(
    State(state): State<AppState>,
    Path(path): Path<String>,
    RawQuery(raw_query): RawQuery,
) -> Result<Json<Vec<AssetRenditionResponse>>, AppError> {
    let (asset_path, suffix) = split_rendition_suffix(&path);

    if !state.registry.is_allowed_asset_path(&asset_path) {
        tracing::debug!(path = %asset_path, "asset path not allowed");
        return Err(AppError::NotFound(format!("no asset at {asset_path}")));
    }

    let Some(resolver) = state.resolver.clone() else {
        tracing::debug!(path = %asset_path, "no media resolver available");
        return Err(AppError::NotFound(format!("no asset at {asset_path}")));
    };

    let requests = parse_asset_requests(&asset_path, suffix.as_deref(), raw_query.as_deref());

    // The resolver contract is synchronous and may block on backend I/O;
    // run the whole batch on a blocking worker.
    let resolved = tokio::task::spawn_blocking(move || resolve_all(resolver.as_ref(), &requests))
        .await
        .map_err(|e| AppError::Internal(format!("resolution task failed: {e}")))?;

    if resolved.is_empty() {
        tracing::debug!(path = %asset_path, "no matching assets/renditions found");
        return Err(AppError::NotFound(format!("no asset at {asset_path}")));
    }

    Ok(Json(resolved.into_iter().map(Into::into).collect()))
}

fn resolve_all(
    resolver: &dyn MediaResolver,
    requests: &[dam_client::RenditionRequest],
) -> Vec<ResolvedMedia> {
    requests
        .iter()
        .filter_map(|request| match resolver.resolve(request) {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::warn!(
                    resolver = resolver.resolver_name(),
                    path = %request.asset_path,
                    error = %err,
                    "media resolution failed"
                );
                None
            }
        })
        .collect()
}

/// Split the wildcard capture into the asset path and the optional
/// rendition suffix. The asset path ends at the first segment containing
/// `=`; the capture arrives without its leading slash.
fn split_rendition_suffix(path: &str) -> (String, Option<String>) {
    let trimmed = path.trim_start_matches('/');
    match trimmed.split('/').position(|segment| segment.contains('=')) {
        Some(index) => {
            let segments: Vec<&str> = trimmed.split('/').collect();
            let asset_path = format!("/{}", segments[..index].join("/"));
            let suffix = segments[index..].join("/");
            (asset_path, Some(suffix))
        }
        None => (format!("/{trimmed}"), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use dam_client::MockMediaResolver;
    use dam_core::{InMemoryAssetStore, RegistryConfig, VersionRegistry};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const SAMPLE: &str = "/content/dam/sample/sample.jpg";

    fn test_state(setup: impl FnOnce(&MockMediaResolver)) -> AppState {
        let config = RegistryConfig {
            roots: vec!["/content/dam/sample".into()],
            ..RegistryConfig::default()
        };
        let registry =
            VersionRegistry::new(config, Arc::new(InMemoryAssetStore::new())).unwrap();
        let resolver = Arc::new(MockMediaResolver::new());
        setup(&resolver);
        AppState::new(Arc::new(registry), Some(resolver))
    }

    async fn get(app: Router, uri: &str) -> axum::response::Response {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        app.oneshot(req).await.unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn suffix_split_finds_the_first_constraint_segment() {
        let (path, suffix) =
            split_rendition_suffix("content/dam/sample/sample.jpg/width=960/width=640.json");
        assert_eq!(path, SAMPLE);
        assert_eq!(suffix.as_deref(), Some("width=960/width=640.json"));

        let (path, suffix) = split_rendition_suffix("content/dam/sample/sample.jpg");
        assert_eq!(path, SAMPLE);
        assert_eq!(suffix, None);
    }

    #[tokio::test]
    async fn unparameterized_request_resolves_the_whole_asset() {
        let app = router().with_state(test_state(|resolver| {
            resolver.add_asset(SAMPLE, 0);
        }));
        let resp = get(app, "/v1/assets/content/dam/sample/sample.jpg").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Vec<AssetRenditionResponse> = body_json(resp).await;
        assert_eq!(body.len(), 1);
        assert_eq!(body[0].asset_path, SAMPLE);
        assert!(!body[0].url.is_empty());
        assert!(body[0].width.is_none());
        assert!(body[0].height.is_none());
        assert!(body[0].file_size.is_none());
    }

    #[tokio::test]
    async fn dimension_query_parameters_are_applied() {
        let app = router().with_state(test_state(|resolver| {
            resolver.add_asset(SAMPLE, 48_000);
        }));
        let resp = get(
            app,
            "/v1/assets/content/dam/sample/sample.jpg?width=960&height=270",
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Vec<AssetRenditionResponse> = body_json(resp).await;
        assert_eq!(body.len(), 1);
        assert_eq!(body[0].width, Some(960));
        assert_eq!(body[0].height, Some(270));
        assert_eq!(body[0].file_size, Some(48_000));
    }

    #[tokio::test]
    async fn suffix_segments_yield_one_element_per_rendition() {
        let app = router().with_state(test_state(|resolver| {
            resolver.add_asset(SAMPLE, 48_000);
        }));
        let resp = get(
            app,
            "/v1/assets/content/dam/sample/sample.jpg/width=960,height=270/width=640,height=180.json",
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Vec<AssetRenditionResponse> = body_json(resp).await;
        assert_eq!(body.len(), 2);
        assert_eq!(body[0].width, Some(960));
        assert_eq!(body[1].width, Some(640));
        assert_eq!(body[1].height, Some(180));
    }

    #[tokio::test]
    async fn asset_outside_configured_roots_is_not_found() {
        let app = router().with_state(test_state(|resolver| {
            resolver.add_asset("/content/dam/other/file.png", 0);
        }));
        let resp = get(app, "/v1/assets/content/dam/other/file.png?width=960").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unresolvable_asset_is_not_found() {
        let app = router().with_state(test_state(|_| {}));
        let resp = get(app, "/v1/assets/content/dam/sample/missing.jpg").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_resolver_is_not_found() {
        let config = RegistryConfig {
            roots: vec!["/content/dam/sample".into()],
            ..RegistryConfig::default()
        };
        let registry =
            VersionRegistry::new(config, Arc::new(InMemoryAssetStore::new())).unwrap();
        let state = AppState::new(Arc::new(registry), None);

        let resp = get(
            router().with_state(state),
            "/v1/assets/content/dam/sample/sample.jpg",
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn omitted_fields_are_absent_from_the_json() {
        let app = router().with_state(test_state(|resolver| {
            resolver.add_asset(SAMPLE, 0);
        }));
        let resp = get(app, "/v1/assets/content/dam/sample/sample.jpg").await;
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let raw = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!raw.contains("width"), "got: {raw}");
        assert!(!raw.contains("fileSize"), "got: {raw}");
        // Extension and MIME type are known for .jpg assets.
        assert!(raw.contains("fileExtension"));
        assert!(raw.contains("mimeType"));
    }
}
