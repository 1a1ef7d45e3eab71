//! # Change Event Intake
//!
//! `POST /v1/events` — host wiring for DAM change notifications.
//!
//! The DAM backend (or any other event source) posts one notification per
//! changed asset; the handler forwards it to the version registry, which
//! routes it to the strategy owning the path. Notifications for paths
//! outside every configured root are accepted and dropped silently, so
//! event publishers need no knowledge of the root configuration.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use dam_core::{ChangeEvent, ChangeEventKind};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::AppState;

/// One change notification.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChangeEventBody {
    /// Absolute path of the affected asset.
    pub asset_path: String,
    /// The kind of modification. One of: "created", "updated", "deleted",
    /// "metadata_updated", "moved".
    pub kind: String,
}

/// Build the event intake router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/events", post(ingest_change_event))
}

/// POST /v1/events — forward one change notification to the registry.
#[utoipa::path(
    post,
    path = "/v1/events",
    request_body = ChangeEventBody,
    responses(
        (status = 202, description = "Notification accepted"),
        (status = 422, description = "Malformed notification", body = crate::error::ErrorBody),
    ),
    tag = "events"
)]
pub(crate) async fn ingest_change_event(
    State(state): State<AppState>,
    payload: Result<Json<ChangeEventBody>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(body) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    if body.asset_path.trim().is_empty() {
        return Err(AppError::Validation("assetPath must not be empty".into()));
    }
    let kind = parse_event_kind(&body.kind)?;

    state
        .registry
        .handle_change_event(&ChangeEvent::new(body.asset_path, kind));
    Ok(StatusCode::ACCEPTED)
}

fn parse_event_kind(s: &str) -> Result<ChangeEventKind, AppError> {
    match s.to_lowercase().as_str() {
        "created" => Ok(ChangeEventKind::Created),
        "updated" => Ok(ChangeEventKind::Updated),
        "deleted" => Ok(ChangeEventKind::Deleted),
        "metadata_updated" => Ok(ChangeEventKind::MetadataUpdated),
        "moved" => Ok(ChangeEventKind::Moved),
        _ => Err(AppError::Validation(format!(
            "unknown event kind: {s}. Valid: created, updated, deleted, metadata_updated, moved"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use dam_core::{InMemoryAssetStore, RegistryConfig, VersionRegistry};
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let config = RegistryConfig {
            roots: vec!["/content/dam/sample".into()],
            ..RegistryConfig::default()
        };
        let registry =
            VersionRegistry::new(config, Arc::new(InMemoryAssetStore::new())).unwrap();
        AppState::new(Arc::new(registry), None)
    }

    async fn post_event(app: Router, body: &str) -> axum::response::Response {
        let req = Request::builder()
            .method("POST")
            .uri("/v1/events")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        app.oneshot(req).await.unwrap()
    }

    #[tokio::test]
    async fn governed_event_is_accepted_and_moves_the_token() {
        let state = test_state();
        let app = router().with_state(state.clone());
        let before = state.registry.data_version("/content/dam/sample").unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        let resp = post_event(
            app,
            r#"{"assetPath": "/content/dam/sample/a.png", "kind": "updated"}"#,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_ne!(
            state.registry.data_version("/content/dam/sample").unwrap(),
            before
        );
    }

    #[tokio::test]
    async fn ungoverned_event_is_accepted_and_dropped() {
        let state = test_state();
        let app = router().with_state(state.clone());
        let before = state.registry.data_version("/content/dam/sample").unwrap();

        let resp = post_event(
            app,
            r#"{"assetPath": "/content/other/a.png", "kind": "created"}"#,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(
            state.registry.data_version("/content/dam/sample").unwrap(),
            before
        );
    }

    #[tokio::test]
    async fn unknown_kind_is_rejected() {
        let resp = post_event(
            router().with_state(test_state()),
            r#"{"assetPath": "/content/dam/sample/a.png", "kind": "touched"}"#,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let resp = post_event(router().with_state(test_state()), "{not json").await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn empty_asset_path_is_rejected() {
        let resp = post_event(
            router().with_state(test_state()),
            r#"{"assetPath": "  ", "kind": "updated"}"#,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
