//! # dam-api — HTTP Surface for the DAM Asset Service
//!
//! A small HTTP/JSON layer over the data version tracking core:
//!
//! | Route                      | Module                     | Purpose                      |
//! |----------------------------|----------------------------|------------------------------|
//! | `GET /v1/assets/{path}`    | [`routes::assets`]         | Resolve asset renditions     |
//! | `GET /v1/dataversion/{root}` | [`routes::dataversion`]  | Data version token lookup    |
//! | `POST /v1/events`          | [`routes::events`]         | Change notification intake   |
//! | `GET /health/*`            | here                       | Liveness/readiness probes    |
//! | `GET /metrics`             | here                       | Prometheus scrape endpoint   |
//! | `GET /openapi.json`        | [`openapi`]                | OpenAPI document             |
//!
//! Health probes and `/metrics` sit outside the metrics middleware so
//! scrapes and probes do not count as traffic.

pub mod config;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod request;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();
    let metrics_on = config::metrics_enabled();

    let mut api = Router::new()
        .merge(routes::assets::router())
        .merge(routes::dataversion::router())
        .merge(routes::events::router())
        .merge(openapi::router());

    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let mut probes = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    if metrics_on {
        probes = probes
            .route("/metrics", axum::routing::get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    let probes = probes.with_state(state);

    Router::new().merge(probes).merge(api)
}

/// GET /metrics — Prometheus metrics scrape endpoint.
///
/// Updates the tracked-roots gauge from the registry on each scrape (pull
/// model), then gathers and encodes all metrics in text exposition format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    metrics
        .tracked_roots()
        .set(state.registry.roots().len() as i64);

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the version registry serves a token for every
/// configured root. Returns 200 "ready" or 503 with a diagnostic message.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    for root in state.registry.roots() {
        if state.registry.data_version(root).is_none() {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("no data version for {root}"),
            )
                .into_response();
        }
    }
    (StatusCode::OK, "ready").into_response()
}
