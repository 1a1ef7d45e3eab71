//! HTTP adapters for a remote DAM backend.
//!
//! Implementations of [`MediaResolver`] and [`AssetStore`] that call the
//! backend's REST API. Each adapter wraps a `reqwest::Client` with the
//! backend base URL and a per-request timeout; all adapters are
//! `Send + Sync` and designed to be shared via `Arc` across tasks.
//!
//! The collaborator traits are synchronous, so the adapters bridge into the
//! async HTTP client with `tokio::runtime::Handle::block_on`. They must be
//! invoked from blocking worker context (`tokio::task::spawn_blocking`),
//! never directly on an async task.
//!
//! HTTP errors are mapped to the domain error types with the endpoint URL
//! and status as diagnostic context. A resolver 404 is not an error: it
//! means "no matching rendition" and maps to `Ok(None)`.

use std::time::Duration;

use dam_core::{AssetFingerprint, AssetStore, FingerprintSource, StoreError};

use crate::resolver::{MediaResolver, RenditionRequest, ResolveError, ResolvedMedia};

/// Connection parameters for the DAM backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the backend API (e.g. `https://dam.example.com/api`).
    pub base_url: String,
    /// Request timeout in seconds (default: 30).
    pub timeout_secs: u64,
}

impl BackendConfig {
    /// Create a new configuration with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: 30,
        }
    }
}

fn build_client(timeout_secs: u64) -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| format!("failed to build HTTP client: {e}"))
}

fn validate_base_url(base_url: &str) -> Result<String, String> {
    url::Url::parse(base_url).map_err(|e| format!("invalid base URL {base_url}: {e}"))?;
    Ok(base_url.trim_end_matches('/').to_string())
}

// ─── Media resolver adapter ─────────────────────────────────────────────

/// HTTP client resolving renditions against the backend's
/// `GET {base}/media/resolve` endpoint.
#[derive(Debug)]
pub struct HttpMediaResolver {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMediaResolver {
    pub fn new(config: BackendConfig) -> Result<Self, ResolveError> {
        let base_url = validate_base_url(&config.base_url)
            .map_err(|reason| ResolveError::NotConfigured { reason })?;
        let client = build_client(config.timeout_secs)
            .map_err(|reason| ResolveError::NotConfigured { reason })?;
        Ok(Self { client, base_url })
    }
}

impl MediaResolver for HttpMediaResolver {
    fn resolve(&self, request: &RenditionRequest) -> Result<Option<ResolvedMedia>, ResolveError> {
        let rt = tokio::runtime::Handle::try_current().map_err(|_| ResolveError::Unavailable {
            reason: "no async runtime available for HTTP request".into(),
        })?;

        let url = format!("{}/media/resolve", self.base_url);
        let mut query: Vec<(&str, String)> = vec![("assetPath", request.asset_path.clone())];
        if let Some(format) = &request.media_format {
            query.push(("mediaFormat", format.clone()));
        }
        if request.width > 0 {
            query.push(("width", request.width.to_string()));
        }
        if request.height > 0 {
            query.push(("height", request.height.to_string()));
        }

        rt.block_on(async {
            let resp = self
                .client
                .get(&url)
                .query(&query)
                .send()
                .await
                .map_err(|e| ResolveError::Unavailable {
                    reason: format!("{url}: {e}"),
                })?;

            if resp.status() == reqwest::StatusCode::NOT_FOUND {
                tracing::debug!(path = %request.asset_path, "no rendition resolved");
                return Ok(None);
            }
            if !resp.status().is_success() {
                return Err(ResolveError::ResolutionFailed {
                    reason: format!("{url}: HTTP {}", resp.status()),
                });
            }

            let media: ResolvedMedia =
                resp.json().await.map_err(|e| ResolveError::ResolutionFailed {
                    reason: format!("response deserialization failed: {e}"),
                })?;
            Ok(Some(media))
        })
    }

    fn resolver_name(&self) -> &str {
        "HttpMediaResolver"
    }
}

// ─── Asset store adapter ────────────────────────────────────────────────

/// HTTP client listing asset fingerprints from the backend's
/// `GET {base}/assets/fingerprints` endpoint. The backend returns rows
/// ordered by path.
#[derive(Debug)]
pub struct HttpAssetStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAssetStore {
    pub fn new(config: BackendConfig) -> Result<Self, StoreError> {
        let base_url = validate_base_url(&config.base_url)
            .map_err(|reason| StoreError::Unavailable { reason })?;
        let client = build_client(config.timeout_secs)
            .map_err(|reason| StoreError::Unavailable { reason })?;
        Ok(Self { client, base_url })
    }
}

impl AssetStore for HttpAssetStore {
    fn subtree_fingerprints(
        &self,
        root: &str,
        source: FingerprintSource,
    ) -> Result<Vec<AssetFingerprint>, StoreError> {
        let rt = tokio::runtime::Handle::try_current().map_err(|_| StoreError::Unavailable {
            reason: "no async runtime available for HTTP request".into(),
        })?;

        let url = format!("{}/assets/fingerprints", self.base_url);
        let query = [("root", root), ("source", source.as_str())];

        rt.block_on(async {
            let resp = self
                .client
                .get(&url)
                .query(&query)
                .send()
                .await
                .map_err(|e| StoreError::Unavailable {
                    reason: format!("{url}: {e}"),
                })?;

            if !resp.status().is_success() {
                return Err(StoreError::QueryFailed {
                    reason: format!("{url}: HTTP {}", resp.status()),
                });
            }

            let rows: Vec<AssetFingerprint> =
                resp.json().await.map_err(|e| StoreError::QueryFailed {
                    reason: format!("response deserialization failed: {e}"),
                })?;
            tracing::debug!(root, rows = rows.len(), "fetched fingerprint listing");
            Ok(rows)
        })
    }

    fn store_name(&self) -> &str {
        "HttpAssetStore"
    }
}
