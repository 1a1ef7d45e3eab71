//! Media resolver contract.
//!
//! Resolving turns an asset path plus optional format/dimension constraints
//! into a concrete rendition: a delivery URL and its metadata. The actual
//! resolution logic lives in the DAM backend; this crate only defines the
//! seam and ships a deterministic mock for tests and development.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One resolution request: an asset path plus optional constraints.
/// `width`/`height` of 0 mean unconstrained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionRequest {
    pub asset_path: String,
    pub media_format: Option<String>,
    pub width: u64,
    pub height: u64,
}

impl RenditionRequest {
    /// Unconstrained request for the whole asset.
    pub fn unconstrained(asset_path: impl Into<String>) -> Self {
        Self {
            asset_path: asset_path.into(),
            media_format: None,
            width: 0,
            height: 0,
        }
    }
}

/// A successfully resolved rendition. Zero/empty fields mean "not known",
/// and the HTTP layer omits them from responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMedia {
    pub asset_path: String,
    pub url: String,
    #[serde(default)]
    pub width: u64,
    #[serde(default)]
    pub height: u64,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub file_extension: String,
    #[serde(default)]
    pub mime_type: String,
}

/// Upstream resolver failures. A request that simply matches no rendition
/// is not an error; it resolves to `Ok(None)`.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("media resolver not configured: {reason}")]
    NotConfigured { reason: String },

    #[error("media resolver unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("media resolution failed: {reason}")]
    ResolutionFailed { reason: String },
}

/// Resolver collaborator. Implementations must be `Send + Sync` so they can
/// be shared behind an `Arc`; the trait is object-safe to support runtime
/// adapter selection (mock vs. live).
pub trait MediaResolver: Send + Sync {
    /// Resolve one request. `Ok(None)` means no matching rendition.
    fn resolve(&self, request: &RenditionRequest) -> Result<Option<ResolvedMedia>, ResolveError>;

    /// Human-readable implementation name for logs.
    fn resolver_name(&self) -> &str;
}

impl std::fmt::Debug for dyn MediaResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.resolver_name())
    }
}

/// Deterministic resolver over a configured set of assets.
///
/// Unknown asset paths resolve to nothing. Known assets resolve to a stable
/// URL under `https://media.example.com`; dimension constraints are echoed
/// into the URL and the metadata, and the file extension/MIME type are
/// derived from the asset path.
#[derive(Debug, Default)]
pub struct MockMediaResolver {
    assets: RwLock<BTreeMap<String, u64>>,
}

impl MockMediaResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset. `file_size` of 0 leaves the size unknown.
    pub fn add_asset(&self, path: impl Into<String>, file_size: u64) {
        self.assets.write().insert(path.into(), file_size);
    }
}

impl MediaResolver for MockMediaResolver {
    fn resolve(&self, request: &RenditionRequest) -> Result<Option<ResolvedMedia>, ResolveError> {
        let assets = self.assets.read();
        let Some(&file_size) = assets.get(&request.asset_path) else {
            return Ok(None);
        };

        let constrained = request.width > 0 && request.height > 0;
        let mut url = format!("https://media.example.com{}", request.asset_path);
        if let Some(format) = &request.media_format {
            url.push_str(&format!("/format:{format}"));
        }
        if constrained {
            url.push_str(&format!("/{}x{}", request.width, request.height));
        }

        let file_extension = request
            .asset_path
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string())
            .unwrap_or_default();

        Ok(Some(ResolvedMedia {
            asset_path: request.asset_path.clone(),
            url,
            width: if constrained { request.width } else { 0 },
            height: if constrained { request.height } else { 0 },
            file_size,
            mime_type: mime_type_for(&file_extension).to_string(),
            file_extension,
        }))
    }

    fn resolver_name(&self) -> &str {
        "MockMediaResolver"
    }
}

fn mime_type_for(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "" => "",
        _ => "application/octet-stream",
    }
}
