//! Asset store collaborator.
//!
//! The checksum strategy recomputes its token from a fingerprint listing of
//! every asset under a root, queried from the backing store's index. The
//! trait is synchronous and object-safe so implementations can be shared as
//! `Arc<dyn AssetStore>` across tasks; callers invoke it from blocking
//! worker context only.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which per-asset value feeds the aggregate checksum.
///
/// The choice is deployment-specific; tokens computed under different
/// settings are not comparable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FingerprintSource {
    /// Content checksum as maintained by the store (e.g. a SHA-1/SHA-256
    /// property written at ingest time).
    #[default]
    ContentHash,
    /// Last-modified timestamp of the asset.
    LastModified,
}

impl FingerprintSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContentHash => "content-hash",
            Self::LastModified => "last-modified",
        }
    }
}

impl FromStr for FingerprintSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "content-hash" => Ok(Self::ContentHash),
            "last-modified" => Ok(Self::LastModified),
            other => Err(format!(
                "unknown fingerprint source: {other}. Valid: content-hash, last-modified"
            )),
        }
    }
}

/// One row of the fingerprint listing: asset path plus the per-asset value
/// selected by [`FingerprintSource`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFingerprint {
    pub path: String,
    pub fingerprint: String,
}

/// Failures of the store collaborator. All of these are transient from the
/// tracking subsystem's point of view: the strategy logs them and retries on
/// the next tick.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("asset store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("asset store query failed: {reason}")]
    QueryFailed { reason: String },
}

/// Queryable view of the asset store.
///
/// `subtree_fingerprints` returns one row per asset strictly under `root`,
/// ordered by path. The order is part of the token contract: folding the
/// same rows in a different order yields a different token, which is
/// acceptable because the token only signals change, not identity.
pub trait AssetStore: Send + Sync {
    fn subtree_fingerprints(
        &self,
        root: &str,
        source: FingerprintSource,
    ) -> Result<Vec<AssetFingerprint>, StoreError>;

    /// Human-readable implementation name for logs.
    fn store_name(&self) -> &str;
}

impl std::fmt::Debug for dyn AssetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.store_name())
    }
}

/// In-memory store used by tests and zero-dependency development setups.
///
/// Assets live in a `BTreeMap`, so listings come back in path order like a
/// store index would return them.
#[derive(Debug, Default)]
pub struct InMemoryAssetStore {
    assets: RwLock<BTreeMap<String, AssetEntry>>,
}

#[derive(Debug, Clone)]
struct AssetEntry {
    content_hash: String,
    last_modified: DateTime<Utc>,
}

impl InMemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an asset.
    pub fn put_asset(
        &self,
        path: impl Into<String>,
        content_hash: impl Into<String>,
        last_modified: DateTime<Utc>,
    ) {
        self.assets.write().insert(
            path.into(),
            AssetEntry {
                content_hash: content_hash.into(),
                last_modified,
            },
        );
    }

    pub fn remove_asset(&self, path: &str) {
        self.assets.write().remove(path);
    }

    pub fn asset_count(&self) -> usize {
        self.assets.read().len()
    }
}

impl AssetStore for InMemoryAssetStore {
    fn subtree_fingerprints(
        &self,
        root: &str,
        source: FingerprintSource,
    ) -> Result<Vec<AssetFingerprint>, StoreError> {
        let assets = self.assets.read();
        Ok(assets
            .iter()
            .filter(|(path, _)| crate::matcher::is_strict_descendant(root, path))
            .map(|(path, entry)| AssetFingerprint {
                path: path.clone(),
                fingerprint: match source {
                    FingerprintSource::ContentHash => entry.content_hash.clone(),
                    FingerprintSource::LastModified => {
                        entry.last_modified.timestamp_millis().to_string()
                    }
                },
            })
            .collect())
    }

    fn store_name(&self) -> &str {
        "InMemoryAssetStore"
    }
}
