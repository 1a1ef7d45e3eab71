//! Service configuration from environment variables.
//!
//! All knobs live under the `DAM_SERVICE_*` prefix. Absent variables fall
//! back to defaults; present-but-invalid values are fatal at startup so a
//! misconfigured deployment never comes up half-working.

use std::net::SocketAddr;

use dam_core::{FingerprintSource, RegistryConfig, StrategyKind};
use thiserror::Error;

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_UPDATE_INTERVAL_SECS: i64 = 120;

/// Fatal configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

/// Resolved service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Listen address.
    pub bind_addr: SocketAddr,
    /// DAM root paths to track. Empty falls back to the default root.
    pub dam_paths: Vec<String>,
    /// Data version strategy selector (`timestamp` or `checksum`); validated
    /// by the registry at construction.
    pub data_version_strategy: String,
    /// Recomputation interval in seconds for the checksum strategy. Not
    /// positive disables recomputation with a warning.
    pub update_interval_secs: i64,
    /// Fingerprint source for the checksum strategy.
    pub fingerprint_source: FingerprintSource,
    /// Base URL of the asset store backend. Required for the checksum
    /// strategy.
    pub store_url: Option<String>,
    /// Base URL of the media resolver backend. Absent disables asset
    /// resolution (the endpoint answers 404).
    pub resolver_url: Option<String>,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = env_or("DAM_SERVICE_BIND", DEFAULT_BIND)
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                var: "DAM_SERVICE_BIND",
                reason: e.to_string(),
            })?;

        let dam_paths = std::env::var("DAM_SERVICE_PATHS")
            .map(|v| {
                v.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let data_version_strategy = env_or(
            "DAM_SERVICE_DATA_VERSION_STRATEGY",
            StrategyKind::Timestamp.as_str(),
        );

        let update_interval_secs = match std::env::var("DAM_SERVICE_UPDATE_INTERVAL_SEC") {
            Ok(v) => v.parse::<i64>().map_err(|e| ConfigError::InvalidValue {
                var: "DAM_SERVICE_UPDATE_INTERVAL_SEC",
                reason: e.to_string(),
            })?,
            Err(_) => DEFAULT_UPDATE_INTERVAL_SECS,
        };

        let fingerprint_source = match std::env::var("DAM_SERVICE_FINGERPRINT_SOURCE") {
            Ok(v) => v
                .parse::<FingerprintSource>()
                .map_err(|reason| ConfigError::InvalidValue {
                    var: "DAM_SERVICE_FINGERPRINT_SOURCE",
                    reason,
                })?,
            Err(_) => FingerprintSource::default(),
        };

        Ok(Self {
            bind_addr,
            dam_paths,
            data_version_strategy,
            update_interval_secs,
            fingerprint_source,
            store_url: non_empty_env("DAM_SERVICE_STORE_URL"),
            resolver_url: non_empty_env("DAM_SERVICE_RESOLVER_URL"),
        })
    }

    /// Registry construction parameters derived from this configuration.
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            roots: self.dam_paths.clone(),
            data_version_strategy: self.data_version_strategy.clone(),
            update_interval_secs: self.update_interval_secs,
            fingerprint_source: self.fingerprint_source,
        }
    }
}

/// Check if metrics are enabled via `DAM_SERVICE_METRICS_ENABLED`. Defaults
/// to `true` when the variable is absent or set to anything other than
/// `"false"`.
pub fn metrics_enabled() -> bool {
    std::env::var("DAM_SERVICE_METRICS_ENABLED")
        .map(|v| v.to_lowercase() != "false")
        .unwrap_or(true)
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

fn non_empty_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}
