//! DAM asset service binary.
//!
//! Wires configuration, collaborators and the version registry together and
//! serves the HTTP surface until interrupted.

use std::sync::Arc;

use anyhow::Context;
use dam_api::config::ServiceConfig;
use dam_api::state::AppState;
use dam_client::{BackendConfig, HttpAssetStore, HttpMediaResolver, MediaResolver};
use dam_core::{AssetStore, InMemoryAssetStore, StrategyKind, VersionRegistry};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServiceConfig::from_env().context("invalid configuration")?;

    // Asset store collaborator. The checksum strategy queries it for
    // fingerprint listings, so it is a required reference there; the
    // timestamp strategy never touches it.
    let store: Arc<dyn AssetStore> = match &config.store_url {
        Some(url) => Arc::new(
            HttpAssetStore::new(BackendConfig::new(url)).context("asset store configuration")?,
        ),
        None => {
            if config.data_version_strategy == StrategyKind::Checksum.as_str() {
                anyhow::bail!(
                    "the checksum data version strategy requires DAM_SERVICE_STORE_URL"
                );
            }
            Arc::new(InMemoryAssetStore::new())
        }
    };

    let resolver: Option<Arc<dyn MediaResolver>> = match &config.resolver_url {
        Some(url) => Some(Arc::new(
            HttpMediaResolver::new(BackendConfig::new(url))
                .context("media resolver configuration")?,
        )),
        None => {
            tracing::warn!("no media resolver configured, asset resolution is disabled");
            None
        }
    };

    let registry = Arc::new(
        VersionRegistry::new(config.registry_config(), store)
            .context("data version registry construction")?,
    );

    let state = AppState::new(Arc::clone(&registry), resolver);
    let app = dam_api::app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("dam-api listening on {}", config.bind_addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    registry.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
