//! Shared application state.

use std::sync::Arc;

use dam_client::MediaResolver;
use dam_core::VersionRegistry;

/// Handles shared by all request handlers. Cheaply cloneable; all clones
/// reference the same registry and resolver.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Data version tracking for the configured DAM roots.
    pub registry: Arc<VersionRegistry>,
    /// Media resolver collaborator. `None` when no backend is configured;
    /// the resolution endpoint then answers 404.
    pub resolver: Option<Arc<dyn MediaResolver>>,
}

impl AppState {
    pub fn new(registry: Arc<VersionRegistry>, resolver: Option<Arc<dyn MediaResolver>>) -> Self {
        Self { registry, resolver }
    }
}
