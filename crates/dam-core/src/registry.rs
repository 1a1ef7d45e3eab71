//! Version registry.
//!
//! Owns one [`VersionStrategy`] per configured root path, routes incoming
//! change notifications to the owning strategy, and answers version lookups
//! and path-validity checks for the HTTP layer. The registry also owns the
//! shared [`Scheduler`] driving checksum recomputation.

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::event::ChangeEvent;
use crate::matcher::{is_strict_descendant, PathMatcher};
use crate::scheduler::Scheduler;
use crate::store::{AssetStore, FingerprintSource};
use crate::strategy::{StrategyKind, VersionStrategy};

/// Root substituted when the configuration supplies no usable path. The
/// service then tracks exactly this subtree; an empty configuration never
/// means "match everything".
pub const DEFAULT_DAM_PATH: &str = "/content/dam";

/// Registry construction parameters, typically mapped 1:1 from service
/// configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Root paths to track. Blank entries are dropped; an empty result is
    /// replaced by [`DEFAULT_DAM_PATH`].
    pub roots: Vec<String>,
    /// Strategy selector: `"timestamp"` or `"checksum"`.
    pub data_version_strategy: String,
    /// Recomputation interval in seconds (checksum only). Not positive
    /// disables recomputation with a warning.
    pub update_interval_secs: i64,
    /// Fingerprint source for the checksum strategy.
    pub fingerprint_source: FingerprintSource,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            data_version_strategy: StrategyKind::Timestamp.as_str().to_string(),
            update_interval_secs: 120,
            fingerprint_source: FingerprintSource::default(),
        }
    }
}

/// Fatal construction failures. No partial registry is ever returned.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{0}")]
    UnknownStrategy(String),
}

/// One strategy per root, plus the routing and lookup surface.
#[derive(Debug)]
pub struct VersionRegistry {
    roots: BTreeSet<String>,
    matcher: PathMatcher,
    strategies: HashMap<String, VersionStrategy>,
    scheduler: Scheduler,
    shut_down: AtomicBool,
}

impl VersionRegistry {
    /// Build the registry: validate the root set, compile the matcher and
    /// construct one strategy per root. Fails fast on an unknown strategy
    /// selector. Must be called inside a tokio runtime (the checksum
    /// strategy schedules background work).
    pub fn new(
        config: RegistryConfig,
        store: Arc<dyn AssetStore>,
    ) -> Result<Self, RegistryError> {
        let kind = StrategyKind::from_str(&config.data_version_strategy)
            .map_err(RegistryError::UnknownStrategy)?;
        let roots = validate_roots(&config.roots);
        let matcher = PathMatcher::new(&roots);
        let scheduler = Scheduler::new();

        let strategies = roots
            .iter()
            .map(|root| {
                (
                    root.clone(),
                    VersionStrategy::new(
                        kind,
                        root.clone(),
                        config.update_interval_secs,
                        config.fingerprint_source,
                        Arc::clone(&store),
                        &scheduler,
                    ),
                )
            })
            .collect();

        tracing::info!(
            strategy = kind.as_str(),
            roots = ?roots,
            "data version tracking started"
        );

        Ok(Self {
            roots,
            matcher,
            strategies,
            scheduler,
            shut_down: AtomicBool::new(false),
        })
    }

    /// True iff the asset path is governed by version tracking, i.e. a
    /// strict descendant of a configured root.
    pub fn is_allowed_asset_path(&self, path: &str) -> bool {
        self.matcher.matches(path)
    }

    /// True iff the path is exactly one of the configured roots.
    pub fn is_allowed_root_path(&self, path: &str) -> bool {
        self.roots.contains(path)
    }

    /// Current token for a configured root, or `None` for anything else.
    pub fn data_version(&self, root_path: &str) -> Option<String> {
        self.strategies.get(root_path).map(|s| s.data_version())
    }

    /// The configured root set.
    pub fn roots(&self) -> &BTreeSet<String> {
        &self.roots
    }

    /// Route a change notification to the strategy owning its path.
    /// Notifications outside every root are dropped silently.
    pub fn handle_change_event(&self, event: &ChangeEvent) {
        if !self.is_allowed_asset_path(&event.asset_path) {
            tracing::trace!(path = %event.asset_path, "change event outside tracked roots, dropped");
            return;
        }
        if self.strategies.len() == 1 {
            // Single configured root: the matcher already proved ownership.
            if let Some(strategy) = self.strategies.values().next() {
                strategy.handle_change_event(event);
            }
            return;
        }
        // Deepest matching root wins, so nested roots resolve to the most
        // specific strategy.
        let owner = self
            .roots
            .iter()
            .filter(|root| is_strict_descendant(root, &event.asset_path))
            .max_by_key(|root| root.len());
        if let Some(root) = owner {
            if let Some(strategy) = self.strategies.get(root) {
                strategy.handle_change_event(event);
            }
        }
    }

    /// Stop background recomputation and release strategy resources.
    /// Subsequent calls are no-ops.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        for strategy in self.strategies.values() {
            strategy.shutdown();
        }
        self.scheduler.shutdown();
        tracing::info!("data version tracking stopped");
    }
}

impl Drop for VersionRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Trim configured roots, drop blanks and trailing separators, substitute
/// the default when nothing usable remains.
fn validate_roots(configured: &[String]) -> BTreeSet<String> {
    let mut roots: BTreeSet<String> = configured
        .iter()
        .map(|r| r.trim().trim_end_matches('/').to_string())
        .filter(|r| !r.is_empty())
        .collect();
    if roots.is_empty() {
        tracing::warn!(
            default = DEFAULT_DAM_PATH,
            "no DAM paths configured, falling back to the default root"
        );
        roots.insert(DEFAULT_DAM_PATH.to_string());
    }
    roots
}
