//! # dam-core — Data Version Tracking for DAM Subtrees
//!
//! Maintains one opaque, cheap-to-read "data version" token per configured
//! DAM root path so that external caches can detect content changes under a
//! root without re-querying individual asset state.
//!
//! ## Moving parts
//!
//! - [`PathMatcher`] — which asset paths are governed by tracking.
//! - [`VersionStrategy`] — per-root token maintenance, either
//!   [`TimestampStrategy`] (token follows the latest notification) or
//!   [`ChecksumStrategy`] (aggregate SHA-256 over the store's fingerprint
//!   listing, recomputed in the background while stale).
//! - [`VersionRegistry`] — owns one strategy per root, routes change
//!   notifications, answers lookups, and owns the shared [`Scheduler`].
//! - [`AssetStore`] — collaborator trait the checksum strategy queries;
//!   [`InMemoryAssetStore`] backs tests and development.
//!
//! The read path (`data_version`, `handle_change_event`) is lock-light and
//! non-blocking; only background recomputation performs I/O. Token changes
//! become visible within one recomputation interval for the checksum
//! strategy and immediately for the timestamp strategy.

pub mod event;
pub mod matcher;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod strategy;

pub use event::{ChangeEvent, ChangeEventKind};
pub use matcher::PathMatcher;
pub use registry::{RegistryConfig, RegistryError, VersionRegistry, DEFAULT_DAM_PATH};
pub use scheduler::Scheduler;
pub use store::{
    AssetFingerprint, AssetStore, FingerprintSource, InMemoryAssetStore, StoreError,
};
pub use strategy::{
    ChecksumStrategy, StrategyKind, TimestampStrategy, VersionStrategy,
    DATA_VERSION_NOT_CALCULATED,
};
