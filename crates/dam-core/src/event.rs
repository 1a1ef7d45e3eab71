//! DAM change notifications.
//!
//! A [`ChangeEvent`] describes one modification to an asset somewhere in the
//! DAM. Events are delivered by the host wiring (an event bus subscription,
//! a webhook, a test harness), consumed once by the
//! [`VersionRegistry`](crate::VersionRegistry), and discarded. The version
//! tracking subsystem only looks at the affected path; the kind is carried
//! for logging and for hosts that need to filter before forwarding.

use serde::{Deserialize, Serialize};

/// What happened to the asset. The tracking subsystem treats all kinds
/// identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeEventKind {
    Created,
    Updated,
    Deleted,
    MetadataUpdated,
    Moved,
}

impl ChangeEventKind {
    /// Lowercase identifier, matching the wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::MetadataUpdated => "metadata_updated",
            Self::Moved => "moved",
        }
    }
}

/// A single change notification for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Absolute path of the affected asset.
    pub asset_path: String,
    /// The kind of modification.
    pub kind: ChangeEventKind,
}

impl ChangeEvent {
    pub fn new(asset_path: impl Into<String>, kind: ChangeEventKind) -> Self {
        Self {
            asset_path: asset_path.into(),
            kind,
        }
    }
}
