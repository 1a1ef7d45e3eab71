//! Root path matching.
//!
//! Decides whether an asset path is governed by version tracking. A path is
//! governed iff it is a *strict descendant* of one of the configured roots:
//! `root + "/" + anything`. The root itself is never a descendant match —
//! that distinction separates "asset path" checks from "root path" checks.
//!
//! Roots are compared literally, so configured values can never inject
//! pattern syntax.

use std::collections::BTreeSet;

/// Read-only matcher compiled from the configured root set.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    roots: Vec<String>,
}

impl PathMatcher {
    /// Build a matcher over the given roots. The root set is expected to be
    /// already validated (non-empty, no blank entries).
    pub fn new(roots: &BTreeSet<String>) -> Self {
        Self {
            roots: roots.iter().cloned().collect(),
        }
    }

    /// True iff `path` is a strict descendant of some configured root.
    ///
    /// An empty path never matches. An exact root path never matches.
    pub fn matches(&self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }
        self.roots.iter().any(|root| is_strict_descendant(root, path))
    }
}

/// `path` extends `root` with a `/` separator. `"/a/b"` is a strict
/// descendant of `"/a"`, while `"/a"` and `"/ab/c"` are not.
pub(crate) fn is_strict_descendant(root: &str, path: &str) -> bool {
    path.strip_prefix(root)
        .is_some_and(|rest| rest.starts_with('/'))
}
