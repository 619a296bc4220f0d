//! Diff classification produced by the engine.

use serde::Serialize;

use crate::error::Side;
use crate::manifest::Resource;

/// Added/removed/modified classification of two snapshots.
///
/// A summary is either complete or not built at all.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    /// Head resources whose identity does not occur in base, in head order.
    pub added: Vec<Resource>,
    /// Base resources whose identity does not occur in head, in base order.
    pub removed: Vec<Resource>,
    /// Base resources differing from the first head resource sharing their
    /// identity, in base order.
    pub modified: Vec<Modification>,
    /// Later occurrences of an identity already seen in the same snapshot.
    ///
    /// Listed for visibility only; they are classified like any other resource.
    pub duplicates: Vec<Duplicate>,
    /// Number of base resources matched with an equal payload.
    pub unchanged: usize,
}

/// One resource whose payload changed.
#[derive(Debug, Clone, Serialize)]
pub struct Modification {
    /// The base version.
    pub before: Resource,
    /// The head version.
    pub after: Resource,
    /// Fingerprint of the compared base payload.
    pub before_fingerprint: String,
    /// Fingerprint of the compared head payload.
    pub after_fingerprint: String,
}

/// A resource whose identity already occurred earlier in its snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct Duplicate {
    /// Snapshot containing the duplicate.
    pub side: Side,
    /// The repeated resource.
    pub resource: Resource,
}

impl Summary {
    /// Returns true if nothing was added, removed or modified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Returns the total number of changed resources.
    #[must_use]
    pub fn total_changes(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    /// Returns the duplicates found in one snapshot.
    pub fn duplicates_in(&self, side: Side) -> impl Iterator<Item = &Resource> {
        self.duplicates
            .iter()
            .filter(move |d| d.side == side)
            .map(|d| &d.resource)
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "added {}, modified {}, removed {} resources",
            self.added.len(),
            self.modified.len(),
            self.removed.len()
        )
    }
}
