//! Diff engine matching resources of two snapshots by identity.
//!
//! Each snapshot is indexed by identity key with first-wins semantics. Every
//! base resource is then classified as removed, modified or unchanged against
//! the first head resource sharing its identity, and every head resource whose
//! identity never occurs in base is added.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::{debug, info, warn};

use crate::error::{DiffError, ManifestDiffError, Side};
use crate::manifest::{Fingerprinter, Resource, ResourceCollection};

use super::compare::{DuplicatePolicy, PayloadComparator};
use super::identity::{IdentityKey, IdentityPolicy};
use super::summary::{Duplicate, Modification, Summary};

/// Engine for computing summaries between base and head snapshots.
#[derive(Debug, Clone, Default)]
pub struct DiffEngine {
    identity: IdentityPolicy,
    duplicates: DuplicatePolicy,
    comparator: PayloadComparator,
    fingerprinter: Fingerprinter,
}

/// Identity keys of one snapshot plus the position of each key's first occurrence.
struct SnapshotIndex {
    keys: Vec<IdentityKey>,
    first: HashMap<IdentityKey, usize>,
}

impl DiffEngine {
    /// Creates an engine with default policies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the identity policy.
    #[must_use]
    pub fn with_identity(mut self, identity: IdentityPolicy) -> Self {
        self.identity = identity;
        self
    }

    /// Sets the duplicate identity policy.
    #[must_use]
    pub fn with_duplicates(mut self, duplicates: DuplicatePolicy) -> Self {
        self.duplicates = duplicates;
        self
    }

    /// Sets the payload comparator.
    #[must_use]
    pub fn with_comparator(mut self, comparator: PayloadComparator) -> Self {
        self.comparator = comparator;
        self
    }

    /// Computes the summary once both collections were obtained.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::Input`] naming the first side that failed to
    /// materialise, or any error from [`DiffEngine::compute`].
    pub fn compute_from<E1, E2>(
        &self,
        base: std::result::Result<ResourceCollection, E1>,
        head: std::result::Result<ResourceCollection, E2>,
    ) -> Result<Summary, DiffError>
    where
        E1: Into<ManifestDiffError>,
        E2: Into<ManifestDiffError>,
    {
        let base = base.map_err(|e| DiffError::Input {
            side: Side::Base,
            source: Box::new(e.into()),
        })?;
        let head = head.map_err(|e| DiffError::Input {
            side: Side::Head,
            source: Box::new(e.into()),
        })?;
        self.compute(&base, &head)
    }

    /// Computes the summary between `base` and `head`.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::DuplicateIdentity`] if a snapshot repeats an
    /// identity and the duplicate policy is [`DuplicatePolicy::Reject`].
    pub fn compute(
        &self,
        base: &ResourceCollection,
        head: &ResourceCollection,
    ) -> Result<Summary, DiffError> {
        debug!(
            "Diffing {} base against {} head resource(s) by {}",
            base.len(),
            head.len(),
            self.identity
        );

        let mut summary = Summary::default();
        let base_index = self.index(base, Side::Base, &mut summary.duplicates)?;
        let head_index = self.index(head, Side::Head, &mut summary.duplicates)?;

        for (before, key) in base.iter().zip(&base_index.keys) {
            match head_index.first.get(key) {
                None => {
                    debug!("{before} was removed");
                    summary.removed.push(before.clone());
                }
                Some(&matched) => {
                    let after = &head.as_slice()[matched];
                    if let Some(modification) = self.compare(before, after) {
                        debug!("{before} was modified");
                        summary.modified.push(modification);
                    } else {
                        summary.unchanged += 1;
                    }
                }
            }
        }

        for (after, key) in head.iter().zip(&head_index.keys) {
            if !base_index.first.contains_key(key) {
                debug!("{after} was added");
                summary.added.push(after.clone());
            }
        }

        info!("{summary}");
        Ok(summary)
    }

    /// Builds the first-wins identity index of one snapshot.
    fn index(
        &self,
        resources: &ResourceCollection,
        side: Side,
        duplicates: &mut Vec<Duplicate>,
    ) -> Result<SnapshotIndex, DiffError> {
        let keys: Vec<IdentityKey> = resources.iter().map(|r| self.identity.key(r)).collect();
        let mut first = HashMap::with_capacity(keys.len());

        for (position, key) in keys.iter().enumerate() {
            match first.entry(key.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(position);
                }
                Entry::Occupied(_) => match self.duplicates {
                    DuplicatePolicy::Reject => {
                        return Err(DiffError::DuplicateIdentity {
                            side,
                            key: key.to_string(),
                        });
                    }
                    DuplicatePolicy::FirstWins => {
                        let resource = &resources.as_slice()[position];
                        warn!("Duplicate identity {key} in {side} resources: {resource}");
                        duplicates.push(Duplicate {
                            side,
                            resource: resource.clone(),
                        });
                    }
                },
            }
        }

        Ok(SnapshotIndex { keys, first })
    }

    /// Returns a modification if the payloads differ.
    fn compare(&self, before: &Resource, after: &Resource) -> Option<Modification> {
        if self.comparator.equal(before.payload(), after.payload()) {
            return None;
        }

        let before_payload = self.comparator.normalize(before.payload());
        let after_payload = self.comparator.normalize(after.payload());

        Some(Modification {
            before: before.clone(),
            after: after.clone(),
            before_fingerprint: self.fingerprinter.fingerprint(&before_payload),
            after_fingerprint: self.fingerprinter.fingerprint(&after_payload),
        })
    }
}
