//! Registry of decodable resource kinds.
//!
//! The parser only accepts documents whose group/version/kind is registered
//! here. Callers extend the registry without touching the parser.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::error::ParseError;

use super::path::FieldPath;
use super::resource::GroupVersionKind;

/// Definition of one decodable kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSpec {
    /// Group/version/kind served by this definition.
    #[serde(flatten)]
    pub gvk: GroupVersionKind,
    /// Whether resources of this kind live in a namespace.
    #[serde(default = "default_namespaced")]
    pub namespaced: bool,
    /// Fields that must be present for a document to decode.
    #[serde(default)]
    pub required: Vec<FieldPath>,
}

/// Mapping from group/version/kind to its definition.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    kinds: HashMap<GroupVersionKind, KindSpec>,
}

const fn default_namespaced() -> bool {
    true
}

/// Core `v1` kinds: (kind, namespaced).
const CORE_V1_KINDS: &[(&str, bool)] = &[
    ("ConfigMap", true),
    ("Endpoints", true),
    ("LimitRange", true),
    ("Namespace", false),
    ("PersistentVolume", false),
    ("PersistentVolumeClaim", true),
    ("Pod", true),
    ("ReplicationController", true),
    ("ResourceQuota", true),
    ("Secret", true),
    ("Service", true),
    ("ServiceAccount", true),
];

/// `apps/v1` kinds, all namespaced.
const APPS_V1_KINDS: &[&str] = &[
    "ControllerRevision",
    "DaemonSet",
    "Deployment",
    "ReplicaSet",
    "StatefulSet",
];

/// `extensions/v1beta1` kinds, all namespaced.
const EXTENSIONS_V1BETA1_KINDS: &[&str] =
    &["DaemonSet", "Deployment", "Ingress", "ReplicaSet", "Scale"];

impl KindSpec {
    /// Creates a kind definition with no required fields.
    #[must_use]
    pub const fn new(gvk: GroupVersionKind, namespaced: bool) -> Self {
        Self {
            gvk,
            namespaced,
            required: Vec::new(),
        }
    }

    /// Adds a required field.
    #[must_use]
    pub fn with_required(mut self, path: FieldPath) -> Self {
        self.required.push(path);
        self
    }
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in core, apps and extensions kinds.
    #[must_use]
    pub fn builtin() -> Self {
        let mut kinds = HashMap::new();

        let core = CORE_V1_KINDS
            .iter()
            .map(|(kind, namespaced)| {
                KindSpec::new(GroupVersionKind::new("", "v1", *kind), *namespaced)
            });
        let apps = APPS_V1_KINDS
            .iter()
            .map(|kind| KindSpec::new(GroupVersionKind::new("apps", "v1", *kind), true));
        let extensions = EXTENSIONS_V1BETA1_KINDS
            .iter()
            .map(|kind| KindSpec::new(GroupVersionKind::new("extensions", "v1beta1", *kind), true));

        for spec in core.chain(apps).chain(extensions) {
            kinds.insert(spec.gvk.clone(), spec);
        }

        Self { kinds }
    }

    /// Registers a kind.
    ///
    /// Registering an identical definition twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Setup`] if the definition is incomplete or
    /// conflicts with an existing registration.
    pub fn register(&mut self, spec: KindSpec) -> Result<(), ParseError> {
        if spec.gvk.kind.is_empty() || spec.gvk.version.is_empty() {
            return Err(ParseError::setup(format!(
                "registry entry '{}' needs both a version and a kind",
                spec.gvk
            )));
        }

        match self.kinds.get(&spec.gvk) {
            Some(existing) if *existing == spec => Ok(()),
            Some(_) => Err(ParseError::setup(format!(
                "conflicting registry entries for {}",
                spec.gvk
            ))),
            None => {
                debug!("registering kind {}", spec.gvk);
                self.kinds.insert(spec.gvk.clone(), spec);
                Ok(())
            }
        }
    }

    /// Looks up the definition for a group/version/kind.
    #[must_use]
    pub fn lookup(&self, gvk: &GroupVersionKind) -> Option<&KindSpec> {
        self.kinds.get(gvk)
    }

    /// Returns the number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
