//! Decoded resource types.
//!
//! A [`Resource`] is one configuration object taken from a rendered manifest
//! stream; a [`ResourceCollection`] keeps the resources of one snapshot in
//! source order.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt;

/// Group/version/kind classification of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersionKind {
    /// API group, empty for the core group.
    #[serde(default)]
    pub group: String,
    /// API version.
    pub version: String,
    /// Kind name.
    pub kind: String,
}

/// A decoded configuration object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    gvk: GroupVersionKind,
    name: String,
    namespace: Option<String>,
    payload: Value,
}

/// Ordered resources decoded from one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceCollection {
    resources: Vec<Resource>,
}

impl GroupVersionKind {
    /// Creates a GVK from its parts.
    #[must_use]
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Splits an `apiVersion` value; `v1` is the core group, `apps/v1` is group `apps`.
    #[must_use]
    pub fn from_api_version(api_version: &str, kind: impl Into<String>) -> Self {
        let (group, version) = api_version
            .split_once('/')
            .unwrap_or(("", api_version));
        Self::new(group, version, kind)
    }

    /// Returns the `apiVersion` form (`apps/v1`, or `v1` for the core group).
    #[must_use]
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

impl Resource {
    /// Creates a resource. Cluster-scoped resources never carry a namespace.
    #[must_use]
    pub fn new(
        gvk: GroupVersionKind,
        name: impl Into<String>,
        namespace: Option<String>,
        namespaced: bool,
        payload: Value,
    ) -> Self {
        Self {
            gvk,
            name: name.into(),
            namespace: if namespaced { namespace } else { None },
            payload,
        }
    }

    /// Returns the group/version/kind.
    #[must_use]
    pub const fn gvk(&self) -> &GroupVersionKind {
        &self.gvk
    }

    /// Returns the kind name.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.gvk.kind
    }

    /// Returns `metadata.name`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `metadata.namespace` for namespaced resources.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns the full decoded document.
    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} {}/{}", self.gvk.kind, ns, self.name),
            None => write!(f, "{} {}", self.gvk.kind, self.name),
        }
    }
}

impl ResourceCollection {
    /// Creates an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            resources: Vec::new(),
        }
    }

    /// Appends a resource, keeping source order.
    pub fn push(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    /// Returns the number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if no resource was decoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Iterates resources in source order.
    pub fn iter(&self) -> std::slice::Iter<'_, Resource> {
        self.resources.iter()
    }

    /// Returns the resources as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Resource] {
        &self.resources
    }
}

impl From<Vec<Resource>> for ResourceCollection {
    fn from(resources: Vec<Resource>) -> Self {
        Self { resources }
    }
}

impl FromIterator<Resource> for ResourceCollection {
    fn from_iter<T: IntoIterator<Item = Resource>>(iter: T) -> Self {
        Self {
            resources: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ResourceCollection {
    type Item = Resource;
    type IntoIter = std::vec::IntoIter<Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResourceCollection {
    type Item = &'a Resource;
    type IntoIter = std::slice::Iter<'a, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.iter()
    }
}
