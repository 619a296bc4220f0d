//! Resource identity used to match resources across snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::manifest::Resource;

/// How a resource's identity is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityPolicy {
    /// Kind, namespace and name together identify a resource.
    #[default]
    KindNamespaceName,
    /// Only the name identifies a resource; same-named resources of
    /// different kinds are matched with each other.
    Name,
}

/// Hashable identity key of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    kind: String,
    namespace: String,
    name: String,
}

impl IdentityPolicy {
    /// Derives the identity key of `resource` under this policy.
    #[must_use]
    pub fn key(self, resource: &Resource) -> IdentityKey {
        match self {
            Self::KindNamespaceName => IdentityKey {
                kind: resource.kind().to_string(),
                namespace: resource.namespace().unwrap_or_default().to_string(),
                name: resource.name().to_string(),
            },
            Self::Name => IdentityKey {
                kind: String::new(),
                namespace: String::new(),
                name: resource.name().to_string(),
            },
        }
    }
}

impl FromStr for IdentityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kind-namespace-name" => Ok(Self::KindNamespaceName),
            "name" => Ok(Self::Name),
            other => Err(format!(
                "unknown identity policy '{other}' (expected 'kind-namespace-name' or 'name')"
            )),
        }
    }
}

impl fmt::Display for IdentityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::KindNamespaceName => "kind-namespace-name",
            Self::Name => "name",
        };
        write!(f, "{s}")
    }
}

impl IdentityKey {
    /// Returns the name component.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.kind.is_empty() {
            write!(f, "{} ", self.kind)?;
        }
        if !self.namespace.is_empty() {
            write!(f, "{}/", self.namespace)?;
        }
        write!(f, "{}", self.name)
    }
}
