//! Payload equality used to detect modified resources.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt;
use std::str::FromStr;

use crate::manifest::FieldPath;

/// What to do when one snapshot holds the same identity more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Matches resolve to the first occurrence; later ones are also listed as duplicates.
    #[default]
    FirstWins,
    /// Any duplicate fails the diff.
    Reject,
}

/// Deep structural equality over decoded payloads.
///
/// Mapping key order is not significant, sequence order is. Fields listed in
/// `ignored` are removed from both sides before comparing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadComparator {
    ignored: Vec<FieldPath>,
}

impl PayloadComparator {
    /// Creates a comparator ignoring the given fields.
    #[must_use]
    pub const fn new(ignored: Vec<FieldPath>) -> Self {
        Self { ignored }
    }

    /// Returns the ignored fields.
    #[must_use]
    pub fn ignored(&self) -> &[FieldPath] {
        &self.ignored
    }

    /// Returns true if both payloads are equal once ignored fields are dropped.
    #[must_use]
    pub fn equal(&self, a: &Value, b: &Value) -> bool {
        if self.ignored.is_empty() {
            return a == b;
        }
        self.normalize(a) == self.normalize(b)
    }

    /// Returns a copy of `value` with ignored fields removed.
    #[must_use]
    pub fn normalize(&self, value: &Value) -> Value {
        let mut normalized = value.clone();
        for path in &self.ignored {
            path.remove(&mut normalized);
        }
        normalized
    }
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first-wins" => Ok(Self::FirstWins),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "unknown duplicate policy '{other}' (expected 'first-wins' or 'reject')"
            )),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FirstWins => "first-wins",
            Self::Reject => "reject",
        };
        write!(f, "{s}")
    }
}
