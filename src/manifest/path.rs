//! Dotted field paths into decoded payloads.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt;

/// A path such as `metadata.annotations` addressing a mapping field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parses a dotted path. Returns `None` for empty paths or empty segments.
    #[must_use]
    pub fn parse(path: &str) -> Option<Self> {
        let segments: Vec<String> = path.split('.').map(String::from).collect();
        if segments.iter().any(String::is_empty) {
            return None;
        }
        Some(Self { segments })
    }

    /// Looks the path up in `value`.
    #[must_use]
    pub fn get<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| current.get(segment.as_str()))
    }

    /// Removes the addressed field, returning true if it existed.
    pub fn remove(&self, value: &mut Value) -> bool {
        let Some((last, parents)) = self.segments.split_last() else {
            return false;
        };

        let mut current = value;
        for segment in parents {
            match current.get_mut(segment.as_str()) {
                Some(next) => current = next,
                None => return false,
            }
        }

        current
            .as_mapping_mut()
            .is_some_and(|mapping| mapping.remove(last.as_str()).is_some())
    }
}

impl TryFrom<String> for FieldPath {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid field path '{value}'"))
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.to_string()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}
