//! Multi-document manifest parser.
//!
//! Turns one rendered text stream into a [`ResourceCollection`]. Documents
//! that cannot be decoded into a registered kind are skipped; only faults that
//! make the stream unreadable as a whole are returned as errors.

use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_yaml::Value;
use std::fmt;
use tracing::{debug, info};

use crate::error::ParseError;

use super::path::FieldPath;
use super::registry::Registry;
use super::resource::{GroupVersionKind, Resource, ResourceCollection};

/// Parser decoding manifest streams against a kind registry.
#[derive(Debug, Clone)]
pub struct ManifestParser {
    registry: Registry,
}

/// Outcome of parsing one stream.
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    /// Successfully decoded resources, in source order.
    pub resources: ResourceCollection,
    /// Number of candidate documents seen (empty documents excluded, list items included).
    pub documents: usize,
    /// Number of candidate documents skipped because they did not decode.
    pub skipped: usize,
}

/// Why a single document was skipped.
#[derive(Debug)]
enum DocumentError {
    NotAMapping,
    MissingField(&'static str),
    InvalidField(&'static str),
    Unregistered(GroupVersionKind),
    MissingRequired(GroupVersionKind, FieldPath),
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAMapping => write!(f, "document is not a mapping"),
            Self::MissingField(field) => write!(f, "missing '{field}'"),
            Self::InvalidField(field) => write!(f, "'{field}' has an invalid value"),
            Self::Unregistered(gvk) => write!(f, "no kind registered for {gvk}"),
            Self::MissingRequired(gvk, path) => write!(f, "{gvk} requires '{path}'"),
        }
    }
}

impl ManifestParser {
    /// Creates a parser over the given registry.
    #[must_use]
    pub const fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Parses a stream, returning only the decoded resources.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Setup`] if the registry is empty or the stream
    /// is not well-formed YAML.
    pub fn parse(&self, content: &str) -> Result<ResourceCollection, ParseError> {
        self.parse_report(content).map(|report| report.resources)
    }

    /// Parses a stream, also counting skipped documents.
    ///
    /// # Errors
    ///
    /// Same as [`ManifestParser::parse`].
    pub fn parse_report(&self, content: &str) -> Result<ParseReport, ParseError> {
        if self.registry.is_empty() {
            return Err(ParseError::setup("registry has no registered kinds"));
        }

        check_stream(content)?;
        let mut report = ParseReport::default();

        for (index, document) in serde_yaml::Deserializer::from_str(content).enumerate() {
            let position = index + 1;
            match Value::deserialize(document) {
                Ok(value) => self.collect(value, position, &mut report),
                Err(e) => {
                    debug!("document {position}: skipped: {e}");
                    report.documents += 1;
                    report.skipped += 1;
                }
            }
        }

        info!(
            "Decoded {} resource(s) from {} document(s), skipped {}",
            report.resources.len(),
            report.documents,
            report.skipped
        );
        Ok(report)
    }

    /// Decodes one document, flattening `*List` documents into their items.
    fn collect(&self, value: Value, position: usize, report: &mut ParseReport) {
        if value.is_null() {
            return;
        }

        if let Some(items) = list_items(&value) {
            debug!("document {position}: flattening list of {} item(s)", items.len());
            for item in items.iter().cloned() {
                self.collect(item, position, report);
            }
            return;
        }

        report.documents += 1;
        match self.decode(value) {
            Ok(resource) => {
                debug!("document {position}: decoded {resource}");
                report.resources.push(resource);
            }
            Err(e) => {
                debug!("document {position}: skipped: {e}");
                report.skipped += 1;
            }
        }
    }

    fn decode(&self, value: Value) -> Result<Resource, DocumentError> {
        if !value.is_mapping() {
            return Err(DocumentError::NotAMapping);
        }

        let api_version = string_field(&value, "apiVersion")?;
        let kind = string_field(&value, "kind")?;
        let gvk = GroupVersionKind::from_api_version(api_version, kind);

        let metadata = value
            .get("metadata")
            .ok_or(DocumentError::MissingField("metadata"))?;
        if !metadata.is_mapping() {
            return Err(DocumentError::InvalidField("metadata"));
        }

        let name = string_field(metadata, "name")
            .map_err(|e| match e {
                DocumentError::MissingField(_) => DocumentError::MissingField("metadata.name"),
                _ => DocumentError::InvalidField("metadata.name"),
            })?
            .to_string();

        let namespace = match metadata.get("namespace") {
            None | Some(Value::Null) => None,
            Some(Value::String(ns)) => Some(ns.clone()),
            Some(_) => return Err(DocumentError::InvalidField("metadata.namespace")),
        };

        let spec = self
            .registry
            .lookup(&gvk)
            .ok_or_else(|| DocumentError::Unregistered(gvk.clone()))?;

        if let Some(missing) = spec.required.iter().find(|path| path.get(&value).is_none()) {
            return Err(DocumentError::MissingRequired(gvk, missing.clone()));
        }

        let namespaced = spec.namespaced;
        Ok(Resource::new(gvk, name, namespace, namespaced, value))
    }
}

impl Default for ManifestParser {
    fn default() -> Self {
        Self::new(Registry::builtin())
    }
}

/// Walks every document once to reject streams that are not well-formed YAML.
///
/// Only structural faults fail here; content errors such as duplicate mapping
/// keys are left to the per-document decode.
fn check_stream(content: &str) -> Result<(), ParseError> {
    for (index, document) in serde_yaml::Deserializer::from_str(content).enumerate() {
        IgnoredAny::deserialize(document).map_err(|e| {
            ParseError::setup(format!("malformed stream at document {}: {e}", index + 1))
        })?;
    }
    Ok(())
}

fn string_field<'a>(value: &'a Value, field: &'static str) -> Result<&'a str, DocumentError> {
    match value.get(field) {
        None | Some(Value::Null) => Err(DocumentError::MissingField(field)),
        Some(Value::String(s)) if !s.is_empty() => Ok(s.as_str()),
        Some(_) => Err(DocumentError::InvalidField(field)),
    }
}

/// Returns the `items` of a `*List` document.
fn list_items(value: &Value) -> Option<&Vec<Value>> {
    let kind = value.get("kind")?.as_str()?;
    if !kind.ends_with("List") {
        return None;
    }
    value.get("items")?.as_sequence()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::KindSpec;

    const DEPLOYMENT: &str = r"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  namespace: shop
spec:
  replicas: 2
";

    const CONFIG_MAP: &str = r"
apiVersion: v1
kind: ConfigMap
metadata:
  name: settings
data:
  mode: fast
";

    const UNKNOWN_KIND: &str = r"
apiVersion: example.com/v1
kind: Widget
metadata:
  name: gadget
";

    const NO_NAME: &str = r"
apiVersion: v1
kind: Service
metadata:
  labels:
    app: web
";

    fn join(documents: &[&str]) -> String {
        documents.join("---\n")
    }

    #[test]
    fn test_parse_multiple_documents() {
        let parser = ManifestParser::default();
        let resources = parser.parse(&join(&[DEPLOYMENT, CONFIG_MAP])).unwrap();

        assert_eq!(resources.len(), 2);
        let names: Vec<_> = resources.iter().map(Resource::name).collect();
        assert_eq!(names, ["web", "settings"]);

        let deployment = &resources.as_slice()[0];
        assert_eq!(deployment.kind(), "Deployment");
        assert_eq!(deployment.gvk().group, "apps");
        assert_eq!(deployment.namespace(), Some("shop"));
    }

    #[test]
    fn test_continue_on_error_regardless_of_position() {
        let parser = ManifestParser::default();
        let layouts = [
            vec![UNKNOWN_KIND, DEPLOYMENT, CONFIG_MAP, NO_NAME],
            vec![DEPLOYMENT, UNKNOWN_KIND, NO_NAME, CONFIG_MAP],
            vec![DEPLOYMENT, CONFIG_MAP, "just a scalar\n", UNKNOWN_KIND],
        ];

        for layout in layouts {
            let report = parser.parse_report(&join(&layout)).unwrap();
            assert_eq!(report.resources.len(), 2);
            assert_eq!(report.skipped, 2);
            assert_eq!(report.documents, 4);
        }
    }

    #[test]
    fn test_empty_documents_are_ignored() {
        let parser = ManifestParser::default();
        let report = parser.parse_report(&format!("---\n---\n{CONFIG_MAP}---\n")).unwrap();
        assert_eq!(report.resources.len(), 1);
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn test_empty_stream() {
        let parser = ManifestParser::default();
        assert!(parser.parse("").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_stream_is_setup_error() {
        let parser = ManifestParser::default();
        let result = parser.parse(&join(&[CONFIG_MAP, "key: [unclosed\n"]));
        assert!(matches!(result, Err(ParseError::Setup { .. })));
    }

    #[test]
    fn test_duplicate_keys_skip_only_that_document() {
        let parser = ManifestParser::default();
        let duplicate_keys = r"
apiVersion: v1
kind: ConfigMap
metadata:
  name: twice
data:
  k: 1
  k: 2
";
        let report = parser
            .parse_report(&join(&[DEPLOYMENT, duplicate_keys, CONFIG_MAP]))
            .unwrap();

        let names: Vec<_> = report.resources.iter().map(Resource::name).collect();
        assert_eq!(names, ["web", "settings"]);
        assert_eq!(report.documents, 3);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_malformed_stream_after_good_documents() {
        let parser = ManifestParser::default();
        let result = parser.parse(&join(&[DEPLOYMENT, CONFIG_MAP, "a: b: c\n"]));
        assert!(matches!(result, Err(ParseError::Setup { .. })));
    }

    #[test]
    fn test_empty_registry_is_setup_error() {
        let parser = ManifestParser::new(Registry::new());
        let result = parser.parse(CONFIG_MAP);
        assert!(matches!(result, Err(ParseError::Setup { .. })));
    }

    #[test]
    fn test_list_documents_are_flattened() {
        let parser = ManifestParser::default();
        let list = r"
apiVersion: v1
kind: List
items:
  - apiVersion: v1
    kind: ConfigMap
    metadata:
      name: first
  - apiVersion: v1
    kind: Secret
    metadata:
      name: second
  - apiVersion: v1
    kind: Unknown
    metadata:
      name: third
";
        let report = parser.parse_report(list).unwrap();
        let names: Vec<_> = report.resources.iter().map(Resource::name).collect();
        assert_eq!(names, ["first", "second"]);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_json_documents() {
        let parser = ManifestParser::default();
        let json = r#"{"apiVersion": "v1", "kind": "Secret", "metadata": {"name": "token"}}"#;
        let resources = parser.parse(json).unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources.as_slice()[0].kind(), "Secret");
    }

    #[test]
    fn test_cluster_scoped_namespace_dropped() {
        let parser = ManifestParser::default();
        let doc = "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: shop\n  namespace: bogus\n";
        let resources = parser.parse(doc).unwrap();
        assert_eq!(resources.as_slice()[0].namespace(), None);
    }

    #[test]
    fn test_required_fields_and_custom_kinds() {
        let mut registry = Registry::new();
        registry
            .register(
                KindSpec::new(GroupVersionKind::new("example.com", "v1", "Widget"), true)
                    .with_required(FieldPath::parse("spec.size").unwrap()),
            )
            .unwrap();
        let parser = ManifestParser::new(registry);

        let with_size =
            "apiVersion: example.com/v1\nkind: Widget\nmetadata:\n  name: a\nspec:\n  size: 3\n";
        let report = parser.parse_report(&join(&[with_size, UNKNOWN_KIND])).unwrap();

        assert_eq!(report.resources.len(), 1);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_invalid_metadata_values_skip() {
        let parser = ManifestParser::default();
        let bad_namespace = "apiVersion: v1\nkind: Pod\nmetadata:\n  name: p\n  namespace: [a]\n";
        let numeric_kind = "apiVersion: v1\nkind: 7\nmetadata:\n  name: p\n";
        let empty_name = "apiVersion: v1\nkind: Pod\nmetadata:\n  name: ''\n";

        let report = parser
            .parse_report(&join(&[bad_namespace, numeric_kind, empty_name, CONFIG_MAP]))
            .unwrap();
        assert_eq!(report.resources.len(), 1);
        assert_eq!(report.skipped, 3);
    }
}
