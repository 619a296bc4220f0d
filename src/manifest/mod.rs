//! Manifest decoding module.
//!
//! This module turns rendered manifest text into typed resources:
//! - Resource, identity and collection types
//! - The registry of decodable kinds
//! - The tolerant multi-document parser
//! - Payload fingerprints for reporting

mod fingerprint;
mod parser;
mod path;
mod registry;
mod resource;

pub use fingerprint::Fingerprinter;
pub use parser::{ManifestParser, ParseReport};
pub use path::FieldPath;
pub use registry::{KindSpec, Registry};
pub use resource::{GroupVersionKind, Resource, ResourceCollection};
