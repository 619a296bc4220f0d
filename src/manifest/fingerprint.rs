//! Payload fingerprinting for reports.
//!
//! This module computes deterministic SHA-256 digests of decoded payloads.
//! Mapping keys are sorted before hashing so that two payloads which compare
//! equal always share a fingerprint.

use serde_yaml::Value;
use sha2::{Digest, Sha256};

/// Hasher for payload fingerprints.
#[derive(Debug, Default, Clone, Copy)]
pub struct Fingerprinter;

impl Fingerprinter {
    /// Creates a new fingerprinter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the hex-encoded SHA-256 of the canonical form of `value`.
    #[must_use]
    pub fn fingerprint(&self, value: &Value) -> String {
        let mut encoded = Vec::new();
        encode(value, &mut encoded);
        hex::encode(Sha256::digest(&encoded))
    }

    /// Computes a short fingerprint (first 8 characters) for display purposes.
    #[must_use]
    pub fn short(&self, fingerprint: &str) -> String {
        fingerprint.chars().take(8).collect()
    }
}

/// Writes a self-delimiting canonical encoding of `value` into `out`.
fn encode(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.push(b'~'),
        Value::Bool(b) => {
            out.push(b'?');
            out.push(u8::from(*b));
        }
        Value::Number(n) => encode_bytes(b'#', n.to_string().as_bytes(), out),
        Value::String(s) => encode_bytes(b's', s.as_bytes(), out),
        Value::Sequence(items) => {
            out.push(b'[');
            out.extend_from_slice(&(items.len() as u64).to_be_bytes());
            for item in items {
                encode(item, out);
            }
        }
        Value::Mapping(mapping) => {
            // Sort entries by their encoded key for order independence
            let mut entries: Vec<(Vec<u8>, &Value)> = mapping
                .iter()
                .map(|(key, value)| {
                    let mut encoded_key = Vec::new();
                    encode(key, &mut encoded_key);
                    (encoded_key, value)
                })
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            out.push(b'{');
            out.extend_from_slice(&(entries.len() as u64).to_be_bytes());
            for (key, value) in entries {
                out.extend_from_slice(&key);
                encode(value, out);
            }
        }
        Value::Tagged(tagged) => {
            encode_bytes(b'!', tagged.tag.to_string().as_bytes(), out);
            encode(&tagged.value, out);
        }
    }
}

fn encode_bytes(marker: u8, bytes: &[u8], out: &mut Vec<u8>) {
    out.push(marker);
    out.extend_from_slice(&(bytes.len() as u64).to_be_bytes());
    out.extend_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let fingerprinter = Fingerprinter::new();
        let value = yaml("a: 1\nb: [x, y]\n");

        assert_eq!(fingerprinter.fingerprint(&value), fingerprinter.fingerprint(&value));
        assert_eq!(fingerprinter.fingerprint(&value).len(), 64);
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let fingerprinter = Fingerprinter::new();
        let first = yaml("a: 1\nb: {c: true, d: null}\n");
        let second = yaml("b: {d: null, c: true}\na: 1\n");

        assert_eq!(first, second);
        assert_eq!(fingerprinter.fingerprint(&first), fingerprinter.fingerprint(&second));
    }

    #[test]
    fn test_sequence_order_matters() {
        let fingerprinter = Fingerprinter::new();
        assert_ne!(
            fingerprinter.fingerprint(&yaml("[a, b]")),
            fingerprinter.fingerprint(&yaml("[b, a]"))
        );
    }

    #[test]
    fn test_types_are_distinguished() {
        let fingerprinter = Fingerprinter::new();
        assert_ne!(
            fingerprinter.fingerprint(&yaml("v: '1'")),
            fingerprinter.fingerprint(&yaml("v: 1"))
        );
    }

    #[test]
    fn test_short_fingerprint() {
        let fingerprinter = Fingerprinter::new();
        assert_eq!(fingerprinter.short("abcdef1234567890"), "abcdef12");
    }
}
