//! SHA-256 digests
//!
//! Frames, decoded resources and save states are compared by digest in the
//! CLI reports and in tests.

use serde::Serialize;
use serde_json::{to_string, Value};
use sha2::{Digest, Sha256};

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    to_string(&sort_value(&v))
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(sorted.into_iter().map(|(k, v)| (k.clone(), sort_value(v))).collect())
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

/// Digest of a report, stable across field order.
pub fn report_digest<T: Serialize>(report: &T) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(report)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Digest of an 8-bit bitmap and the palette it is displayed with.
pub fn bitmap_digest(bits: &[u8], palette: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(palette);
    hasher.update(bits);
    hex::encode(hasher.finalize())
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorted() {
        let obj = json!({"z": 1, "a": {"y": 2, "b": 3}});
        assert_eq!(canonical_json(&obj).unwrap(), r#"{"a":{"b":3,"y":2},"z":1}"#);
    }

    #[test]
    fn test_sha256_known_value() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_report_digest_ignores_key_order() {
        let a = json!({"scene": "C1_01.SCN", "frames": 3});
        let b = json!({"frames": 3, "scene": "C1_01.SCN"});
        assert_eq!(report_digest(&a).unwrap(), report_digest(&b).unwrap());
    }

    #[test]
    fn test_bitmap_digest_depends_on_palette() {
        let bits = [1u8, 2, 3];
        assert_ne!(bitmap_digest(&bits, &[0; 4]), bitmap_digest(&bits, &[1; 4]));
    }
}
