//! Content digest of a record's required-field projection.
//!
//! The digest is computed as follows:
//!
//! 1. The record is projected onto exactly the required field names.
//! 2. Object keys are sorted recursively; arrays keep their order.
//! 3. The result is serialized to compact JSON.
//! 4. SHA-1 is computed on the UTF-8 bytes and hex encoded (40 chars).
//!
//! The algorithm is fixed so digests stay comparable across records this
//! service writes.

use serde_json::{Map, Value};
use sha1::{Digest, Sha1};

use crate::user::Fields;

/// Project a field map onto the named keys, dropping all others.
pub fn project(fields: &Fields, required: &[String]) -> Fields {
    required
        .iter()
        .filter_map(|name| fields.get(name).map(|value| (name.clone(), value.clone())))
        .collect()
}

/// Compute the digest of `fields` restricted to `required`.
pub fn compute_digest(fields: &Fields, required: &[String]) -> String {
    digest_projection(&project(fields, required))
}

/// Compute the digest of an already projected field map.
pub fn digest_projection(projection: &Fields) -> String {
    let canonical = canonicalize(&Value::Object(projection.clone()));
    let hash = Sha1::digest(canonical.to_string().as_bytes());
    hex::encode(hash)
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by_key(|(k, _)| *k);
            let canonical: Map<String, Value> = sorted
                .into_iter()
                .map(|(k, v)| (k.clone(), canonicalize(v)))
                .collect();
            Value::Object(canonical)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
