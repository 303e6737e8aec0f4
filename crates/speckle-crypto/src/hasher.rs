use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use speckle_types::ObjectId;

/// Key holding a record's fingerprint.
pub const ID_KEY: &str = "id";
/// Key holding a record's closure table. Never part of the hashed form.
pub const CLOSURE_KEY: &str = "__closure";

/// SHA-256 content hasher over canonical JSON.
///
/// The canonical form is the compact `serde_json` encoding with object keys
/// kept in insertion order: no whitespace, integers in plain decimal, floats
/// in the shortest representation that round-trips, and strings escaped the
/// same way the emitted record is. The fingerprint is the first 16 bytes of
/// the digest.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContentHasher;

impl ContentHasher {
    /// Hash raw bytes into a fingerprint.
    pub fn hash(data: &[u8]) -> ObjectId {
        ObjectId::from_full_digest(&Self::raw_hash(data))
    }

    /// Encode a JSON value in canonical form.
    pub fn canonical_json(value: &Value) -> Result<String, HasherError> {
        serde_json::to_string(value).map_err(|e| HasherError::Serialization(e.to_string()))
    }

    /// Hash a JSON value in canonical form.
    pub fn hash_json(value: &Value) -> Result<ObjectId, HasherError> {
        Ok(Self::hash(Self::canonical_json(value)?.as_bytes()))
    }

    /// Fingerprint a record object.
    ///
    /// The record's `id` is cleared to the empty string for hashing (keeping
    /// its position) and any `__closure` is left out. The caller's map is not
    /// modified.
    pub fn fingerprint_record(record: &Map<String, Value>) -> Result<ObjectId, HasherError> {
        let mut hashed = record.clone();
        hashed.shift_remove(CLOSURE_KEY);
        if let Some(id) = hashed.get_mut(ID_KEY) {
            *id = Value::String(String::new());
        }
        Self::hash_json(&Value::Object(hashed))
    }

    /// Check that a serialized record hashes to the fingerprint it claims.
    pub fn verify_record(serialized: &str) -> Result<bool, HasherError> {
        let value: Value = serde_json::from_str(serialized)
            .map_err(|e| HasherError::Serialization(e.to_string()))?;
        let Value::Object(record) = value else {
            return Err(HasherError::NotARecord);
        };
        let claimed = match record.get(ID_KEY) {
            Some(Value::String(id)) => id.clone(),
            _ => return Err(HasherError::NotARecord),
        };
        Ok(Self::fingerprint_record(&record)?.to_hex() == claimed)
    }

    /// Verify that data produces the expected fingerprint.
    pub fn verify(data: &[u8], expected: &ObjectId) -> bool {
        Self::hash(data) == *expected
    }

    /// Full SHA-256 digest without truncation (for low-level use).
    pub fn raw_hash(data: &[u8]) -> [u8; 32] {
        Sha256::digest(data).into()
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("value is not a record object with a string id")]
    NotARecord,
}
