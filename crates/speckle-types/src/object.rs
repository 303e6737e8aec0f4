use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Number of hash bytes retained in a fingerprint.
pub const ID_BYTES: usize = 16;

/// Content fingerprint of a serialized record.
///
/// An `ObjectId` is the first 16 bytes of the SHA-256 of a record's canonical
/// JSON (with its `id` field cleared). On the wire it is always rendered as
/// 32 lowercase hex characters. Identical records always produce the same
/// `ObjectId`, which is what lets transports de-duplicate them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; ID_BYTES]);

impl ObjectId {
    /// Create an `ObjectId` from an already truncated digest.
    pub const fn from_digest(digest: [u8; ID_BYTES]) -> Self {
        Self(digest)
    }

    /// Create an `ObjectId` from a full 32-byte digest, keeping its prefix.
    pub fn from_full_digest(digest: &[u8; 32]) -> Self {
        let mut arr = [0u8; ID_BYTES];
        arr.copy_from_slice(&digest[..ID_BYTES]);
        Self(arr)
    }

    /// The null object ID (all zeros). Represents "no object".
    pub const fn null() -> Self {
        Self([0u8; ID_BYTES])
    }

    /// Returns `true` if this is the null object ID.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; ID_BYTES]
    }

    /// The raw 16-byte digest prefix.
    pub fn as_bytes(&self) -> &[u8; ID_BYTES] {
        &self.0
    }

    /// Hex-encoded string representation (32 lowercase characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != ID_BYTES {
            return Err(TypeError::InvalidLength {
                expected: ID_BYTES,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; ID_BYTES];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; ID_BYTES]> for ObjectId {
    fn from(bytes: [u8; ID_BYTES]) -> Self {
        Self(bytes)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
