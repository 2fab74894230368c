//! Content hash identifying a torrent's payload.

use std::fmt;
use std::str::FromStr;

use data_encoding::BASE32;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::HashError;

/// Length of a v1 info-hash in bytes.
pub const HASH_LEN: usize = 20;

/// Fixed-size identifier uniquely naming a torrent's content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; HASH_LEN]);

impl ContentHash {
    /// Wrap raw hash bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw hash bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Decode a 40-character hex string.
    ///
    /// # Errors
    ///
    /// Returns an error when the input is not valid hex or has the wrong length.
    pub fn from_hex(value: &str) -> Result<Self, HashError> {
        let bytes = hex::decode(value).map_err(|_| HashError::InvalidHex)?;
        Self::from_slice(&bytes)
    }

    /// Decode a 32-character base32 string (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error when the input is not valid base32 or has the wrong length.
    pub fn from_base32(value: &str) -> Result<Self, HashError> {
        let bytes = BASE32
            .decode(value.to_ascii_uppercase().as_bytes())
            .map_err(|_| HashError::InvalidBase32)?;
        Self::from_slice(&bytes)
    }

    /// Copy a hash out of a byte slice.
    ///
    /// # Errors
    ///
    /// Returns an error when the slice is not exactly [`HASH_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashError> {
        let array: [u8; HASH_LEN] = bytes.try_into().map_err(|_| HashError::InvalidLength {
            length: bytes.len(),
        })?;
        Ok(Self(array))
    }

    /// Lowercase hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Abbreviated hex rendering for log lines.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.len() {
            40 => Self::from_hex(value),
            32 => Self::from_base32(value),
            length => Err(HashError::InvalidLength { length }),
        }
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "4344503b7e797ebf31582327a5baae35b11bda01";

    #[test]
    fn hex_and_base32_decode_to_same_hash() {
        let from_hex = ContentHash::from_hex(HEX).expect("hex hash");
        let base32 = BASE32.encode(from_hex.as_bytes());
        let from_base32 = ContentHash::from_base32(&base32.to_lowercase()).expect("base32 hash");
        assert_eq!(from_hex, from_base32);
        assert_eq!(from_hex.to_string(), HEX);
        assert_eq!(from_hex.short(), "4344503b");
    }

    #[test]
    fn parse_rejects_wrong_lengths() {
        assert!(matches!(
            "abcd".parse::<ContentHash>(),
            Err(HashError::InvalidLength { length: 4 })
        ));
        assert!(matches!(
            ContentHash::from_hex(&"zz".repeat(20)),
            Err(HashError::InvalidHex)
        ));
        assert!(matches!(
            ContentHash::from_slice(&[0_u8; 19]),
            Err(HashError::InvalidLength { length: 19 })
        ));
    }

    #[test]
    fn serde_uses_hex_string() -> Result<(), serde_json::Error> {
        let hash = ContentHash::from_bytes([0xab; HASH_LEN]);
        let json = serde_json::to_string(&hash)?;
        assert_eq!(json, format!("\"{}\"", "ab".repeat(20)));
        let back: ContentHash = serde_json::from_str(&json)?;
        assert_eq!(back, hash);
        Ok(())
    }
}
