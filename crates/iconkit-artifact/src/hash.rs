//! Content digests for artifacts and delivered payloads
//!
//! [`ContentHash`] is the 32-byte Blake3 digest recorded for every artifact
//! read back from the engine and for the final delivered bytes.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte Blake3 digest of a byte payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Wrap raw digest bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a digest from a byte slice
    ///
    /// # Errors
    /// Returns error if slice length is not exactly 32 bytes
    #[inline]
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| HashError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Digest of `data`
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self::new(*blake3::hash(data).as_bytes())
    }

    /// First 16 hex chars, for log lines
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

/// Serialized as the 64-char hex string in every format
impl serde::Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors parsing a [`ContentHash`]
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Wrong number of digest bytes
    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Not a hex string
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_is_deterministic() {
        let a = ContentHash::compute(b"icon bytes");
        let b = ContentHash::compute(b"icon bytes");
        let c = ContentHash::compute(b"other bytes");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn display_and_parse() {
        let hash = ContentHash::compute(b"payload");
        let text = hash.to_string();
        assert_eq!(text.len(), 64);
        assert_eq!(text.parse::<ContentHash>().unwrap(), hash);
        assert_eq!(hash.short(), &text[..16]);
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        let err = ContentHash::from_slice(&[0u8; 31]).unwrap_err();
        assert!(matches!(
            err,
            HashError::InvalidLength {
                expected: 32,
                actual: 31
            }
        ));
    }

    #[test]
    fn serde_uses_hex_form() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Receipt {
            hash: ContentHash,
        }

        let receipt = Receipt {
            hash: ContentHash::compute(b"payload"),
        };
        let text = toml::to_string(&receipt).unwrap();
        assert_eq!(text.trim(), format!("hash = \"{}\"", receipt.hash));
        assert_eq!(toml::from_str::<Receipt>(&text).unwrap(), receipt);
    }

    #[test]
    fn parse_rejects_non_hex() {
        assert!(matches!(
            "zz".parse::<ContentHash>(),
            Err(HashError::InvalidHex(_))
        ));
    }
}
