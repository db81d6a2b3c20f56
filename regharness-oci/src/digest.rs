use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};

use crate::{OciError, Result};

/// The only algorithm the registry under test produces digests with.
pub const SHA256: &str = "sha256";

/// A content address of the form `algorithm:hex`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest {
    algorithm: String,
    hex: String,
}

impl Digest {
    /// Compute the SHA-256 digest of `data`.
    pub fn sha256(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self {
            algorithm: SHA256.to_string(),
            hex: hex_encode(&hash),
        }
    }

    /// Parse and validate a raw `algorithm:hex` string.
    pub fn parse(raw: &str) -> Result<Self> {
        let (algorithm, hex) = raw
            .split_once(':')
            .ok_or_else(|| OciError::InvalidDigest(format!("{raw:?} has no algorithm")))?;

        if algorithm.is_empty()
            || !algorithm
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+._-".contains(c))
        {
            return Err(OciError::InvalidDigest(format!(
                "{raw:?} has a malformed algorithm"
            )));
        }
        if hex.is_empty() || !hex.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')) {
            return Err(OciError::InvalidDigest(format!(
                "{raw:?} has a malformed hex part"
            )));
        }
        if algorithm == SHA256 && hex.len() != 64 {
            return Err(OciError::InvalidDigest(format!(
                "{raw:?} has {} hex characters, sha256 needs 64",
                hex.len()
            )));
        }

        Ok(Self {
            algorithm: algorithm.to_string(),
            hex: hex.to_string(),
        })
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Check that `data` hashes to this digest.
    pub fn verify(&self, data: &[u8]) -> Result<()> {
        if self.algorithm != SHA256 {
            return Err(OciError::InvalidDigest(format!(
                "cannot verify {} content",
                self.algorithm
            )));
        }
        let actual = Self::sha256(data);
        if actual.hex != self.hex {
            return Err(OciError::InvalidDigest(format!(
                "content hashes to {actual}, expected {self}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

impl FromStr for Digest {
    type Err = OciError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_empty_input() {
        let d = Digest::sha256(b"");
        assert_eq!(
            d.to_string(),
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(d.algorithm(), "sha256");
    }

    #[test]
    fn parse_accepts_computed_digest() {
        let d = Digest::sha256(b"hello world");
        let parsed = Digest::parse(&d.to_string()).unwrap();
        assert_eq!(parsed, d);
        assert!(parsed.verify(b"hello world").is_ok());
        assert!(parsed.verify(b"hello there").is_err());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Digest::parse("deadbeef").is_err());
        assert!(Digest::parse("sha256:").is_err());
        assert!(Digest::parse(":abcd").is_err());
        assert!(Digest::parse("sha256:abcd").is_err());
        assert!(Digest::parse("SHA256:abcd").is_err());
        assert!(Digest::parse("sha256:XYZ").is_err());
    }

    #[test]
    fn parse_allows_other_algorithms_of_any_length() {
        let d = Digest::parse("sha512:abcd").unwrap();
        assert_eq!(d.algorithm(), "sha512");
        assert_eq!(d.hex(), "abcd");
    }
}
