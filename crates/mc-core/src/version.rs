use crate::error::{McError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

const ABSENT: &str = "absent";
const HASH_HEX_LEN: usize = 64;

/// Opaque version token for a stored document.
///
/// Real versions are the SHA-256 of a document's bytes and its revision
/// nonce. A document that has never been written reports [`Version::absent`],
/// which compares unequal to every real version. Outside this crate a version
/// can only be obtained from the store, or parsed back from a token the store
/// previously handed out (HTTP/CLI round-trips).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(String);

impl Version {
    /// The version of a key that holds no document.
    pub fn absent() -> Self {
        Self(ABSENT.to_string())
    }

    pub fn is_absent(&self) -> bool {
        self.0 == ABSENT
    }

    /// Parse a token echoed back by a caller. Only shapes the store can
    /// produce are accepted.
    pub fn from_token(token: &str) -> Result<Self> {
        let well_formed = token == ABSENT
            || (token.len() == HASH_HEX_LEN
                && token.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
        if !well_formed {
            return Err(McError::InvalidVersion(token.to_string()));
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn of(content: &[u8], nonce: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((content.len() as u64).to_le_bytes());
        hasher.update(content);
        hasher.update(nonce);
        Self(format!("{:x}", hasher.finalize()))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Version {
    type Error = McError;

    fn try_from(value: String) -> Result<Self> {
        Version::from_token(&value)
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_same_version() {
        assert_eq!(Version::of(b"{}", b"n1"), Version::of(b"{}", b"n1"));
    }

    #[test]
    fn nonce_changes_version() {
        assert_ne!(Version::of(b"{}", b"n1"), Version::of(b"{}", b"n2"));
    }

    #[test]
    fn absent_never_equals_real() {
        let real = Version::of(b"", b"");
        assert!(!real.is_absent());
        assert_ne!(real, Version::absent());
    }

    #[test]
    fn token_round_trip() {
        let v = Version::of(b"[1,2]", b"rev");
        assert_eq!(Version::from_token(v.as_str()).unwrap(), v);
        assert!(Version::from_token("absent").unwrap().is_absent());
    }

    #[test]
    fn rejects_foreign_tokens() {
        for token in ["", "v7", "ABSENT", &"A".repeat(64), &"0".repeat(63)] {
            assert!(Version::from_token(token).is_err(), "accepted {token:?}");
        }
    }

    #[test]
    fn serde_validates() {
        let v = Version::of(b"x", b"y");
        let json = serde_json::to_string(&v).unwrap();
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
        assert!(serde_json::from_str::<Version>("\"v8\"").is_err());
    }
}
