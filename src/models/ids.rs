//! Deterministic cache keys using SHA256 hashing.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Stable key identifying one user's cached history.
///
/// Derived from the username and API token so the cache never stores either.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserKey(String);

impl UserKey {
    /// Derive the key for a username/token pair.
    pub fn derive(username: &str, token: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(username.as_bytes());
        hasher.update(b"|");
        hasher.update(token.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filename of the JSONL snapshot for this user.
    pub fn snapshot_filename(&self) -> String {
        let prefix: String = self.0.chars().take(16).collect();
        format!("{}.jsonl", prefix)
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserKey({})", self.0)
    }
}

impl From<&str> for UserKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_key_deterministic() {
        let k1 = UserKey::derive("jaina", "s3cret");
        let k2 = UserKey::derive("jaina", "s3cret");
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_user_key_different_inputs() {
        assert_ne!(
            UserKey::derive("jaina", "s3cret"),
            UserKey::derive("thrall", "s3cret")
        );
        // The separator keeps ("ab", "c") and ("a", "bc") apart
        assert_ne!(UserKey::derive("ab", "c"), UserKey::derive("a", "bc"));
    }

    #[test]
    fn test_user_key_hex_format() {
        let key = UserKey::derive("jaina", "s3cret");
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!key.as_str().contains("jaina"));
    }

    #[test]
    fn test_snapshot_filename() {
        let key = UserKey::derive("jaina", "s3cret");
        let name = key.snapshot_filename();
        assert_eq!(name.len(), 16 + ".jsonl".len());
        assert!(key.as_str().starts_with(name.trim_end_matches(".jsonl")));
    }

    #[test]
    fn test_snapshot_filename_multibyte_key() {
        let key = UserKey::from("ééééééééééééééééé");
        assert_eq!(key.snapshot_filename(), format!("{}.jsonl", "é".repeat(16)));

        let short = UserKey::from("abc");
        assert_eq!(short.snapshot_filename(), "abc.jsonl");
    }

    #[test]
    fn test_user_key_serialization() {
        let key = UserKey::derive("jaina", "s3cret");
        let json = serde_json::to_string(&key).unwrap();
        let back: UserKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, back);
    }

    #[test]
    fn test_user_key_debug() {
        let key = UserKey::from("abc123");
        assert_eq!(format!("{:?}", key), "UserKey(abc123)");
    }
}
