use serde::{Deserialize, Serialize};

use crate::constants::MAX_USER_HASH_LEN;
use crate::error::ProtocolError;

/// Logical revision stamp. Also used as the item id at creation time.
pub type Rev = i64;

/// A user record (note). `data` is opaque to the sync layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: i64,
    pub rev: Rev,
    pub data: String,
}

impl Item {
    /// A fresh item minted at `id`; its first revision equals the id.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            rev: id,
            data: String::new(),
        }
    }

    /// Whether `other` is a strictly newer state of the same item.
    pub fn is_superseded_by(&self, other: &Item) -> bool {
        self.id == other.id && other.rev > self.rev
    }
}

// Account identifier = hex(SHA-256(username))
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct UserHash(String);

impl UserHash {
    pub fn from_username(username: &str) -> Self {
        Self(crate::keys::hash_username(username))
    }

    /// Validate an identifier received over the wire. Only ASCII
    /// alphanumerics are accepted, since it becomes an object-store key prefix.
    pub fn parse(s: &str) -> Result<Self, ProtocolError> {
        if s.is_empty()
            || s.len() > MAX_USER_HASH_LEN
            || !s.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ProtocolError::InvalidUserHash);
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(8)]
    }
}

impl std::fmt::Display for UserHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_alphanumeric() {
        let hash = UserHash::parse("abcDEF0123").unwrap();
        assert_eq!(hash.as_str(), "abcDEF0123");
        assert_eq!(hash.short(), "abcDEF01");
    }

    #[test]
    fn test_parse_rejects_path_characters() {
        for bad in ["", "../etc", "a/b", "a b", "abc_def", "ab.cd", "é"] {
            assert!(UserHash::parse(bad).is_err(), "{bad:?} should be rejected");
        }
        assert!(UserHash::parse(&"a".repeat(MAX_USER_HASH_LEN + 1)).is_err());
    }

    #[test]
    fn test_from_username_is_valid_identifier() {
        let hash = UserHash::from_username("alice@example.com");
        assert!(UserHash::parse(hash.as_str()).is_ok());
    }

    #[test]
    fn test_superseded_by_requires_same_id_and_greater_rev() {
        let a = Item {
            id: 100,
            rev: 150,
            data: "new".into(),
        };
        let b = Item {
            id: 100,
            rev: 140,
            data: "old".into(),
        };
        assert!(b.is_superseded_by(&a));
        assert!(!a.is_superseded_by(&b));
        assert!(!a.is_superseded_by(&a.clone()));
        assert!(!b.is_superseded_by(&Item { id: 7, ..a }));
    }
}
