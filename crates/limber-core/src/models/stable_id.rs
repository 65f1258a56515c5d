//! Cross-device record identity

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Globally unique record identifier, assigned once when a record is created
/// locally and used as the remote primary key.
///
/// Freshly generated ids are UUID v7 (time-sortable). Ids read back from the
/// remote service are accepted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StableId(String);

impl StableId {
    /// Generate a new unique id
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Borrow the id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is empty (never true for generated ids)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Default for StableId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for StableId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for StableId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let first = StableId::generate();
        let second = StableId::generate();
        assert_ne!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn generated_ids_parse_as_uuid() {
        let id = StableId::generate();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = StableId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
