//! Implementation of the canonical record identifier.

use crate::{UuidError, UuidResult};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// MediDesk's canonical identifier (32 lowercase hex characters, no hyphens).
///
/// Once constructed, the contained UUID is guaranteed to be in canonical form, so
/// string output and sharded paths are always consistent.
///
/// # Construction
/// - [`RecordId::new`] generates a fresh identifier for a new row.
/// - [`RecordId::parse`] validates an externally supplied identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(Uuid);

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordId {
    /// Generates a new random (v4) identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be canonical.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not 32 lowercase hex characters.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "id must be 32 lowercase hex characters without hyphens, got: '{}'",
                input
            )));
        }

        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(e.to_string()))
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is in canonical form.
    ///
    /// Purely syntactic: exactly 32 bytes, all of them `0-9` or `a-f`.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Returns `parent_dir/<s1>/<s2>/<id>/` where `s1`/`s2` are the first two pairs of hex
    /// characters of this identifier.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let canonical = self.0.simple().to_string();
        let s1 = &canonical[0..2];
        let s2 = &canonical[2..4];
        parent_dir.join(s1).join(s2).join(&canonical)
    }
}

impl From<Uuid> for RecordId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RecordId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RecordId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_canonical_id() {
        let id = RecordId::new();
        let canonical = id.to_string();

        assert_eq!(canonical.len(), 32);
        assert!(RecordId::is_canonical(&canonical));
    }

    #[test]
    fn test_parse_valid_canonical_id() {
        let canonical = "550e8400e29b41d4a716446655440000";
        let id = RecordId::parse(canonical).expect("canonical id should parse");
        assert_eq!(id.to_string(), canonical);
    }

    #[test]
    fn test_parse_rejects_non_canonical_forms() {
        for input in [
            "550e8400-e29b-41d4-a716-446655440000",
            "550E8400E29B41D4A716446655440000",
            "550e8400e29b41d4a71644665544000",
            "550e8400e29b41d4a7164466554400000",
            "550e8400e29b41d4a71644665544000g",
            "",
        ] {
            assert!(
                matches!(RecordId::parse(input), Err(UuidError::InvalidInput(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_sharded_dir_structure() {
        let id = RecordId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let base = tempfile::TempDir::new().expect("Failed to create temp dir");

        let dir = id.sharded_dir(base.path());
        assert_eq!(
            dir,
            base.path()
                .join("55")
                .join("0e")
                .join("550e8400e29b41d4a716446655440000")
        );
    }

    #[test]
    fn test_from_str_matches_parse() {
        let parsed: RecordId = "550e8400e29b41d4a716446655440000".parse().unwrap();
        assert_eq!(
            parsed,
            RecordId::parse("550e8400e29b41d4a716446655440000").unwrap()
        );
        assert!("not-an-id".parse::<RecordId>().is_err());
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let id = RecordId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"550e8400e29b41d4a716446655440000\"");

        let err = serde_json::from_str::<RecordId>("\"550e8400-e29b-41d4-a716-446655440000\"");
        assert!(err.is_err(), "hyphenated ids must not deserialize");
    }
}
