//! Typed ID definitions.

use crate::{define_id, IdError};

// =============================================================================
// Generated IDs
// =============================================================================

define_id!(RosterId, "sqd");
define_id!(AssignmentId, "asgn");
define_id!(RequestId, "req");

// =============================================================================
// Member ID
// =============================================================================

/// Identifier of a member as issued by the host application.
///
/// The format is not ours to dictate, so only the storage constraints are
/// checked: the trimmed value must be non-empty, at most
/// [`MemberId::MAX_LEN`] characters, and free of whitespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberId(String);

impl MemberId {
    /// Maximum accepted length, matching the `member_id` column.
    pub const MAX_LEN: usize = 64;

    /// Validates and wraps a host-issued member identifier.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IdError::Empty);
        }
        if s.chars().count() > Self::MAX_LEN {
            return Err(IdError::TooLong { max: Self::MAX_LEN });
        }
        if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(IdError::InvalidCharacters);
        }
        Ok(Self(s.to_string()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for MemberId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for MemberId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for MemberId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for MemberId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Tests
// =============================================================================
