//! Identifier newtypes
//!
//! All record identifiers are ULIDs: opaque to callers, stable for the
//! record's lifetime, and sortable by creation instant.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique habit identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HabitId(pub Ulid);

impl HabitId {
    /// Generate new habit ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for HabitId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HabitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique completion identifier, scoped to its parent habit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompletionId(pub Ulid);

impl CompletionId {
    /// Generate new completion ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for CompletionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CompletionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable user identifier supplied by the identity collaborator
///
/// Opaque to the engine; the remote store uses it to scope every query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Wrap an identity-provider uid
    #[inline]
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    /// Borrow the raw uid
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(uid: &str) -> Self {
        Self::new(uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn habit_id_generation() {
        let id1 = HabitId::new();
        let id2 = HabitId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn completion_ids_sort_by_creation() {
        let id1 = CompletionId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = CompletionId::new();
        assert!(id1 < id2);
    }

    #[test]
    fn user_id_round_trip() {
        let uid = UserId::new("uid-1234");
        assert_eq!(uid.as_str(), "uid-1234");
        assert_eq!(uid.to_string(), "uid-1234");
    }
}
