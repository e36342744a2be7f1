//! Engine error types

use cadence_model::{CompletionId, HabitId};
use cadence_store::StoreError;
use chrono::NaiveDate;

/// Failure surfaced by a public engine operation
///
/// Validation failures are rejected before any mutation. Store failures are
/// surfaced after local optimistic state has been rolled back where a
/// rollback applies; remote writes that already committed in a multi-step
/// sequence are not undone.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Input rejected before any mutation
    #[error("validation failed: {0}")]
    Validation(String),

    /// No resolved user identity
    #[error("no authenticated user")]
    Unauthenticated,

    /// The habit does not exist in the reconciled cache
    #[error("unknown habit: {0}")]
    UnknownHabit(HabitId),

    /// The completion does not exist in the reconciled cache
    #[error("unknown completion: {0}")]
    UnknownCompletion(CompletionId),

    /// The habit already has a counted completion on that day
    #[error("habit {habit_id} already completed on {date}")]
    AlreadyLogged {
        /// Habit being logged
        habit_id: HabitId,
        /// Day that was already completed
        date: NaiveDate,
        /// The record that already covers the day
        existing: CompletionId,
    },

    /// Remote store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Validation failure with a message
    #[inline]
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether retrying the operation later could succeed
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_transient())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_tracks_store_classification() {
        assert!(EngineError::from(StoreError::unavailable("offline")).is_transient());
        assert!(!EngineError::Unauthenticated.is_transient());
        assert!(!EngineError::validation("empty name").is_transient());
    }

    #[test]
    fn display_names_the_habit() {
        let id = HabitId::new();
        let err = EngineError::UnknownHabit(id);
        assert!(err.to_string().contains(&id.to_string()));
    }
}
