//! Completion records
//!
//! A completion is a single instance of a habit having been performed on a
//! calendar day. Records are immutable once created; undo deletes them.

use crate::ids::{CompletionId, HabitId};
use crate::streak::DEFAULT_COMPLETION_XP;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

fn default_value() -> u32 {
    1
}

/// A habit performed on a given calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    /// Opaque id, scoped to the parent habit
    pub id: CompletionId,
    /// Owning habit
    pub habit_id: HabitId,
    /// Calendar day; time-of-day is discarded before this record exists
    pub date: NaiveDate,
    /// Numeric progress value
    #[serde(default = "default_value")]
    pub value: u32,
    /// Free-text note
    #[serde(default)]
    pub note: String,
    /// XP awarded by this record
    #[serde(default)]
    pub xp_earned: u32,
    /// Whether the day was skipped rather than performed
    #[serde(default)]
    pub is_skipped: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Completion {
    /// Create a completion record
    #[must_use]
    pub fn new(
        id: CompletionId,
        habit_id: HabitId,
        date: NaiveDate,
        options: LogOptions,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            habit_id,
            date,
            value: options.value,
            note: options.note,
            xp_earned: options.xp,
            is_skipped: false,
            created_at: now,
        }
    }

    /// Whether this record counts toward streaks and rates
    #[inline]
    #[must_use]
    pub fn counts(&self) -> bool {
        !self.is_skipped
    }
}

/// Optional inputs when logging a completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    /// Numeric progress value
    pub value: u32,
    /// Free-text note
    pub note: String,
    /// XP to award
    pub xp: u32,
}

impl LogOptions {
    /// With value
    #[inline]
    #[must_use]
    pub fn with_value(mut self, value: u32) -> Self {
        self.value = value;
        self
    }

    /// With note
    #[inline]
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// With XP award
    #[inline]
    #[must_use]
    pub fn with_xp(mut self, xp: u32) -> Self {
        self.xp = xp;
        self
    }
}

impl Default for LogOptions {
    fn default() -> Self {
        Self { value: 1, note: String::new(), xp: DEFAULT_COMPLETION_XP }
    }
}
