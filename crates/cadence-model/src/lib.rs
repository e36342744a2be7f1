//! Cadence domain model
//!
//! Pure leaf crate: the habit/completion/profile documents, the frequency
//! policy, and the streak/leveling calculators. No I/O, no async, no state.
//!
//! # Core concepts
//!
//! - [`Habit`]: a recurring activity with a [`Recurrence`] rule and derived
//!   progress fields
//! - [`Completion`]: one habit performed on one calendar day
//! - [`UserProfile`]: per-user XP/level/global-streak aggregate
//! - [`frequency`]: which days "count" for a habit
//! - [`streak`]: pure streak and level arithmetic

// Core modules
mod calendar;
mod completion;
mod habit;
mod ids;
mod profile;

// Pure calculators
pub mod frequency;
pub mod streak;

// Re-exports
pub use calendar::{last_day_of_month, weekday_index, DateRange};
pub use completion::{Completion, LogOptions};
pub use habit::{
    Habit, HabitDraft, HabitPatch, HabitProgress, IconRef, InvalidTime, Recurrence, Reminder,
    ReminderTime, WeekdaySet,
};
pub use ids::{CompletionId, HabitId, UserId};
pub use profile::{ProfilePatch, UserProfile};
pub use streak::{LevelInfo, StreakState, DEFAULT_COMPLETION_XP, XP_PER_LEVEL};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
