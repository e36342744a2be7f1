//! Push-notification collaborator seam
//!
//! The engine informs the scheduler about reminder schedules when habits
//! with enabled reminders are created, updated, or deleted. Fire-and-forget:
//! no delivery confirmations come back.

use cadence_model::{Habit, HabitId};
use async_trait::async_trait;

/// Reminder scheduling collaborator
#[async_trait]
pub trait ReminderScheduler: Send + Sync + std::fmt::Debug {
    /// Schedule (or replace) the reminder for a habit
    ///
    /// Callers only invoke this for habits whose reminder is enabled and
    /// carries a time of day.
    async fn schedule(&self, habit: &Habit);

    /// Cancel any reminder scheduled for a habit
    async fn cancel(&self, habit_id: HabitId);
}

/// Scheduler that drops every request, for sessions without notifications
#[derive(Debug, Clone, Copy, Default)]
pub struct NullScheduler;

#[async_trait]
impl ReminderScheduler for NullScheduler {
    async fn schedule(&self, _habit: &Habit) {}

    async fn cancel(&self, _habit_id: HabitId) {}
}
