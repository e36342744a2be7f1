//! Habit registry
//!
//! Owns the set of habit definitions for the signed-in user. Commands apply
//! optimistically, issue the remote write, and roll the optimistic state
//! back when the write fails; the subscription worker reconciles
//! authoritative snapshots behind the scenes.

use crate::error::EngineError;
use crate::session::HabitEngine;
use cadence_model::{Habit, HabitDraft, HabitId, HabitPatch, Recurrence};
use chrono::Utc;

fn validate_name(name: &str) -> Result<(), EngineError> {
    if name.trim().is_empty() {
        return Err(EngineError::validation("habit name must not be empty"));
    }
    Ok(())
}

fn validate_recurrence(recurrence: &Recurrence) -> Result<(), EngineError> {
    if let Recurrence::SpecificWeekdays { days } = recurrence {
        if days.is_empty() {
            return Err(EngineError::validation(
                "specific-weekdays recurrence needs at least one weekday",
            ));
        }
    }
    Ok(())
}

impl HabitEngine {
    /// Create a habit
    ///
    /// The habit is visible to readers immediately under a temporary id;
    /// once the remote create succeeds the entry is confirmed under the
    /// authoritative id. On failure the optimistic entry is removed and no
    /// trace of the attempt remains.
    ///
    /// # Errors
    /// Validation failures before any mutation; [`EngineError::Store`] after
    /// rollback when the remote create fails.
    pub async fn create_habit(&self, draft: HabitDraft) -> Result<HabitId, EngineError> {
        let user = self.require_user()?;
        validate_name(&draft.name)?;
        validate_recurrence(&draft.recurrence)?;

        let temp_id = HabitId::new();
        let habit = Habit::from_draft(temp_id, draft, Utc::now());
        self.shared.cache.insert_provisional_habit(habit.clone());
        tracing::info!(habit = %temp_id, name = %habit.name, "creating habit");

        match self.shared.store.create_habit(&user, &habit).await {
            Ok(habit_id) => {
                let confirmed = self.shared.cache.promote_habit(temp_id, habit_id);
                self.ensure_completion_subscription(&user, habit_id);
                if let Some(confirmed) = confirmed {
                    if confirmed.reminder_active() {
                        self.shared.scheduler.schedule(&confirmed).await;
                    }
                }
                Ok(habit_id)
            }
            Err(err) => {
                self.shared.cache.remove_habit(temp_id);
                tracing::warn!(habit = %temp_id, error = %err, "habit create rolled back");
                Err(err.into())
            }
        }
    }

    /// Merge a partial edit into a habit
    ///
    /// # Errors
    /// Validation failures before any mutation; [`EngineError::UnknownHabit`]
    /// for an id the cache does not hold; [`EngineError::Store`] after the
    /// pre-mutation snapshot has been restored.
    pub async fn update_habit(&self, habit_id: HabitId, patch: HabitPatch) -> Result<(), EngineError> {
        let user = self.require_user()?;
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        if let Some(recurrence) = &patch.recurrence {
            validate_recurrence(recurrence)?;
        }

        let saved = self
            .shared
            .cache
            .habit_entry(habit_id)
            .ok_or(EngineError::UnknownHabit(habit_id))?;
        self.shared.cache.patch_habit(habit_id, &patch);

        match self.shared.store.update_habit(&user, habit_id, &patch).await {
            Ok(()) => {
                self.shared.cache.confirm_habit(habit_id);
                if patch.reminder.is_some() {
                    match self.shared.cache.habit(habit_id) {
                        Some(habit) if habit.reminder_active() => {
                            self.shared.scheduler.schedule(&habit).await;
                        }
                        _ => self.shared.scheduler.cancel(habit_id).await,
                    }
                }
                Ok(())
            }
            Err(err) => {
                self.shared.cache.replace_habit_entry(habit_id, saved);
                tracing::warn!(habit = %habit_id, error = %err, "habit update reverted");
                Err(err.into())
            }
        }
    }

    /// Flip a habit's active flag
    ///
    /// # Errors
    /// Same failure modes as [`HabitEngine::update_habit`].
    pub async fn set_habit_active(&self, habit_id: HabitId, active: bool) -> Result<(), EngineError> {
        self.update_habit(habit_id, HabitPatch::new().with_active(active)).await
    }

    /// Delete a habit and, logically, its completion records
    ///
    /// The remote cascade of the completion sub-collection is the store's
    /// responsibility and not atomic with the parent deletion.
    ///
    /// # Errors
    /// [`EngineError::UnknownHabit`] for an id the cache does not hold;
    /// [`EngineError::Store`] after the habit and its cached completions
    /// have been re-inserted.
    pub async fn delete_habit(&self, habit_id: HabitId) -> Result<(), EngineError> {
        let user = self.require_user()?;
        let removed = self
            .shared
            .cache
            .take_habit(habit_id)
            .ok_or(EngineError::UnknownHabit(habit_id))?;
        tracing::info!(habit = %habit_id, "deleting habit");

        match self.shared.store.delete_habit(&user, habit_id).await {
            Ok(()) => {
                if let Some((_, task)) = self.shared.completion_tasks.remove(&habit_id) {
                    task.abort();
                }
                self.shared.scheduler.cancel(habit_id).await;
                Ok(())
            }
            Err(err) => {
                self.shared.cache.restore_habit(removed);
                tracing::warn!(habit = %habit_id, error = %err, "habit delete reverted");
                Err(err.into())
            }
        }
    }

    /// All cached habits, creation time ascending
    ///
    /// Reflects the latest reconciled state plus any optimistic mutations;
    /// empty when signed out.
    #[must_use]
    pub fn list_habits(&self) -> Vec<Habit> {
        self.shared.cache.list_habits()
    }

    /// Active habits only, creation time ascending
    #[must_use]
    pub fn active_habits(&self) -> Vec<Habit> {
        self.shared.cache.list_habits().into_iter().filter(|h| h.is_active).collect()
    }

    /// One habit by id
    #[must_use]
    pub fn habit(&self, habit_id: HabitId) -> Option<Habit> {
        self.shared.cache.habit(habit_id)
    }

    /// Number of cached habits
    #[must_use]
    pub fn habit_count(&self) -> usize {
        self.shared.cache.list_habits().len()
    }

    /// Number of active cached habits
    #[must_use]
    pub fn active_habit_count(&self) -> usize {
        self.active_habits().len()
    }
}
