//! Completion ledger
//!
//! Owns the per-habit completion records and the derived streak/XP fields
//! they drive. Logging touches three records (completion, habit, profile)
//! without a cross-record transaction: a failure partway through is
//! surfaced even though earlier remote writes committed, and
//! [`HabitEngine::repair_derived_state`] recomputes the derived fields from
//! the ledger as ground truth to heal that window.

use crate::error::EngineError;
use crate::session::{today, HabitEngine};
use cadence_model::streak::{advance_global_streak, advance_streak};
use cadence_model::{
    Completion, CompletionId, DateRange, HabitId, HabitProgress, LogOptions, ProfilePatch,
    StreakState, UserProfile,
};
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;

impl HabitEngine {
    /// Log a completion of `habit_id` on `date`
    ///
    /// The record is visible to readers immediately; the habit's streak/XP
    /// fields and the profile's XP/level/global-streak fields are advanced
    /// and written back as separate remote merges.
    ///
    /// # Errors
    /// [`EngineError::AlreadyLogged`] when the day already has a counted
    /// completion; [`EngineError::Store`] when a remote write fails — the
    /// provisional record is removed, but remote writes that already
    /// committed stay committed.
    pub async fn log_completion(
        &self,
        habit_id: HabitId,
        date: NaiveDate,
        options: LogOptions,
    ) -> Result<CompletionId, EngineError> {
        let user = self.require_user()?;
        let habit = self
            .shared
            .cache
            .habit(habit_id)
            .ok_or(EngineError::UnknownHabit(habit_id))?;

        if let Some(existing) = self.shared.cache.completion_on(habit_id, date) {
            return Err(EngineError::AlreadyLogged { habit_id, date, existing });
        }

        let xp = options.xp;
        let now = Utc::now();
        let temp_id = CompletionId::new();
        let record = Completion::new(temp_id, habit_id, date, options, now);
        self.shared.cache.insert_provisional_completion(record.clone());
        tracing::info!(habit = %habit_id, %date, xp, "logging completion");

        let completion_id = match self.shared.store.create_completion(&user, &record).await {
            Ok(id) => id,
            Err(err) => {
                self.shared.cache.remove_completion(habit_id, temp_id);
                tracing::warn!(habit = %habit_id, error = %err, "completion log rolled back");
                return Err(err.into());
            }
        };
        self.shared.cache.promote_completion(habit_id, temp_id, completion_id);

        // Habit streak/XP write-back
        let prior = StreakState {
            current: habit.current_streak,
            best: habit.best_streak,
            last_completion_date: habit.last_completion_date,
        };
        let advanced = advance_streak(&habit.recurrence, habit.created_on(), prior, date);
        let progress = HabitProgress {
            current_streak: advanced.current,
            best_streak: advanced.best,
            habit_xp: habit.habit_xp + xp,
            last_completion_date: advanced.last_completion_date,
        };
        self.shared.cache.set_habit_progress(habit_id, &progress);
        if let Err(err) = self.shared.store.update_habit_progress(&user, habit_id, &progress).await {
            self.shared.cache.set_habit_progress(habit_id, &habit.progress());
            self.shared.cache.remove_completion(habit_id, completion_id);
            tracing::warn!(habit = %habit_id, error = %err, "streak write-back failed; completion record is orphaned remotely");
            return Err(err.into());
        }

        // Profile XP/level/global-streak write-back
        let profile = self
            .shared
            .cache
            .profile()
            .unwrap_or_else(|| UserProfile::fresh(user.clone(), now));
        let global = advance_global_streak(profile.global_streak_state(), date);
        let patch = ProfilePatch::new()
            .with_total_xp(profile.total_xp + xp)
            .with_global_streak(global);
        self.shared.cache.merge_profile(&patch);
        if let Err(err) = self.shared.store.merge_profile(&user, &patch).await {
            self.shared.cache.replace_profile(Some(profile));
            self.shared.cache.remove_completion(habit_id, completion_id);
            tracing::warn!(habit = %habit_id, error = %err, "profile write-back failed; earlier writes stay committed");
            return Err(err.into());
        }

        Ok(completion_id)
    }

    /// Log a completion for today with the configured default XP
    ///
    /// # Errors
    /// Same failure modes as [`HabitEngine::log_completion`].
    pub async fn log_completion_today(&self, habit_id: HabitId) -> Result<CompletionId, EngineError> {
        let options = LogOptions::default().with_xp(self.shared.config.default_completion_xp);
        self.log_completion(habit_id, today(), options).await
    }

    /// Undo a completion
    ///
    /// Refunds the XP the record awarded. Streak fields are *not* recomputed
    /// retroactively; deleting a mid-streak record leaves them stale until
    /// [`HabitEngine::repair_derived_state`] runs.
    ///
    /// # Errors
    /// [`EngineError::UnknownCompletion`] for a record the cache does not
    /// hold; [`EngineError::Store`] after the record has been restored
    /// locally when the remote delete fails.
    pub async fn delete_completion(
        &self,
        habit_id: HabitId,
        completion_id: CompletionId,
    ) -> Result<(), EngineError> {
        let user = self.require_user()?;
        let removed = self
            .shared
            .cache
            .remove_completion(habit_id, completion_id)
            .ok_or(EngineError::UnknownCompletion(completion_id))?;
        tracing::info!(habit = %habit_id, completion = %completion_id, "deleting completion");

        if let Err(err) = self.shared.store.delete_completion(&user, habit_id, completion_id).await {
            self.shared.cache.restore_completion(removed);
            tracing::warn!(completion = %completion_id, error = %err, "completion delete reverted");
            return Err(err.into());
        }

        let xp = removed.completion.xp_earned;
        if let Some(profile) = self.shared.cache.profile() {
            let patch = ProfilePatch::new().with_total_xp(profile.total_xp.saturating_sub(xp));
            self.shared.cache.merge_profile(&patch);
            if let Err(err) = self.shared.store.merge_profile(&user, &patch).await {
                self.shared.cache.replace_profile(Some(profile));
                tracing::warn!(error = %err, "XP refund failed; completion already deleted remotely");
                return Err(err.into());
            }
        }
        Ok(())
    }

    /// A habit's cached completions, newest date first, optionally
    /// restricted to a day range
    #[must_use]
    pub fn completions_for_habit(
        &self,
        habit_id: HabitId,
        range: Option<DateRange>,
    ) -> Vec<Completion> {
        let mut completions = self.shared.cache.completions_for(habit_id);
        if let Some(range) = range {
            completions.retain(|c| range.contains(c.date));
        }
        completions
    }

    /// Number of counted completions in a day range
    #[must_use]
    pub fn completion_count(&self, habit_id: HabitId, range: DateRange) -> usize {
        self.shared
            .cache
            .completions_for(habit_id)
            .iter()
            .filter(|c| c.counts() && range.contains(c.date))
            .count()
    }

    /// Map of habit to its counted completion for today
    #[must_use]
    pub fn today_completion_set(&self) -> HashMap<HabitId, CompletionId> {
        let today = today();
        self.shared
            .cache
            .list_habits()
            .into_iter()
            .filter_map(|habit| {
                self.shared
                    .cache
                    .completion_on(habit.id, today)
                    .map(|completion_id| (habit.id, completion_id))
            })
            .collect()
    }

    /// Whether a habit has a counted completion dated today
    #[must_use]
    pub fn is_completed_today(&self, habit_id: HabitId) -> bool {
        self.shared.cache.completion_on(habit_id, today()).is_some()
    }

    /// Recompute a habit's streak/XP fields from its completion records
    ///
    /// The remote ledger is read as ground truth and replayed through the
    /// streak calculator, healing any inconsistency the non-transactional
    /// multi-record writes left behind. Best streak never decreases.
    ///
    /// # Errors
    /// [`EngineError::UnknownHabit`] for an id the cache does not hold, or
    /// the store error when the read or write-back fails.
    pub async fn repair_derived_state(&self, habit_id: HabitId) -> Result<HabitProgress, EngineError> {
        let user = self.require_user()?;
        let habit = self
            .shared
            .cache
            .habit(habit_id)
            .ok_or(EngineError::UnknownHabit(habit_id))?;

        let mut records = self.shared.store.list_completions(&user, habit_id, None).await?;
        records.retain(Completion::counts);
        let habit_xp: u32 = records.iter().map(|c| c.xp_earned).sum();

        records.sort_by(|a, b| a.date.cmp(&b.date));
        records.dedup_by_key(|c| c.date);

        let mut state = StreakState::empty();
        for record in &records {
            state = advance_streak(&habit.recurrence, habit.created_on(), state, record.date);
        }

        let progress = HabitProgress {
            current_streak: state.current,
            best_streak: state.best.max(habit.best_streak),
            habit_xp,
            last_completion_date: state.last_completion_date,
        };
        tracing::info!(
            habit = %habit_id,
            streak = progress.current_streak,
            xp = progress.habit_xp,
            "repaired derived state from completion ledger"
        );

        self.shared.cache.set_habit_progress(habit_id, &progress);
        self.shared.store.update_habit_progress(&user, habit_id, &progress).await?;
        Ok(progress)
    }
}
