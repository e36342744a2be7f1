//! Local reactive cache
//!
//! The in-process copy of the signed-in user's habits, completions, and
//! profile. Commands mutate it optimistically before remote confirmation;
//! the subscription reconciliation callbacks are the only remote-derived
//! writers. Readers project, never mutate.
//!
//! Every locally-originated mutation is tagged provisional. Reconciliation
//! treats each snapshot delivery as authoritative: confirmed entries are
//! replaced wholesale, provisional entries survive only until their
//! authoritative counterpart arrives or their age exceeds the sanity
//! timeout.

use cadence_model::{
    Completion, CompletionId, Habit, HabitId, HabitPatch, HabitProgress, ProfilePatch, UserProfile,
};
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;

/// Sync state of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryState {
    /// Locally originated, remote confirmation outstanding
    Provisional {
        /// When the optimistic mutation was applied
        inserted_at: DateTime<Utc>,
    },
    /// Matches the last authoritative snapshot
    Confirmed,
}

impl EntryState {
    fn provisional(now: DateTime<Utc>) -> Self {
        Self::Provisional { inserted_at: now }
    }

    fn keep_through_reconcile(self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match self {
            Self::Confirmed => false,
            Self::Provisional { inserted_at } => (now - inserted_at)
                .to_std()
                .map_or(true, |age| age <= ttl),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct HabitEntry {
    pub(crate) habit: Habit,
    pub(crate) state: EntryState,
}

#[derive(Debug, Clone)]
pub(crate) struct CompletionEntry {
    pub(crate) completion: Completion,
    pub(crate) state: EntryState,
}

/// A habit removed optimistically, held for rollback
#[derive(Debug, Clone)]
pub(crate) struct RemovedHabit {
    entry: HabitEntry,
    completions: Vec<CompletionEntry>,
}

/// The local reactive cache
#[derive(Debug, Default)]
pub(crate) struct LocalCache {
    habits: RwLock<IndexMap<HabitId, HabitEntry>>,
    completions: DashMap<HabitId, Vec<CompletionEntry>>,
    profile: RwLock<Option<UserProfile>>,
}

impl LocalCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Drop everything; used on sign-out
    pub(crate) fn clear(&self) {
        self.habits.write().clear();
        self.completions.clear();
        *self.profile.write() = None;
    }

    // ---- habits ----

    pub(crate) fn insert_provisional_habit(&self, habit: Habit) {
        let now = Utc::now();
        self.habits
            .write()
            .insert(habit.id, HabitEntry { habit, state: EntryState::provisional(now) });
    }

    /// Swap a provisional entry to its authoritative id and confirm it
    pub(crate) fn promote_habit(&self, temp_id: HabitId, real_id: HabitId) -> Option<Habit> {
        let mut habits = self.habits.write();
        let mut entry = habits.shift_remove(&temp_id)?;
        entry.habit.id = real_id;
        entry.state = EntryState::Confirmed;
        let habit = entry.habit.clone();
        habits.insert(real_id, entry);
        Some(habit)
    }

    pub(crate) fn remove_habit(&self, habit_id: HabitId) -> Option<HabitEntry> {
        self.habits.write().shift_remove(&habit_id)
    }

    /// Optimistically remove a habit together with its cached completions
    pub(crate) fn take_habit(&self, habit_id: HabitId) -> Option<RemovedHabit> {
        let entry = self.habits.write().shift_remove(&habit_id)?;
        let completions = self.completions.remove(&habit_id).map(|(_, v)| v).unwrap_or_default();
        Some(RemovedHabit { entry, completions })
    }

    pub(crate) fn restore_habit(&self, removed: RemovedHabit) {
        let RemovedHabit { entry, completions } = removed;
        let habit_id = entry.habit.id;
        self.habits.write().insert(habit_id, entry);
        if !completions.is_empty() {
            self.completions.insert(habit_id, completions);
        }
    }

    pub(crate) fn habit_entry(&self, habit_id: HabitId) -> Option<HabitEntry> {
        self.habits.read().get(&habit_id).cloned()
    }

    pub(crate) fn replace_habit_entry(&self, habit_id: HabitId, entry: HabitEntry) {
        self.habits.write().insert(habit_id, entry);
    }

    pub(crate) fn habit(&self, habit_id: HabitId) -> Option<Habit> {
        self.habits.read().get(&habit_id).map(|e| e.habit.clone())
    }

    /// Apply a partial edit optimistically, marking the entry provisional
    /// until the remote write confirms
    pub(crate) fn patch_habit(&self, habit_id: HabitId, patch: &HabitPatch) -> bool {
        let now = Utc::now();
        let mut habits = self.habits.write();
        let Some(entry) = habits.get_mut(&habit_id) else {
            return false;
        };
        entry.habit.apply_patch(patch, now);
        entry.state = EntryState::provisional(now);
        true
    }

    pub(crate) fn confirm_habit(&self, habit_id: HabitId) {
        if let Some(entry) = self.habits.write().get_mut(&habit_id) {
            entry.state = EntryState::Confirmed;
        }
    }

    pub(crate) fn set_habit_progress(&self, habit_id: HabitId, progress: &HabitProgress) {
        let now = Utc::now();
        if let Some(entry) = self.habits.write().get_mut(&habit_id) {
            entry.habit.apply_progress(progress, now);
        }
    }

    /// All cached habits, creation time ascending
    pub(crate) fn list_habits(&self) -> Vec<Habit> {
        let mut habits: Vec<Habit> =
            self.habits.read().values().map(|e| e.habit.clone()).collect();
        habits.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        habits
    }

    pub(crate) fn confirmed_habit_ids(&self) -> Vec<HabitId> {
        self.habits
            .read()
            .iter()
            .filter(|(_, e)| e.state == EntryState::Confirmed)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Reconcile the habit collection against an authoritative snapshot
    ///
    /// Idempotent: delivering the same snapshot twice leaves the cache
    /// unchanged.
    pub(crate) fn apply_habit_snapshot(&self, snapshot: Vec<Habit>, ttl: Duration) {
        let now = Utc::now();
        let mut sorted = snapshot;
        sorted.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let mut habits = self.habits.write();
        let mut next: IndexMap<HabitId, HabitEntry> = IndexMap::with_capacity(sorted.len());
        for habit in sorted {
            next.insert(habit.id, HabitEntry { habit, state: EntryState::Confirmed });
        }
        for (id, entry) in habits.drain(..) {
            if next.contains_key(&id) {
                continue;
            }
            if entry.state.keep_through_reconcile(now, ttl) {
                next.insert(id, entry);
            } else if entry.state != EntryState::Confirmed {
                tracing::warn!(habit = %id, "dropping aged provisional habit entry");
            }
        }
        *habits = next;
    }

    // ---- completions ----

    pub(crate) fn insert_provisional_completion(&self, completion: Completion) {
        let now = Utc::now();
        self.completions
            .entry(completion.habit_id)
            .or_default()
            .push(CompletionEntry { completion, state: EntryState::provisional(now) });
    }

    pub(crate) fn promote_completion(
        &self,
        habit_id: HabitId,
        temp_id: CompletionId,
        real_id: CompletionId,
    ) {
        if let Some(mut entries) = self.completions.get_mut(&habit_id) {
            if let Some(entry) = entries.iter_mut().find(|e| e.completion.id == temp_id) {
                entry.completion.id = real_id;
                entry.state = EntryState::Confirmed;
            }
        }
    }

    pub(crate) fn remove_completion(
        &self,
        habit_id: HabitId,
        completion_id: CompletionId,
    ) -> Option<CompletionEntry> {
        let mut entries = self.completions.get_mut(&habit_id)?;
        let index = entries.iter().position(|e| e.completion.id == completion_id)?;
        Some(entries.remove(index))
    }

    pub(crate) fn restore_completion(&self, entry: CompletionEntry) {
        self.completions
            .entry(entry.completion.habit_id)
            .or_default()
            .push(entry);
    }

    /// The counted completion covering `date`, if any
    pub(crate) fn completion_on(&self, habit_id: HabitId, date: NaiveDate) -> Option<CompletionId> {
        self.completions.get(&habit_id).and_then(|entries| {
            entries
                .iter()
                .find(|e| e.completion.counts() && e.completion.date == date)
                .map(|e| e.completion.id)
        })
    }

    /// A habit's cached completions, newest date first
    pub(crate) fn completions_for(&self, habit_id: HabitId) -> Vec<Completion> {
        let mut completions: Vec<Completion> = self
            .completions
            .get(&habit_id)
            .map(|entries| entries.iter().map(|e| e.completion.clone()).collect())
            .unwrap_or_default();
        completions.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        completions
    }

    /// Reconcile one habit's completion sub-collection against an
    /// authoritative snapshot
    pub(crate) fn apply_completion_snapshot(
        &self,
        habit_id: HabitId,
        snapshot: Vec<Completion>,
        ttl: Duration,
    ) {
        let now = Utc::now();
        let mut entries = self.completions.entry(habit_id).or_default();
        let mut next: Vec<CompletionEntry> = snapshot
            .into_iter()
            .map(|completion| CompletionEntry { completion, state: EntryState::Confirmed })
            .collect();
        for entry in entries.drain(..) {
            let superseded = next.iter().any(|n| n.completion.id == entry.completion.id);
            if !superseded && entry.state.keep_through_reconcile(now, ttl) {
                next.push(entry);
            }
        }
        *entries = next;
    }

    /// Cloned read-side view for the progress aggregator
    pub(crate) fn projection(&self) -> (Vec<Habit>, HashMap<HabitId, Vec<Completion>>) {
        let habits = self.list_habits();
        let mut completions = HashMap::with_capacity(habits.len());
        for habit in &habits {
            completions.insert(habit.id, self.completions_for(habit.id));
        }
        (habits, completions)
    }

    // ---- profile ----

    pub(crate) fn replace_profile(&self, profile: Option<UserProfile>) {
        *self.profile.write() = profile;
    }

    pub(crate) fn profile(&self) -> Option<UserProfile> {
        self.profile.read().clone()
    }

    pub(crate) fn merge_profile(&self, patch: &ProfilePatch) {
        let now = Utc::now();
        if let Some(profile) = self.profile.write().as_mut() {
            profile.merge(patch, now);
        }
    }
}
