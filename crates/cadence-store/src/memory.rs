//! In-memory remote store
//!
//! Behaves like the real document store from the engine's point of view:
//! snapshot subscriptions fire with the full result set on every mutation,
//! habit order follows creation time, and any mutating primitive can be
//! made to fail once for rollback tests.

use crate::error::StoreError;
use crate::remote::{CompletionStream, HabitStream, ProfileStream, RemoteStore};
use cadence_model::{
    Completion, CompletionId, DateRange, Habit, HabitId, HabitPatch, HabitProgress, ProfilePatch,
    UserId, UserProfile,
};
use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{BoxStream, StreamExt};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct UserState {
    habits: IndexMap<HabitId, Habit>,
    completions: HashMap<HabitId, Vec<Completion>>,
    profile: Option<UserProfile>,
}

#[derive(Debug, Default)]
struct Watchers {
    habits: Vec<(UserId, mpsc::UnboundedSender<Vec<Habit>>)>,
    completions: Vec<(UserId, HabitId, mpsc::UnboundedSender<Vec<Completion>>)>,
    profiles: Vec<(UserId, mpsc::UnboundedSender<UserProfile>)>,
}

#[derive(Debug, Default)]
struct Failures {
    create_habit: bool,
    update_habit: bool,
    update_habit_progress: bool,
    delete_habit: bool,
    create_completion: bool,
    delete_completion: bool,
    merge_profile: bool,
}

/// In-memory [`RemoteStore`] used by tests and local sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<HashMap<UserId, UserState>>,
    watchers: Mutex<Watchers>,
    failures: Mutex<Failures>,
}

impl MemoryStore {
    /// Empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `create_habit` fail with a connectivity error
    pub fn fail_next_create_habit(&self) {
        self.failures.lock().create_habit = true;
    }

    /// Make the next `update_habit` fail with a connectivity error
    pub fn fail_next_update_habit(&self) {
        self.failures.lock().update_habit = true;
    }

    /// Make the next `update_habit_progress` fail with a connectivity error
    pub fn fail_next_update_habit_progress(&self) {
        self.failures.lock().update_habit_progress = true;
    }

    /// Make the next `delete_habit` fail with a connectivity error
    pub fn fail_next_delete_habit(&self) {
        self.failures.lock().delete_habit = true;
    }

    /// Make the next `create_completion` fail with a connectivity error
    pub fn fail_next_create_completion(&self) {
        self.failures.lock().create_completion = true;
    }

    /// Make the next `delete_completion` fail with a connectivity error
    pub fn fail_next_delete_completion(&self) {
        self.failures.lock().delete_completion = true;
    }

    /// Make the next `merge_profile` fail with a connectivity error
    pub fn fail_next_merge_profile(&self) {
        self.failures.lock().merge_profile = true;
    }

    fn take_failure(&self, flag: impl FnOnce(&mut Failures) -> &mut bool) -> Result<(), StoreError> {
        let mut failures = self.failures.lock();
        let armed = flag(&mut failures);
        if *armed {
            *armed = false;
            return Err(StoreError::unavailable("injected connectivity failure"));
        }
        Ok(())
    }

    fn habit_snapshot(&self, user: &UserId) -> Vec<Habit> {
        let state = self.state.read();
        let mut habits: Vec<Habit> = state
            .get(user)
            .map(|s| s.habits.values().cloned().collect())
            .unwrap_or_default();
        habits.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        habits
    }

    fn completion_snapshot(&self, user: &UserId, habit_id: HabitId) -> Vec<Completion> {
        let state = self.state.read();
        let mut completions: Vec<Completion> = state
            .get(user)
            .and_then(|s| s.completions.get(&habit_id))
            .cloned()
            .unwrap_or_default();
        completions.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        completions
    }

    fn notify_habits(&self, user: &UserId) {
        let snapshot = self.habit_snapshot(user);
        tracing::debug!(user = %user, habits = snapshot.len(), "habit snapshot");
        let mut watchers = self.watchers.lock();
        watchers
            .habits
            .retain(|(u, tx)| u != user || tx.send(snapshot.clone()).is_ok());
    }

    fn notify_completions(&self, user: &UserId, habit_id: HabitId) {
        let snapshot = self.completion_snapshot(user, habit_id);
        let mut watchers = self.watchers.lock();
        watchers.completions.retain(|(u, h, tx)| {
            u != user || *h != habit_id || tx.send(snapshot.clone()).is_ok()
        });
    }

    fn notify_profile(&self, user: &UserId) {
        let snapshot = { self.state.read().get(user).and_then(|s| s.profile.clone()) };
        let Some(profile) = snapshot else { return };
        let mut watchers = self.watchers.lock();
        watchers
            .profiles
            .retain(|(u, tx)| u != user || tx.send(profile.clone()).is_ok());
    }
}

fn stream_from<T: Send + 'static>(rx: mpsc::UnboundedReceiver<T>) -> BoxStream<'static, T> {
    futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    })
    .boxed()
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn create_habit(&self, user: &UserId, habit: &Habit) -> Result<HabitId, StoreError> {
        self.take_failure(|f| &mut f.create_habit)?;

        let id = HabitId::new();
        {
            let mut state = self.state.write();
            let user_state = state.entry(user.clone()).or_default();
            let mut stored = habit.clone();
            stored.id = id;
            user_state.habits.insert(id, stored);
        }
        self.notify_habits(user);
        Ok(id)
    }

    async fn update_habit(
        &self,
        user: &UserId,
        habit_id: HabitId,
        patch: &HabitPatch,
    ) -> Result<(), StoreError> {
        self.take_failure(|f| &mut f.update_habit)?;

        {
            let mut state = self.state.write();
            let habit = state
                .get_mut(user)
                .and_then(|s| s.habits.get_mut(&habit_id))
                .ok_or_else(|| StoreError::not_found(format!("habits/{habit_id}")))?;
            habit.apply_patch(patch, Utc::now());
        }
        self.notify_habits(user);
        Ok(())
    }

    async fn update_habit_progress(
        &self,
        user: &UserId,
        habit_id: HabitId,
        progress: &HabitProgress,
    ) -> Result<(), StoreError> {
        self.take_failure(|f| &mut f.update_habit_progress)?;

        {
            let mut state = self.state.write();
            let habit = state
                .get_mut(user)
                .and_then(|s| s.habits.get_mut(&habit_id))
                .ok_or_else(|| StoreError::not_found(format!("habits/{habit_id}")))?;
            habit.apply_progress(progress, Utc::now());
        }
        self.notify_habits(user);
        Ok(())
    }

    async fn delete_habit(&self, user: &UserId, habit_id: HabitId) -> Result<(), StoreError> {
        self.take_failure(|f| &mut f.delete_habit)?;

        {
            let mut state = self.state.write();
            if let Some(user_state) = state.get_mut(user) {
                user_state.habits.shift_remove(&habit_id);
                user_state.completions.remove(&habit_id);
            }
        }
        self.notify_habits(user);
        self.notify_completions(user, habit_id);
        Ok(())
    }

    async fn list_habits(&self, user: &UserId) -> Result<Vec<Habit>, StoreError> {
        Ok(self.habit_snapshot(user))
    }

    async fn create_completion(
        &self,
        user: &UserId,
        completion: &Completion,
    ) -> Result<CompletionId, StoreError> {
        self.take_failure(|f| &mut f.create_completion)?;

        let habit_id = completion.habit_id;
        let id = CompletionId::new();
        {
            let mut state = self.state.write();
            let user_state = state
                .get_mut(user)
                .filter(|s| s.habits.contains_key(&habit_id))
                .ok_or_else(|| StoreError::not_found(format!("habits/{habit_id}")))?;
            let mut stored = completion.clone();
            stored.id = id;
            user_state.completions.entry(habit_id).or_default().push(stored);
        }
        self.notify_completions(user, habit_id);
        Ok(id)
    }

    async fn delete_completion(
        &self,
        user: &UserId,
        habit_id: HabitId,
        completion_id: CompletionId,
    ) -> Result<(), StoreError> {
        self.take_failure(|f| &mut f.delete_completion)?;

        {
            let mut state = self.state.write();
            let completions = state
                .get_mut(user)
                .and_then(|s| s.completions.get_mut(&habit_id))
                .ok_or_else(|| StoreError::not_found(format!("habits/{habit_id}")))?;
            let before = completions.len();
            completions.retain(|c| c.id != completion_id);
            if completions.len() == before {
                return Err(StoreError::not_found(format!(
                    "habits/{habit_id}/completions/{completion_id}"
                )));
            }
        }
        self.notify_completions(user, habit_id);
        Ok(())
    }

    async fn list_completions(
        &self,
        user: &UserId,
        habit_id: HabitId,
        range: Option<DateRange>,
    ) -> Result<Vec<Completion>, StoreError> {
        let mut completions = self.completion_snapshot(user, habit_id);
        if let Some(range) = range {
            completions.retain(|c| range.contains(c.date));
        }
        Ok(completions)
    }

    async fn fetch_profile(&self, user: &UserId) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.state.read().get(user).and_then(|s| s.profile.clone()))
    }

    async fn upsert_profile(
        &self,
        user: &UserId,
        profile: &UserProfile,
    ) -> Result<(), StoreError> {
        {
            let mut state = self.state.write();
            state.entry(user.clone()).or_default().profile = Some(profile.clone());
        }
        self.notify_profile(user);
        Ok(())
    }

    async fn merge_profile(&self, user: &UserId, patch: &ProfilePatch) -> Result<(), StoreError> {
        self.take_failure(|f| &mut f.merge_profile)?;

        {
            let mut state = self.state.write();
            let profile = state
                .get_mut(user)
                .and_then(|s| s.profile.as_mut())
                .ok_or_else(|| StoreError::not_found(format!("users/{user}")))?;
            profile.merge(patch, Utc::now());
        }
        self.notify_profile(user);
        Ok(())
    }

    fn subscribe_habits(&self, user: &UserId) -> HabitStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(self.habit_snapshot(user));
        self.watchers.lock().habits.push((user.clone(), tx));
        stream_from(rx)
    }

    fn subscribe_completions(&self, user: &UserId, habit_id: HabitId) -> CompletionStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(self.completion_snapshot(user, habit_id));
        self.watchers.lock().completions.push((user.clone(), habit_id, tx));
        stream_from(rx)
    }

    fn subscribe_profile(&self, user: &UserId) -> ProfileStream {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(profile) = self.state.read().get(user).and_then(|s| s.profile.clone()) {
            let _ = tx.send(profile);
        }
        self.watchers.lock().profiles.push((user.clone(), tx));
        stream_from(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_model::{HabitDraft, LogOptions, Recurrence};
    use chrono::{Datelike, NaiveDate};

    fn user() -> UserId {
        UserId::new("u1")
    }

    fn draft_habit() -> Habit {
        Habit::from_draft(HabitId::new(), HabitDraft::new("Read", Recurrence::Daily), Utc::now())
    }

    #[tokio::test]
    async fn create_assigns_fresh_id_and_orders_by_creation() {
        let store = MemoryStore::new();
        let first = store.create_habit(&user(), &draft_habit()).await.unwrap();
        let second = store.create_habit(&user(), &draft_habit()).await.unwrap();

        let habits = store.list_habits(&user()).await.unwrap();
        assert_eq!(habits.len(), 2);
        assert_eq!(habits[0].id, first);
        assert_eq!(habits[1].id, second);
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let store = MemoryStore::new();
        store.fail_next_create_habit();

        let err = store.create_habit(&user(), &draft_habit()).await.unwrap_err();
        assert!(err.is_transient());
        assert!(store.create_habit(&user(), &draft_habit()).await.is_ok());
    }

    #[tokio::test]
    async fn habit_subscription_delivers_initial_and_updates() {
        let store = MemoryStore::new();
        let mut stream = store.subscribe_habits(&user());

        assert_eq!(stream.next().await.unwrap().len(), 0);

        store.create_habit(&user(), &draft_habit()).await.unwrap();
        assert_eq!(stream.next().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_habit_cascades_completions() {
        let store = MemoryStore::new();
        let habit_id = store.create_habit(&user(), &draft_habit()).await.unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let completion = Completion::new(
            CompletionId::new(),
            habit_id,
            day,
            LogOptions::default(),
            Utc::now(),
        );
        store.create_completion(&user(), &completion).await.unwrap();

        store.delete_habit(&user(), habit_id).await.unwrap();
        let completions = store.list_completions(&user(), habit_id, None).await.unwrap();
        assert!(completions.is_empty());
    }

    #[tokio::test]
    async fn list_completions_filters_range_newest_first() {
        let store = MemoryStore::new();
        let habit_id = store.create_habit(&user(), &draft_habit()).await.unwrap();

        for day in [4, 6, 8] {
            let completion = Completion::new(
                CompletionId::new(),
                habit_id,
                NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
                LogOptions::default(),
                Utc::now(),
            );
            store.create_completion(&user(), &completion).await.unwrap();
        }

        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
        );
        let completions = store.list_completions(&user(), habit_id, Some(range)).await.unwrap();
        let days: Vec<u32> = completions.iter().map(|c| c.date.day()).collect();
        assert_eq!(days, vec![8, 6]);
    }

    #[tokio::test]
    async fn merge_profile_requires_existing_document() {
        let store = MemoryStore::new();
        let err = store
            .merge_profile(&user(), &ProfilePatch::new().with_total_xp(10))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        let profile = UserProfile::fresh(user(), Utc::now());
        store.upsert_profile(&user(), &profile).await.unwrap();
        store
            .merge_profile(&user(), &ProfilePatch::new().with_total_xp(10))
            .await
            .unwrap();

        let stored = store.fetch_profile(&user()).await.unwrap().unwrap();
        assert_eq!(stored.total_xp, 10);
    }
}
