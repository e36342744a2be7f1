//! Engine instance and session lifecycle
//!
//! One [`HabitEngine`] per logical session: it owns its cache and its
//! subscription handles, so UI layers get an explicitly constructed instance
//! instead of process-wide mutable stores. Sign-in establishes the remote
//! subscriptions; sign-out tears every one of them down and clears the
//! cache.

use crate::cache::LocalCache;
use crate::config::EngineConfig;
use crate::error::EngineError;
use cadence_model::{HabitId, LevelInfo, UserId, UserProfile};
use cadence_store::{AuthEvent, ReminderScheduler, RemoteStore};
use chrono::{Local, NaiveDate, Utc};
use dashmap::DashMap;
use futures::StreamExt;
use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Today as a local calendar day; the normalization boundary for
/// time-of-day-carrying inputs
#[inline]
#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Debug)]
struct Session {
    id: Uuid,
    user: UserId,
    habit_task: JoinHandle<()>,
    profile_task: JoinHandle<()>,
}

#[derive(Debug)]
pub(crate) struct EngineShared {
    pub(crate) config: EngineConfig,
    pub(crate) store: Arc<dyn RemoteStore>,
    pub(crate) scheduler: Arc<dyn ReminderScheduler>,
    pub(crate) cache: LocalCache,
    session: RwLock<Option<Session>>,
    pub(crate) completion_tasks: DashMap<HabitId, JoinHandle<()>>,
}

/// The habit progress tracking and synchronization engine
///
/// All operations are asynchronous tasks on one logical thread of control;
/// the cache is only ever mutated by commands and by the reconciliation
/// callbacks, so readers see optimistic state immediately and authoritative
/// state eventually.
#[derive(Debug)]
pub struct HabitEngine {
    pub(crate) shared: Arc<EngineShared>,
}

impl HabitEngine {
    /// Create an engine over the given collaborators
    #[must_use]
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn RemoteStore>,
        scheduler: Arc<dyn ReminderScheduler>,
    ) -> Self {
        Self {
            shared: Arc::new(EngineShared {
                config,
                store,
                scheduler,
                cache: LocalCache::new(),
                session: RwLock::new(None),
                completion_tasks: DashMap::new(),
            }),
        }
    }

    /// React to an identity collaborator event
    ///
    /// # Errors
    /// Returns the store error when the initial sign-in fetch fails; the
    /// engine is left signed out in that case.
    pub async fn handle_auth_event(&self, event: AuthEvent) -> Result<(), EngineError> {
        match event {
            AuthEvent::SignedIn(user) => self.sign_in(user).await,
            AuthEvent::SignedOut => {
                self.sign_out();
                Ok(())
            }
        }
    }

    /// The signed-in user, if any
    #[must_use]
    pub fn current_user(&self) -> Option<UserId> {
        self.shared.session.read().as_ref().map(|s| s.user.clone())
    }

    /// The cached user profile, if signed in and reconciled
    #[must_use]
    pub fn profile(&self) -> Option<UserProfile> {
        self.shared.cache.profile()
    }

    /// Level breakdown for the cached profile; level 1 with zero XP when no
    /// profile is cached
    #[must_use]
    pub fn level_info(&self) -> LevelInfo {
        let total_xp = self.shared.cache.profile().map_or(0, |p| p.total_xp);
        cadence_model::streak::level_info(total_xp)
    }

    /// Re-fetch habits, completions, and the profile from the store
    ///
    /// Screen-focus refresh hint: cheap way for a UI to make sure the cache
    /// reflects remote state without waiting for the next snapshot delivery.
    ///
    /// # Errors
    /// [`EngineError::Unauthenticated`] without a session, or the store
    /// error when a fetch fails.
    pub async fn refresh(&self) -> Result<(), EngineError> {
        let user = self.require_user()?;
        let ttl = self.shared.config.provisional_ttl;

        let habits = self.shared.store.list_habits(&user).await?;
        self.shared.cache.apply_habit_snapshot(habits, ttl);

        for habit_id in self.shared.cache.confirmed_habit_ids() {
            let completions = self.shared.store.list_completions(&user, habit_id, None).await?;
            self.shared.cache.apply_completion_snapshot(habit_id, completions, ttl);
        }

        if let Some(profile) = self.shared.store.fetch_profile(&user).await? {
            self.shared.cache.replace_profile(Some(profile));
        }
        Ok(())
    }

    pub(crate) fn require_user(&self) -> Result<UserId, EngineError> {
        self.current_user().ok_or(EngineError::Unauthenticated)
    }

    async fn sign_in(&self, user: UserId) -> Result<(), EngineError> {
        // A second sign-in replaces the active session
        self.sign_out();

        let result = self.establish_session(user).await;
        if result.is_err() {
            // A half-primed cache must not outlive the failed sign-in
            self.teardown();
        }
        result
    }

    async fn establish_session(&self, user: UserId) -> Result<(), EngineError> {
        let session_id = Uuid::new_v4();
        tracing::info!(session = %session_id, user = %user, "signing in");

        // Profile exists from the first session onward
        let profile = match self.shared.store.fetch_profile(&user).await? {
            Some(profile) => profile,
            None => {
                let fresh = UserProfile::fresh(user.clone(), Utc::now());
                self.shared.store.upsert_profile(&user, &fresh).await?;
                fresh
            }
        };
        self.shared.cache.replace_profile(Some(profile));

        // Prime the cache before subscriptions take over
        let ttl = self.shared.config.provisional_ttl;
        let habits = self.shared.store.list_habits(&user).await?;
        self.shared.cache.apply_habit_snapshot(habits, ttl);
        for habit_id in self.shared.cache.confirmed_habit_ids() {
            let completions = self.shared.store.list_completions(&user, habit_id, None).await?;
            self.shared.cache.apply_completion_snapshot(habit_id, completions, ttl);
            self.ensure_completion_subscription(&user, habit_id);
        }

        let habit_task = spawn_habit_worker(&self.shared, user.clone());
        let profile_task = spawn_profile_worker(&self.shared, user.clone());

        *self.shared.session.write() = Some(Session {
            id: session_id,
            user,
            habit_task,
            profile_task,
        });
        Ok(())
    }

    fn sign_out(&self) {
        let Some(session) = self.shared.session.write().take() else {
            return;
        };
        tracing::info!(session = %session.id, user = %session.user, "signing out");

        session.habit_task.abort();
        session.profile_task.abort();
        self.teardown();
    }

    fn teardown(&self) {
        for entry in self.shared.completion_tasks.iter() {
            entry.value().abort();
        }
        self.shared.completion_tasks.clear();
        self.shared.cache.clear();
    }

    /// Start reconciling one habit's completion sub-collection, if not
    /// already doing so
    pub(crate) fn ensure_completion_subscription(&self, user: &UserId, habit_id: HabitId) {
        ensure_completion_subscription(&self.shared, user, habit_id);
    }
}

impl Drop for HabitEngine {
    fn drop(&mut self) {
        self.sign_out();
    }
}

fn ensure_completion_subscription(shared: &Arc<EngineShared>, user: &UserId, habit_id: HabitId) {
    if shared.completion_tasks.contains_key(&habit_id) {
        return;
    }
    let mut stream = shared.store.subscribe_completions(user, habit_id);
    let weak = Arc::downgrade(shared);
    let handle = tokio::spawn(async move {
        while let Some(snapshot) = stream.next().await {
            let Some(shared) = weak.upgrade() else { break };
            shared
                .cache
                .apply_completion_snapshot(habit_id, snapshot, shared.config.provisional_ttl);
        }
    });
    shared.completion_tasks.insert(habit_id, handle);
}

fn spawn_habit_worker(shared: &Arc<EngineShared>, user: UserId) -> JoinHandle<()> {
    let mut stream = shared.store.subscribe_habits(&user);
    let weak: Weak<EngineShared> = Arc::downgrade(shared);
    tokio::spawn(async move {
        while let Some(snapshot) = stream.next().await {
            let Some(shared) = weak.upgrade() else { break };
            tracing::debug!(habits = snapshot.len(), "reconciling habit snapshot");
            shared.cache.apply_habit_snapshot(snapshot, shared.config.provisional_ttl);

            // Keep one completion subscription per confirmed habit
            let confirmed = shared.cache.confirmed_habit_ids();
            for habit_id in &confirmed {
                ensure_completion_subscription(&shared, &user, *habit_id);
            }
            shared.completion_tasks.retain(|habit_id, handle| {
                if confirmed.contains(habit_id) {
                    true
                } else {
                    handle.abort();
                    false
                }
            });
        }
    })
}

fn spawn_profile_worker(shared: &Arc<EngineShared>, user: UserId) -> JoinHandle<()> {
    let mut stream = shared.store.subscribe_profile(&user);
    let weak: Weak<EngineShared> = Arc::downgrade(shared);
    tokio::spawn(async move {
        while let Some(profile) = stream.next().await {
            let Some(shared) = weak.upgrade() else { break };
            shared.cache.replace_profile(Some(profile));
        }
    })
}
