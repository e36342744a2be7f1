//! Testing utilities for the Cadence workspace
//!
//! Shared fixtures, a recording reminder scheduler, and engine setup
//! helpers.

#![allow(missing_docs)]

use cadence_engine::{EngineConfig, HabitEngine};
use cadence_model::{Habit, HabitDraft, HabitId, Recurrence, Reminder, ReminderTime, WeekdaySet};
use cadence_store::{AuthEvent, MemoryStore, ReminderScheduler};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::{Arc, Once};

/// Install a fmt tracing subscriber once, honoring `RUST_LOG`
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Let spawned reconciliation tasks drain their queued snapshots
pub async fn settle() {
    for _ in 0..25 {
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerCall {
    Scheduled(HabitId),
    Cancelled(HabitId),
}

/// Reminder scheduler that records every call for assertions
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    calls: Mutex<Vec<SchedulerCall>>,
}

impl RecordingScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<SchedulerCall> {
        self.calls.lock().clone()
    }

    #[must_use]
    pub fn scheduled(&self, habit_id: HabitId) -> bool {
        self.calls().contains(&SchedulerCall::Scheduled(habit_id))
    }

    #[must_use]
    pub fn cancelled(&self, habit_id: HabitId) -> bool {
        self.calls().contains(&SchedulerCall::Cancelled(habit_id))
    }
}

#[async_trait]
impl ReminderScheduler for RecordingScheduler {
    async fn schedule(&self, habit: &Habit) {
        self.calls.lock().push(SchedulerCall::Scheduled(habit.id));
    }

    async fn cancel(&self, habit_id: HabitId) {
        self.calls.lock().push(SchedulerCall::Cancelled(habit_id));
    }
}

pub fn daily_draft(name: &str) -> HabitDraft {
    HabitDraft::new(name, Recurrence::Daily)
}

pub fn weekday_draft(name: &str, days: &[u8]) -> HabitDraft {
    HabitDraft::new(
        name,
        Recurrence::SpecificWeekdays { days: WeekdaySet::from_days(days.iter().copied()) },
    )
}

pub fn reminded_draft(name: &str, hour: u8, minute: u8) -> HabitDraft {
    daily_draft(name).with_reminder(Reminder::at(ReminderTime::new(hour, minute).unwrap()))
}

/// An engine wired to an in-memory store and a recording scheduler
#[derive(Debug)]
pub struct TestHarness {
    pub engine: HabitEngine,
    pub store: Arc<MemoryStore>,
    pub scheduler: Arc<RecordingScheduler>,
}

/// Engine with collaborators but no session
#[must_use]
pub fn engine_harness() -> TestHarness {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let scheduler = Arc::new(RecordingScheduler::new());
    let engine = HabitEngine::new(EngineConfig::new(), store.clone(), scheduler.clone());
    TestHarness { engine, store, scheduler }
}

/// Engine signed in as `uid`
///
/// # Panics
/// Panics when the in-memory sign-in fails, which it does not.
pub async fn signed_in_harness(uid: &str) -> TestHarness {
    let harness = engine_harness();
    harness
        .engine
        .handle_auth_event(AuthEvent::SignedIn(uid.into()))
        .await
        .expect("sign-in against the in-memory store");
    harness
}
