//! Session lifecycle and synchronization tests: profile bootstrap, snapshot
//! reconciliation, refresh, and sign-out teardown.

use anyhow::Result;
use cadence_model::{Habit, HabitDraft, HabitId, Recurrence, UserId};
use cadence_store::{AuthEvent, RemoteStore};
use cadence_test_utils::{daily_draft, settle, signed_in_harness};
use chrono::Utc;

#[tokio::test]
async fn first_sign_in_creates_a_zeroed_profile() -> Result<()> {
    let h = signed_in_harness("u1").await;

    let profile = h.engine.profile().expect("profile cached at sign-in");
    assert_eq!(profile.total_xp, 0);
    assert_eq!(profile.level, 1);

    let stored = h.store.fetch_profile(&UserId::new("u1")).await?;
    assert!(stored.is_some());
    Ok(())
}

#[tokio::test]
async fn sign_out_clears_all_cached_state() -> Result<()> {
    let h = signed_in_harness("u1").await;
    let habit_id = h.engine.create_habit(daily_draft("Read")).await?;
    h.engine.log_completion_today(habit_id).await?;

    h.engine.handle_auth_event(AuthEvent::SignedOut).await?;

    assert!(h.engine.list_habits().is_empty());
    assert!(h.engine.completions_for_habit(habit_id, None).is_empty());
    assert!(h.engine.profile().is_none());
    assert!(h.engine.current_user().is_none());
    assert!(h.engine.today_completion_set().is_empty());

    // The remote copies are untouched
    let remote = h.store.list_habits(&UserId::new("u1")).await?;
    assert_eq!(remote.len(), 1);
    Ok(())
}

#[tokio::test]
async fn commands_fail_after_sign_out() -> Result<()> {
    let h = signed_in_harness("u1").await;
    let habit_id = h.engine.create_habit(daily_draft("Read")).await?;

    h.engine.handle_auth_event(AuthEvent::SignedOut).await?;

    let err = h.engine.log_completion_today(habit_id).await.unwrap_err();
    assert!(matches!(err, cadence_engine::EngineError::Unauthenticated));
    Ok(())
}

#[tokio::test]
async fn second_sign_in_resyncs_remote_state() -> Result<()> {
    let h = signed_in_harness("u1").await;
    let habit_id = h.engine.create_habit(daily_draft("Read")).await?;
    h.engine.log_completion_today(habit_id).await?;
    let xp_before = h.engine.profile().unwrap().total_xp;

    h.engine.handle_auth_event(AuthEvent::SignedOut).await?;
    h.engine.handle_auth_event(AuthEvent::SignedIn(UserId::new("u1"))).await?;

    assert_eq!(h.engine.list_habits().len(), 1);
    assert_eq!(h.engine.completions_for_habit(habit_id, None).len(), 1);
    assert_eq!(h.engine.profile().unwrap().total_xp, xp_before);
    assert!(h.engine.is_completed_today(habit_id));
    Ok(())
}

#[tokio::test]
async fn out_of_band_habit_changes_are_reconciled() -> Result<()> {
    let h = signed_in_harness("u1").await;
    let user = UserId::new("u1");

    // Another writer creates a habit directly in the store
    let external = Habit::from_draft(
        HabitId::new(),
        HabitDraft::new("External", Recurrence::Daily),
        Utc::now(),
    );
    let external_id = h.store.create_habit(&user, &external).await?;

    settle().await;
    let habits = h.engine.list_habits();
    assert_eq!(habits.len(), 1);
    assert_eq!(habits[0].id, external_id);
    Ok(())
}

#[tokio::test]
async fn new_habits_get_completion_subscriptions() -> Result<()> {
    let h = signed_in_harness("u1").await;
    let user = UserId::new("u1");
    let habit_id = h.engine.create_habit(daily_draft("Read")).await?;

    // A completion written by another device shows up via reconciliation
    let external = cadence_model::Completion::new(
        cadence_model::CompletionId::new(),
        habit_id,
        cadence_engine::today(),
        cadence_model::LogOptions::default(),
        Utc::now(),
    );
    h.store.create_completion(&user, &external).await?;

    settle().await;
    assert_eq!(h.engine.completions_for_habit(habit_id, None).len(), 1);
    assert!(h.engine.is_completed_today(habit_id));
    Ok(())
}

#[tokio::test]
async fn repeated_snapshot_delivery_is_idempotent() -> Result<()> {
    let h = signed_in_harness("u1").await;
    let habit_id = h.engine.create_habit(daily_draft("Read")).await?;
    h.engine.log_completion_today(habit_id).await?;
    settle().await;

    let habits_before = h.engine.list_habits();
    let progress_before = h.engine.user_progress();

    // refresh() re-applies full authoritative snapshots over the same state
    h.engine.refresh().await?;
    h.engine.refresh().await?;
    settle().await;

    assert_eq!(h.engine.list_habits(), habits_before);
    assert_eq!(h.engine.user_progress(), progress_before);
    assert_eq!(h.engine.completions_for_habit(habit_id, None).len(), 1);
    Ok(())
}

#[tokio::test]
async fn refresh_pulls_remote_profile_changes() -> Result<()> {
    let h = signed_in_harness("u1").await;
    let user = UserId::new("u1");

    let mut profile = h.store.fetch_profile(&user).await?.unwrap();
    profile.total_xp = 750;
    profile.level = 2;
    h.store.upsert_profile(&user, &profile).await?;

    h.engine.refresh().await?;
    assert_eq!(h.engine.profile().unwrap().total_xp, 750);
    Ok(())
}

#[tokio::test]
async fn sign_in_replaces_an_active_session() -> Result<()> {
    let h = signed_in_harness("u1").await;
    h.engine.create_habit(daily_draft("Mine")).await?;

    h.engine.handle_auth_event(AuthEvent::SignedIn(UserId::new("u2"))).await?;

    // The second user starts from their own, empty collection
    assert_eq!(h.engine.current_user(), Some(UserId::new("u2")));
    assert!(h.engine.list_habits().is_empty());
    Ok(())
}
