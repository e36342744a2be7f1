//! Remote document store seam
//!
//! The durable authoritative copies live behind this trait: a per-user habit
//! collection, a completion sub-collection per habit, and a single profile
//! document. Implementations own their retry/timeout policy; the engine only
//! sees [`StoreError`]s.

use crate::error::StoreError;
use cadence_model::{
    Completion, CompletionId, DateRange, Habit, HabitId, HabitPatch, HabitProgress, ProfilePatch,
    UserId, UserProfile,
};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Snapshot stream of a user's full habit collection
pub type HabitStream = BoxStream<'static, Vec<Habit>>;

/// Snapshot stream of one habit's full completion sub-collection
pub type CompletionStream = BoxStream<'static, Vec<Completion>>;

/// Snapshot stream of the user's profile document
pub type ProfileStream = BoxStream<'static, UserProfile>;

/// Remote persistent document store
///
/// Subscription streams deliver the *entire* current result set on every
/// change, starting with the state at subscription time. Consumers must
/// reconcile idempotently rather than patch incrementally.
#[async_trait]
pub trait RemoteStore: Send + Sync + std::fmt::Debug {
    /// Create a habit document; the store assigns the authoritative id
    ///
    /// # Errors
    /// [`StoreError`] on connectivity failure or rejection.
    async fn create_habit(&self, user: &UserId, habit: &Habit) -> Result<HabitId, StoreError>;

    /// Merge a partial edit into a habit document
    ///
    /// # Errors
    /// [`StoreError::NotFound`] when the habit does not exist.
    async fn update_habit(
        &self,
        user: &UserId,
        habit_id: HabitId,
        patch: &HabitPatch,
    ) -> Result<(), StoreError>;

    /// Write the denormalized progress fields of a habit document
    ///
    /// # Errors
    /// [`StoreError::NotFound`] when the habit does not exist.
    async fn update_habit_progress(
        &self,
        user: &UserId,
        habit_id: HabitId,
        progress: &HabitProgress,
    ) -> Result<(), StoreError>;

    /// Delete a habit document, cascading its completion sub-collection
    ///
    /// The cascade is the store's responsibility and is not guaranteed
    /// atomic with the parent deletion.
    ///
    /// # Errors
    /// [`StoreError`] on connectivity failure.
    async fn delete_habit(&self, user: &UserId, habit_id: HabitId) -> Result<(), StoreError>;

    /// List all habit documents, ordered by creation time ascending
    ///
    /// # Errors
    /// [`StoreError`] on connectivity failure.
    async fn list_habits(&self, user: &UserId) -> Result<Vec<Habit>, StoreError>;

    /// Create a completion document under its habit; the store assigns the id
    ///
    /// # Errors
    /// [`StoreError::NotFound`] when the owning habit does not exist.
    async fn create_completion(
        &self,
        user: &UserId,
        completion: &Completion,
    ) -> Result<CompletionId, StoreError>;

    /// Delete a completion document
    ///
    /// # Errors
    /// [`StoreError::NotFound`] when the completion does not exist.
    async fn delete_completion(
        &self,
        user: &UserId,
        habit_id: HabitId,
        completion_id: CompletionId,
    ) -> Result<(), StoreError>;

    /// List a habit's completions, newest date first, optionally restricted
    /// to a day range
    ///
    /// # Errors
    /// [`StoreError`] on connectivity failure.
    async fn list_completions(
        &self,
        user: &UserId,
        habit_id: HabitId,
        range: Option<DateRange>,
    ) -> Result<Vec<Completion>, StoreError>;

    /// Fetch the profile document, `None` when the user has none yet
    ///
    /// # Errors
    /// [`StoreError`] on connectivity failure.
    async fn fetch_profile(&self, user: &UserId) -> Result<Option<UserProfile>, StoreError>;

    /// Create or replace the profile document
    ///
    /// # Errors
    /// [`StoreError`] on connectivity failure.
    async fn upsert_profile(&self, user: &UserId, profile: &UserProfile)
        -> Result<(), StoreError>;

    /// Merge a partial update into the profile document
    ///
    /// # Errors
    /// [`StoreError::NotFound`] when the profile does not exist.
    async fn merge_profile(&self, user: &UserId, patch: &ProfilePatch) -> Result<(), StoreError>;

    /// Watch the habit collection; each item is the full current list
    fn subscribe_habits(&self, user: &UserId) -> HabitStream;

    /// Watch one habit's completion sub-collection
    fn subscribe_completions(&self, user: &UserId, habit_id: HabitId) -> CompletionStream;

    /// Watch the profile document
    fn subscribe_profile(&self, user: &UserId) -> ProfileStream;
}
