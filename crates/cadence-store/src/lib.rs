//! Cadence collaborator seams
//!
//! The engine's external collaborators live behind the traits in this
//! crate:
//!
//! - [`RemoteStore`]: the durable document store (per-user habit collection,
//!   per-habit completion sub-collection, one profile document) with
//!   snapshot subscriptions
//! - [`ReminderScheduler`]: push-notification scheduling
//! - [`AuthEvent`]: session lifecycle events from the identity collaborator
//!
//! [`MemoryStore`] is the in-process implementation used by tests, with
//! single-shot failure injection for rollback coverage.

// Core modules
mod error;
mod identity;
mod memory;
mod reminders;
mod remote;

// Re-exports
pub use error::StoreError;
pub use identity::AuthEvent;
pub use memory::MemoryStore;
pub use reminders::{NullScheduler, ReminderScheduler};
pub use remote::{CompletionStream, HabitStream, ProfileStream, RemoteStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
