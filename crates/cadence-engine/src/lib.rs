//! Cadence engine
//!
//! The habit progress tracking and synchronization engine: it owns the
//! canonical in-memory copy of the signed-in user's habits, completions,
//! and profile, mutates it optimistically ahead of remote confirmation,
//! reconciles it against push-based snapshot deliveries, and derives
//! streaks, XP, levels, and progress statistics from raw completion events.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use cadence_engine::{EngineConfig, HabitEngine};
//! use cadence_store::{AuthEvent, MemoryStore, NullScheduler};
//!
//! let engine = HabitEngine::new(
//!     EngineConfig::new(),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(NullScheduler),
//! );
//! engine.handle_auth_event(AuthEvent::SignedIn("uid".into())).await?;
//!
//! let habit_id = engine.create_habit(draft).await?;
//! engine.log_completion_today(habit_id).await?;
//! let progress = engine.user_progress();
//! ```

// Core modules
mod cache;
mod config;
mod error;
mod ledger;
mod registry;
mod session;

/// Read-side projections
pub mod aggregate;

// Re-exports
pub use aggregate::{CalendarDay, HabitStats, UserProgress};
pub use config::EngineConfig;
pub use error::EngineError;
pub use session::{today, HabitEngine};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
