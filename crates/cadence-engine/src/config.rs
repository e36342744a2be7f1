//! Engine configuration

use cadence_model::DEFAULT_COMPLETION_XP;
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long a provisional cache entry may outlive its remote write
    /// before reconciliation treats it as failed and drops it
    pub provisional_ttl: Duration,
    /// XP awarded by convenience logging helpers
    pub default_completion_xp: u32,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With provisional-entry sanity timeout
    #[inline]
    #[must_use]
    pub fn with_provisional_ttl(mut self, ttl: Duration) -> Self {
        self.provisional_ttl = ttl;
        self
    }

    /// With default XP award
    #[inline]
    #[must_use]
    pub fn with_default_completion_xp(mut self, xp: u32) -> Self {
        self.default_completion_xp = xp;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provisional_ttl: Duration::from_secs(30),
            default_completion_xp: DEFAULT_COMPLETION_XP,
        }
    }
}
