//! Per-user aggregate profile
//!
//! Updated as a side effect of every completion creation and deletion across
//! all of the user's habits.

use crate::ids::UserId;
use crate::streak::{level_for_xp, StreakState};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Per-user aggregate state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Owning user
    pub user_id: UserId,
    /// Display metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Display metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Total XP across all habits
    #[serde(default)]
    pub total_xp: u32,
    /// Level derived from total XP
    #[serde(default = "default_level")]
    pub level: u32,
    /// Current cross-habit streak
    #[serde(default)]
    pub current_global_streak: u32,
    /// Best cross-habit streak ever
    #[serde(default)]
    pub best_global_streak: u32,
    /// Day of the most recent completion of any habit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_global_completion_date: Option<NaiveDate>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp
    pub updated_at: DateTime<Utc>,
}

fn default_level() -> u32 {
    1
}

impl UserProfile {
    /// Zeroed profile for a user signing in for the first time
    #[must_use]
    pub fn fresh(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            display_name: None,
            email: None,
            total_xp: 0,
            level: 1,
            current_global_streak: 0,
            best_global_streak: 0,
            last_global_completion_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The global streak fields as calculator input
    #[inline]
    #[must_use]
    pub fn global_streak_state(&self) -> StreakState {
        StreakState {
            current: self.current_global_streak,
            best: self.best_global_streak,
            last_completion_date: self.last_global_completion_date,
        }
    }

    /// Merge a partial update
    pub fn merge(&mut self, patch: &ProfilePatch, now: DateTime<Utc>) {
        if let Some(total_xp) = patch.total_xp {
            self.total_xp = total_xp;
            self.level = level_for_xp(total_xp);
        }
        if let Some(streak) = patch.global_streak {
            self.current_global_streak = streak.current;
            self.best_global_streak = streak.best;
            self.last_global_completion_date = streak.last_completion_date;
        }
        if let Some(display_name) = &patch.display_name {
            self.display_name = Some(display_name.clone());
        }
        self.updated_at = now;
    }
}

/// Partial profile update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    /// New XP total (level is derived from it)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_xp: Option<u32>,
    /// New global streak fields, written together
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_streak: Option<StreakState>,
    /// New display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ProfilePatch {
    /// Empty patch
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With XP total
    #[inline]
    #[must_use]
    pub fn with_total_xp(mut self, total_xp: u32) -> Self {
        self.total_xp = Some(total_xp);
        self
    }

    /// With global streak fields
    #[inline]
    #[must_use]
    pub fn with_global_streak(mut self, streak: StreakState) -> Self {
        self.global_streak = Some(streak);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
    }

    #[test]
    fn fresh_profile_is_zeroed() {
        let profile = UserProfile::fresh(UserId::new("u1"), now());
        assert_eq!(profile.total_xp, 0);
        assert_eq!(profile.level, 1);
        assert_eq!(profile.current_global_streak, 0);
        assert!(profile.last_global_completion_date.is_none());
    }

    #[test]
    fn merge_recomputes_level_from_xp() {
        let mut profile = UserProfile::fresh(UserId::new("u1"), now());
        profile.merge(&ProfilePatch::new().with_total_xp(1020), now());
        assert_eq!(profile.total_xp, 1020);
        assert_eq!(profile.level, 3);
    }

    #[test]
    fn merge_writes_streak_fields_together() {
        let mut profile = UserProfile::fresh(UserId::new("u1"), now());
        let day = now().date_naive();
        profile.merge(
            &ProfilePatch::new().with_global_streak(StreakState {
                current: 4,
                best: 9,
                last_completion_date: Some(day),
            }),
            now(),
        );
        assert_eq!(profile.current_global_streak, 4);
        assert_eq!(profile.best_global_streak, 9);
        assert_eq!(profile.last_global_completion_date, Some(day));
    }
}
