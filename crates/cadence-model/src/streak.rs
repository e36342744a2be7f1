//! Streak and leveling calculators
//!
//! Pure, deterministic functions over already-fetched data. The completion
//! ledger feeds them the denormalized fields it keeps on habits and the
//! user profile; nothing here reads or writes state.

use crate::frequency::expected_days_between;
use crate::habit::Recurrence;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// XP required per level
pub const XP_PER_LEVEL: u32 = 500;

/// XP awarded for a completion unless the caller overrides it
pub const DEFAULT_COMPLETION_XP: u32 = 10;

/// Streak fields carried on a habit (or, globally, on the user profile)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakState {
    /// Current streak
    pub current: u32,
    /// Best streak ever; invariant `best >= current` after every advance
    pub best: u32,
    /// Day of the most recent counted completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completion_date: Option<NaiveDate>,
}

impl StreakState {
    /// State before any completion exists
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Advance a habit's streak for a completion on `new_date`
///
/// Frequency-aware break rule: the streak resets only when an *expected*
/// day between the previous completion and this one was missed, so a
/// specific-weekdays habit survives its scheduled gaps. A completion on the
/// same day leaves the state untouched, and a backdated completion neither
/// extends nor breaks the streak.
///
/// `best` never decreases.
#[must_use]
pub fn advance_streak(
    recurrence: &Recurrence,
    created_on: NaiveDate,
    prior: StreakState,
    new_date: NaiveDate,
) -> StreakState {
    let Some(last) = prior.last_completion_date else {
        return StreakState {
            current: 1,
            best: prior.best.max(1),
            last_completion_date: Some(new_date),
        };
    };

    if new_date <= last {
        return prior;
    }

    let missed = expected_days_between(recurrence, created_on, last, new_date);
    let current = if missed == 0 { prior.current + 1 } else { 1 };

    StreakState {
        current,
        best: prior.best.max(current),
        last_completion_date: Some(new_date),
    }
}

/// Advance the cross-habit streak for a completion of any habit on `new_date`
///
/// Same shape as [`advance_streak`] but keyed on "any habit completed that
/// day"; no single recurrence applies globally, so plain calendar-day gaps
/// decide: one day later extends, more than one resets, the same day is a
/// no-op.
#[must_use]
pub fn advance_global_streak(prior: StreakState, new_date: NaiveDate) -> StreakState {
    let Some(last) = prior.last_completion_date else {
        return StreakState {
            current: 1,
            best: prior.best.max(1),
            last_completion_date: Some(new_date),
        };
    };

    let gap_days = (new_date - last).num_days();
    if gap_days <= 0 {
        return prior;
    }

    let current = if gap_days == 1 { prior.current + 1 } else { 1 };

    StreakState {
        current,
        best: prior.best.max(current),
        last_completion_date: Some(new_date),
    }
}

/// Level for an XP total: one level per [`XP_PER_LEVEL`], starting at 1
#[inline]
#[must_use]
pub fn level_for_xp(total_xp: u32) -> u32 {
    total_xp / XP_PER_LEVEL + 1
}

/// Level plus progress-within-level breakdown for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelInfo {
    /// Current level
    pub level: u32,
    /// XP total the level was derived from
    pub current_xp: u32,
    /// XP total at which the next level is reached
    pub xp_to_next_level: u32,
    /// Progress into the current level, 0-99
    pub progress_percent: u8,
}

/// Level breakdown for an XP total
#[must_use]
pub fn level_info(total_xp: u32) -> LevelInfo {
    let level = level_for_xp(total_xp);
    LevelInfo {
        level,
        current_xp: total_xp,
        xp_to_next_level: level * XP_PER_LEVEL,
        progress_percent: ((total_xp % XP_PER_LEVEL) / 5) as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::WeekdaySet;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn mwf() -> Recurrence {
        Recurrence::SpecificWeekdays { days: WeekdaySet::from_days([1, 3, 5]) }
    }

    #[test]
    fn first_completion_starts_streak_at_one() {
        let state = advance_streak(&Recurrence::Daily, d(2024, 3, 1), StreakState::empty(), d(2024, 3, 4));
        assert_eq!(state.current, 1);
        assert_eq!(state.best, 1);
        assert_eq!(state.last_completion_date, Some(d(2024, 3, 4)));
    }

    #[test]
    fn consecutive_days_extend_streak() {
        let created = d(2024, 3, 1);
        let mut state = StreakState::empty();
        for day in 4..=6 {
            state = advance_streak(&Recurrence::Daily, created, state, d(2024, 3, day));
        }
        assert_eq!(state.current, 3);
        assert_eq!(state.best, 3);
    }

    #[test]
    fn missed_day_resets_daily_streak() {
        let created = d(2024, 3, 1);
        let state = advance_streak(&Recurrence::Daily, created, StreakState::empty(), d(2024, 3, 4));
        let state = advance_streak(&Recurrence::Daily, created, state, d(2024, 3, 6));
        assert_eq!(state.current, 1);
        assert_eq!(state.best, 1);
    }

    #[test]
    fn weekday_streak_survives_unscheduled_gap() {
        // Mon/Wed/Fri habit completed Monday then Wednesday: Tuesday is not
        // expected, so the streak continues
        let created = d(2024, 3, 1);
        let state = advance_streak(&mwf(), created, StreakState::empty(), d(2024, 3, 4));
        let state = advance_streak(&mwf(), created, state, d(2024, 3, 6));
        assert_eq!(state.current, 2);
    }

    #[test]
    fn weekday_streak_resets_when_expected_day_missed() {
        // Mon -> Fri skips the expected Wednesday
        let created = d(2024, 3, 1);
        let state = advance_streak(&mwf(), created, StreakState::empty(), d(2024, 3, 4));
        let state = advance_streak(&mwf(), created, state, d(2024, 3, 8));
        assert_eq!(state.current, 1);
        assert_eq!(state.best, 1);
    }

    #[test]
    fn same_day_and_backdated_completions_leave_state_unchanged() {
        let created = d(2024, 3, 1);
        let state = advance_streak(&Recurrence::Daily, created, StreakState::empty(), d(2024, 3, 5));
        let again = advance_streak(&Recurrence::Daily, created, state, d(2024, 3, 5));
        assert_eq!(again, state);
        let backdated = advance_streak(&Recurrence::Daily, created, state, d(2024, 3, 2));
        assert_eq!(backdated, state);
    }

    #[test]
    fn best_streak_kept_after_reset() {
        let created = d(2024, 3, 1);
        let mut state = StreakState::empty();
        for day in 4..=7 {
            state = advance_streak(&Recurrence::Daily, created, state, d(2024, 3, day));
        }
        assert_eq!(state.best, 4);
        state = advance_streak(&Recurrence::Daily, created, state, d(2024, 3, 10));
        assert_eq!(state.current, 1);
        assert_eq!(state.best, 4);
    }

    #[test]
    fn global_streak_ignores_same_day_repeats() {
        let state = advance_global_streak(StreakState::empty(), d(2024, 3, 4));
        let state = advance_global_streak(state, d(2024, 3, 4));
        assert_eq!(state.current, 1);
        let state = advance_global_streak(state, d(2024, 3, 5));
        assert_eq!(state.current, 2);
        let state = advance_global_streak(state, d(2024, 3, 9));
        assert_eq!(state.current, 1);
        assert_eq!(state.best, 2);
    }

    #[test]
    fn level_boundaries() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(499), 1);
        assert_eq!(level_for_xp(500), 2);
        assert_eq!(level_for_xp(999), 2);
        assert_eq!(level_for_xp(1000), 3);
    }

    #[test]
    fn level_info_breakdown() {
        let info = level_info(1020);
        assert_eq!(info.level, 3);
        assert_eq!(info.xp_to_next_level, 1500);
        assert_eq!(info.progress_percent, 4);
    }

    proptest! {
        #[test]
        fn level_is_monotonic_in_xp(xp in 0u32..2_000_000, bump in 0u32..100_000) {
            prop_assert!(level_for_xp(xp + bump) >= level_for_xp(xp));
        }

        #[test]
        fn best_streak_never_decreases(offsets in proptest::collection::vec(0i64..4, 1..40)) {
            let created = d(2024, 1, 1);
            let mut day = created;
            let mut state = StreakState::empty();
            let mut prior_best = 0;
            for offset in offsets {
                day = day + chrono::Duration::days(offset);
                state = advance_streak(&Recurrence::Daily, created, state, day);
                prop_assert!(state.best >= prior_best);
                prop_assert!(state.best >= state.current);
                prior_best = state.best;
            }
        }
    }
}
